//! Tests de integración para el adaptador
//! tests/integration_test.rs
//!
//! Cada test levanta su propio servidor en un puerto efímero con un
//! pipeline de prueba, así que no hace falta tener nada corriendo.

use nbia_adapter::config::Config;
use nbia_adapter::fetch::{FetchFault, FetchPipeline, FetchReport, SERVICE_FAULT_MESSAGE};
use nbia_adapter::jobs::{JobStatus, StatusRegistry};
use nbia_adapter::server::{Server, WorkerPool};
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Pipeline que bloquea hasta que el test abre la compuerta
struct GatedPipeline {
    open: Mutex<bool>,
    opened: Condvar,
    calls: AtomicUsize,
    running: AtomicUsize,
    fail_first: bool,
}

impl GatedPipeline {
    fn new(open: bool, fail_first: bool) -> Arc<Self> {
        Arc::new(Self {
            open: Mutex::new(open),
            opened: Condvar::new(),
            calls: AtomicUsize::new(0),
            running: AtomicUsize::new(0),
            fail_first,
        })
    }

    fn release(&self) {
        *self.open.lock().unwrap() = true;
        self.opened.notify_all();
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn running(&self) -> usize {
        self.running.load(Ordering::SeqCst)
    }
}

impl FetchPipeline for GatedPipeline {
    fn fetch(&self, _series_uid: &str, output_dir: &Path) -> Result<FetchReport, FetchFault> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.running.fetch_add(1, Ordering::SeqCst);

        let mut open = self.open.lock().unwrap();
        while !*open {
            open = self.opened.wait(open).unwrap();
        }
        drop(open);

        self.running.fetch_sub(1, Ordering::SeqCst);

        if self.fail_first && call == 1 {
            return Err(FetchFault::Service("service returned 500".to_string()));
        }
        Ok(FetchReport {
            files: 1,
            output_dir: output_dir.to_path_buf(),
        })
    }
}

struct TestServer {
    addr: SocketAddr,
    registry: StatusRegistry,
    pool: Arc<WorkerPool>,
}

fn start_server(workers: usize, allow_duplicates: bool, pipeline: Arc<GatedPipeline>) -> TestServer {
    let config = Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        workers,
        timeout_ms: 5000,
        allow_duplicate_fetches: allow_duplicates,
        ..Config::default()
    };

    let server = Server::bind(&config, pipeline).expect("bind");
    let test_server = TestServer {
        addr: server.local_addr().unwrap(),
        registry: server.registry(),
        pool: server.pool(),
    };
    thread::spawn(move || server.run());
    test_server
}

/// Helper: envía un request y retorna la response completa
fn send_raw(addr: SocketAddr, request: &str) -> String {
    let mut stream = TcpStream::connect(addr).expect("connect");
    stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    stream.write_all(request.as_bytes()).unwrap();
    stream.flush().unwrap();

    let mut response = String::new();
    stream.read_to_string(&mut response).unwrap();
    response
}

fn get(addr: SocketAddr, path: &str) -> String {
    send_raw(addr, &format!("GET {} HTTP/1.0\r\n\r\n", path))
}

/// Helper: extrae el body de una response HTTP
fn extract_body(response: &str) -> &str {
    match response.find("\r\n\r\n") {
        Some(pos) => &response[pos + 4..],
        None => "",
    }
}

fn job_status(response: &str) -> JobStatus {
    serde_json::from_str(extract_body(response))
        .unwrap_or_else(|e| panic!("invalid status body ({}): {}", e, response))
}

fn status_of(addr: SocketAddr, series_uid: &str) -> JobStatus {
    job_status(&get(addr, &format!("/status/{}", series_uid)))
}

fn wait_until(what: &str, mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !condition() {
        assert!(Instant::now() < deadline, "timed out waiting for {}", what);
        thread::sleep(Duration::from_millis(10));
    }
}

#[test]
fn test_status_of_unknown_series_is_idempotent() {
    let server = start_server(2, false, GatedPipeline::new(true, false));

    let first = get(server.addr, "/status/1.2.3");
    let second = get(server.addr, "/status/1.2.3");

    assert!(first.starts_with("HTTP/1.0 200 OK\r\n"), "got: {}", first);
    assert_eq!(extract_body(&first), r#"{"message":"Download Not Started.","ok":false}"#);
    assert_eq!(extract_body(&first), extract_body(&second));
    assert_eq!(server.registry.len(), 1);
}

#[test]
fn test_content_length_matches_body() {
    let server = start_server(1, false, GatedPipeline::new(true, false));

    let response = get(server.addr, "/status/abc");
    let body = extract_body(&response);

    let expected = format!("Content-Length: {}\r\n", body.len());
    assert!(response.contains(&expected), "got: {}", response);
}

#[test]
fn test_fetch_responds_before_pipeline_finishes() {
    let pipeline = GatedPipeline::new(false, false);
    let server = start_server(2, false, pipeline.clone());

    let response = get(server.addr, "/fetch/1.2.3");
    assert_eq!(job_status(&response), JobStatus::started());

    wait_until("pipeline to start", || pipeline.running() == 1);
    assert_eq!(status_of(server.addr, "1.2.3"), JobStatus::started());

    pipeline.release();
    wait_until("download to complete", || {
        status_of(server.addr, "1.2.3") == JobStatus::complete()
    });

    let body = extract_body(&get(server.addr, "/status/1.2.3")).to_string();
    assert_eq!(body, r#"{"message":"Download Complete.","ok":true}"#);
}

#[test]
fn test_failed_fetch_reports_fault_message() {
    let server = start_server(2, false, GatedPipeline::new(true, true));

    get(server.addr, "/fetch/9.9.9");

    wait_until("download to fail", || {
        status_of(server.addr, "9.9.9") == JobStatus::failed(SERVICE_FAULT_MESSAGE)
    });
    assert!(!server.registry.is_in_flight("9.9.9"));
}

#[test]
fn test_overflow_worker_serves_and_exits() {
    let pipeline = GatedPipeline::new(false, false);
    let server = start_server(2, false, pipeline.clone());

    wait_until("pool to start", || server.pool.idle_workers() == 2);

    for uid in ["a", "b", "c"] {
        let response = get(server.addr, &format!("/fetch/{}", uid));
        assert_eq!(job_status(&response), JobStatus::started());
    }

    wait_until("three fetches running", || pipeline.running() == 3);
    assert_eq!(server.pool.overflow_spawned(), 1);
    assert_eq!(server.pool.live_workers(), 3);
    assert_eq!(server.pool.idle_workers(), 0);

    pipeline.release();
    wait_until("pool to settle", || {
        server.pool.live_workers() == 2 && server.pool.idle_workers() == 2
    });

    for uid in ["a", "b", "c"] {
        assert_eq!(status_of(server.addr, uid), JobStatus::complete());
    }
    assert_eq!(server.pool.overflow_spawned(), 1);
}

#[test]
fn test_unknown_route_is_not_found() {
    let server = start_server(1, false, GatedPipeline::new(true, false));

    for path in ["/bogus/1", "/status", "/fetch/", "/"] {
        let response = get(server.addr, path);
        assert!(response.starts_with("HTTP/1.0 404 Not Found\r\n"), "{}: {}", path, response);
        assert_eq!(
            extract_body(&response),
            "Not Found\n\nThe requested resource was not found.\n"
        );
    }
    assert!(server.registry.is_empty());
}

#[test]
fn test_non_get_is_rejected_without_touching_registry() {
    let server = start_server(1, false, GatedPipeline::new(true, false));

    let response = send_raw(server.addr, "POST /fetch/1.2.3 HTTP/1.0\r\n\r\n");

    assert!(response.starts_with("HTTP/1.0 405 Method Not Allowed\r\n"));
    assert_eq!(extract_body(&response), "unsupported method type: POST\n");
    assert!(server.registry.is_empty());
}

#[test]
fn test_duplicate_fetch_runs_pipeline_once() {
    let pipeline = GatedPipeline::new(false, false);
    let server = start_server(2, false, pipeline.clone());

    let first = get(server.addr, "/fetch/dup");
    wait_until("first fetch running", || pipeline.running() == 1);
    let second = get(server.addr, "/fetch/dup");

    assert_eq!(job_status(&first), JobStatus::started());
    assert_eq!(job_status(&second), JobStatus::started());
    assert_eq!(pipeline.calls(), 1);

    pipeline.release();
    wait_until("download to complete", || {
        status_of(server.addr, "dup") == JobStatus::complete()
    });
    assert_eq!(pipeline.calls(), 1);
}

#[test]
fn test_legacy_duplicate_fetches_end_in_a_terminal_state() {
    let pipeline = GatedPipeline::new(false, true);
    let server = start_server(2, true, pipeline.clone());

    get(server.addr, "/fetch/race");
    get(server.addr, "/fetch/race");
    wait_until("both fetches running", || pipeline.running() == 2);

    assert!(server.registry.is_in_flight("race"));

    pipeline.release();
    // Solo deja de estar en curso cuando terminaron las dos descargas
    wait_until("both fetches to finish", || !server.registry.is_in_flight("race"));

    // Gana el último en escribir; cualquiera de los dos resultados es válido,
    // pero ya no cambia
    let status = status_of(server.addr, "race");
    assert!(
        status == JobStatus::complete() || status == JobStatus::failed(SERVICE_FAULT_MESSAGE),
        "unexpected status: {:?}",
        status
    );
    assert_eq!(pipeline.calls(), 2);
    thread::sleep(Duration::from_millis(50));
    assert_eq!(status_of(server.addr, "race"), status);
}
