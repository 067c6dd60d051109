//! # Worker
//! src/server/worker.rs
//!
//! Un worker es un thread que atiende una conexión a la vez:
//!
//! ```text
//! idle ──(conexión por el canal)──▶ procesando ──▶ vuelve al pool
//!                                              └──▶ termina (pool lleno)
//! ```
//!
//! Mientras está idle, el pool guarda el extremo emisor de su canal. Asignar
//! una conexión es enviarla por ese canal.

use crate::http::{ParseError, Request, Response};
use crate::jobs::handlers;
use crate::router::Route;
use crate::server::pool::{WorkerHandle, WorkerPool};
use crate::server::ServerContext;
use std::io::{self, Read};
use std::net::TcpStream;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Tamaño del buffer para la request line
pub const BUF_SIZE: usize = 2048;

pub(crate) struct Worker {
    id: usize,
    inbox: Receiver<TcpStream>,
    sender: Sender<TcpStream>,
    ctx: Arc<ServerContext>,
    pool: Arc<WorkerPool>,
    buf: [u8; BUF_SIZE],
}

impl Worker {
    /// Crea el worker y el handle con el que el pool le asigna conexiones
    pub(crate) fn new(
        id: usize,
        ctx: Arc<ServerContext>,
        pool: Arc<WorkerPool>,
    ) -> (Self, WorkerHandle) {
        let (sender, inbox) = mpsc::channel();
        let handle = WorkerHandle::new(id, sender.clone());
        let worker = Self {
            id,
            inbox,
            sender,
            ctx,
            pool,
            buf: [0u8; BUF_SIZE],
        };
        (worker, handle)
    }

    /// Loop principal. `first` es la conexión de un worker de overflow,
    /// que nace ya asignado.
    pub(crate) fn run(mut self, first: Option<TcpStream>) {
        debug!(worker = self.id, "worker started");
        let mut next = first;

        loop {
            let stream = match next.take() {
                Some(stream) => stream,
                None => match self.inbox.recv() {
                    Ok(stream) => stream,
                    Err(_) => break,
                },
            };

            self.serve(stream);

            let handle = WorkerHandle::new(self.id, self.sender.clone());
            if !self.pool.check_in(handle) {
                debug!(worker = self.id, "pool is full, worker exiting");
                break;
            }
        }

        self.pool.worker_exited();
    }

    /// Atiende una conexión. Nada de lo que pase acá mata al worker.
    fn serve(&mut self, stream: TcpStream) {
        let peer = stream
            .peer_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        match panic::catch_unwind(AssertUnwindSafe(|| self.handle_client(stream, &peer))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(worker = self.id, %peer, error = %e, "connection error"),
            Err(_) => error!(worker = self.id, %peer, "panic while handling client"),
        }
    }

    fn handle_client(&mut self, mut stream: TcpStream, peer: &str) -> io::Result<()> {
        stream.set_read_timeout(self.ctx.read_timeout)?;
        stream.set_nodelay(true)?;

        let nread = read_request_line(&mut stream, &mut self.buf)?;
        if nread == 0 {
            debug!(%peer, "connection closed before request");
            return Ok(());
        }

        let request = match Request::parse(&self.buf[..nread]) {
            Ok(request) => request,
            Err(ParseError::UnsupportedMethod(method)) => {
                warn!(%peer, %method, "unsupported method");
                return send_response(stream, Response::bad_method(&method));
            }
        };

        let route = Route::classify(&request);
        info!(
            %peer,
            target = request.target(),
            version = request.version().unwrap_or("-"),
            route = route.name(),
            "request"
        );

        match route {
            Route::Fetch(series_uid) => {
                handlers::fetch_handler(stream, &self.ctx, &series_uid);
                Ok(())
            }
            Route::Status(series_uid) => {
                send_response(stream, handlers::status_handler(&self.ctx, &series_uid))
            }
            Route::NotFound => send_response(stream, Response::not_found()),
        }
    }
}

/// Lee hasta ver un fin de línea (`\n` o `\r`), llenar el buffer o EOF.
/// Retorna cuántos bytes quedaron en `buf`.
pub fn read_request_line<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut nread = 0;

    while nread < buf.len() {
        let r = reader.read(&mut buf[nread..])?;
        if r == 0 {
            break;
        }
        let start = nread;
        nread += r;
        if buf[start..nread].iter().any(|&b| b == b'\n' || b == b'\r') {
            break;
        }
    }

    Ok(nread)
}

/// Escribe la respuesta con los headers comunes y cierra la conexión
fn send_response(mut stream: TcpStream, mut response: Response) -> io::Result<()> {
    response.add_common_headers();
    response.write_to(&mut stream)
}
