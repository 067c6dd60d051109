//! # Servidor TCP Concurrente
//! src/server/tcp.rs
//!
//! Acepta conexiones y las reparte entre los workers del pool. El thread
//! que acepta nunca procesa requests.

use crate::config::Config;
use crate::fetch::FetchPipeline;
use crate::jobs::StatusRegistry;
use crate::server::{ServerContext, WorkerPool};
use std::io;
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info};

/// Intervalo máximo entre pasadas del limpiador de estados
const REAPER_MAX_INTERVAL: Duration = Duration::from_secs(60);

/// Servidor HTTP/1.0 con pool de workers
pub struct Server {
    listener: TcpListener,
    context: Arc<ServerContext>,
    pool: Arc<WorkerPool>,
    status_ttl: Option<Duration>,
}

impl Server {
    /// Abre el socket. Los workers recién arrancan en `run`.
    pub fn bind(config: &Config, pipeline: Arc<dyn FetchPipeline>) -> io::Result<Self> {
        let address = config.address();
        let listener = TcpListener::bind(&address)?;
        info!(%address, "server listening");

        Ok(Self {
            listener,
            context: Arc::new(ServerContext::from_config(config, pipeline)),
            pool: WorkerPool::new(config.workers),
            status_ttl: config.status_ttl(),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Registro compartido con los workers
    pub fn registry(&self) -> StatusRegistry {
        self.context.registry.clone()
    }

    pub fn pool(&self) -> Arc<WorkerPool> {
        Arc::clone(&self.pool)
    }

    /// Arranca el pool y acepta conexiones para siempre. Un error de
    /// `accept` termina el servidor.
    pub fn run(self) -> io::Result<()> {
        self.pool.start(&self.context)?;

        if let Some(ttl) = self.status_ttl {
            spawn_reaper(self.context.registry.clone(), ttl)?;
        }

        for stream in self.listener.incoming() {
            let stream = stream.map_err(|e| {
                error!(error = %e, "accept failed, shutting down");
                e
            })?;

            if let Err(e) = self.pool.dispatch(stream, &self.context) {
                error!(error = %e, "could not start a worker, connection dropped");
            }
        }

        Ok(())
    }
}

/// Thread que elimina periódicamente los estados vencidos
fn spawn_reaper(registry: StatusRegistry, ttl: Duration) -> io::Result<()> {
    let interval = ttl.min(REAPER_MAX_INTERVAL);

    thread::Builder::new()
        .name("status reaper".to_string())
        .spawn(move || loop {
            thread::sleep(interval);
            let evicted = registry.evict_expired(ttl);
            if evicted > 0 {
                debug!(evicted, remaining = registry.len(), "expired statuses evicted");
            }
        })?;

    Ok(())
}
