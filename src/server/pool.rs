//! # Pool de Workers
//! src/server/pool.rs
//!
//! Mantiene `target` workers idle listos para recibir una conexión. Si no
//! hay ninguno libre se crea un worker de overflow, así que ninguna
//! conexión se rechaza. Al terminar su request, un worker vuelve al pool
//! solo si hay menos de `target` idle; si no, termina. El tamaño del pool
//! es un tope blando que se aplica al volver, no al aceptar.
//!
//! Los cambios de membresía del pool ocurren siempre bajo el mismo lock.

use crate::server::worker::Worker;
use crate::server::ServerContext;
use std::io;
use std::net::TcpStream;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{SendError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use tracing::{debug, info, warn};

/// Extremo del canal de un worker idle
pub(crate) struct WorkerHandle {
    id: usize,
    sender: Sender<TcpStream>,
}

impl WorkerHandle {
    pub(crate) fn new(id: usize, sender: Sender<TcpStream>) -> Self {
        Self { id, sender }
    }
}

pub struct WorkerPool {
    /// Workers idle; cualquiera sirve
    idle: Mutex<Vec<WorkerHandle>>,

    /// Cantidad de workers idle que se conservan
    target: usize,

    /// Threads de worker vivos (idle + ocupados)
    live: AtomicUsize,

    /// Workers de overflow creados desde el arranque
    overflow_spawned: AtomicUsize,

    next_id: AtomicUsize,
}

impl WorkerPool {
    pub fn new(target: usize) -> Arc<Self> {
        Arc::new(Self {
            idle: Mutex::new(Vec::with_capacity(target)),
            target,
            live: AtomicUsize::new(0),
            overflow_spawned: AtomicUsize::new(0),
            next_id: AtomicUsize::new(0),
        })
    }

    fn lock_idle(&self) -> MutexGuard<'_, Vec<WorkerHandle>> {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Arranca los `target` workers iniciales
    pub fn start(self: &Arc<Self>, ctx: &Arc<ServerContext>) -> io::Result<()> {
        for _ in 0..self.target {
            let handle = self.spawn(ctx, None)?;
            self.lock_idle().push(handle);
        }
        info!(workers = self.target, "worker pool started");
        Ok(())
    }

    /// Asigna una conexión a un worker idle o crea uno de overflow
    pub fn dispatch(self: &Arc<Self>, stream: TcpStream, ctx: &Arc<ServerContext>) -> io::Result<()> {
        let idle = self.lock_idle().pop();

        if let Some(handle) = idle {
            return match handle.sender.send(stream) {
                Ok(()) => {
                    debug!(worker = handle.id, "connection assigned");
                    Ok(())
                }
                Err(SendError(stream)) => {
                    warn!(worker = handle.id, "idle worker is gone");
                    self.spawn_overflow(stream, ctx)
                }
            };
        }

        self.spawn_overflow(stream, ctx)
    }

    fn spawn_overflow(self: &Arc<Self>, stream: TcpStream, ctx: &Arc<ServerContext>) -> io::Result<()> {
        let total = self.overflow_spawned.fetch_add(1, Ordering::SeqCst) + 1;
        info!(overflow_spawned = total, "no idle worker, spawning an additional one");
        self.spawn(ctx, Some(stream)).map(|_| ())
    }

    fn spawn(
        self: &Arc<Self>,
        ctx: &Arc<ServerContext>,
        first: Option<TcpStream>,
    ) -> io::Result<WorkerHandle> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let name = if first.is_some() {
            format!("additional worker #{}", id)
        } else {
            format!("worker #{}", id)
        };
        let (worker, handle) = Worker::new(id, Arc::clone(ctx), Arc::clone(self));

        self.live.fetch_add(1, Ordering::SeqCst);
        if let Err(e) = thread::Builder::new()
            .name(name)
            .spawn(move || worker.run(first))
        {
            self.live.fetch_sub(1, Ordering::SeqCst);
            return Err(e);
        }

        Ok(handle)
    }

    /// Devuelve un worker al pool. Retorna false si el pool ya tiene
    /// `target` idle y el worker debe terminar.
    pub(crate) fn check_in(&self, handle: WorkerHandle) -> bool {
        let mut idle = self.lock_idle();
        if idle.len() >= self.target {
            return false;
        }
        idle.push(handle);
        true
    }

    pub(crate) fn worker_exited(&self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }

    /// Workers idle en este momento
    pub fn idle_workers(&self) -> usize {
        self.lock_idle().len()
    }

    /// Threads de worker vivos
    pub fn live_workers(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Workers de overflow creados desde el arranque
    pub fn overflow_spawned(&self) -> usize {
        self.overflow_spawned.load(Ordering::SeqCst)
    }

    /// Tamaño objetivo del pool
    pub fn target(&self) -> usize {
        self.target
    }
}
