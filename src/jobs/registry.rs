//! # Registro de Estados
//! src/jobs/registry.rs
//!
//! Mapa compartido `series_uid -> JobStatus` protegido por un único Mutex.
//! El lock solo cubre operaciones en memoria; nunca se mantiene durante I/O
//! ni mientras se toma el lock del pool de workers.
//!
//! Además del estado, cada entrada cuenta cuántas descargas hay en curso
//! (para no lanzar dos descargas de la misma serie) y cuándo se tocó por
//! última vez (para poder desalojar entradas viejas). Es un contador y no
//! un flag porque con descargas duplicadas permitidas puede haber varias
//! a la vez.

use crate::jobs::status::JobStatus;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Entrada interna del registro
#[derive(Debug, Clone)]
struct Entry {
    status: JobStatus,
    in_flight: usize,
    updated_at: Instant,
}

impl Entry {
    fn new(status: JobStatus, in_flight: usize) -> Self {
        Self {
            status,
            in_flight,
            updated_at: Instant::now(),
        }
    }
}

/// Resultado de intentar registrar una descarga
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchTicket {
    /// El worker que recibió el ticket debe ejecutar el pipeline
    Started(JobStatus),

    /// Ya hay una descarga de la misma serie en curso; solo se informa
    /// el estado actual
    AlreadyRunning(JobStatus),
}

impl FetchTicket {
    /// Estado a devolver al cliente
    pub fn status(&self) -> &JobStatus {
        match self {
            FetchTicket::Started(status) | FetchTicket::AlreadyRunning(status) => status,
        }
    }

    pub fn is_started(&self) -> bool {
        matches!(self, FetchTicket::Started(_))
    }
}

/// Registro de estados thread-safe, compartido por todos los workers
#[derive(Clone, Default)]
pub struct StatusRegistry {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

impl StatusRegistry {
    /// Crea un registro vacío
    pub fn new() -> Self {
        Self::default()
    }

    /// Toma el lock. Cada operación deja el mapa consistente, así que un
    /// lock envenenado se puede seguir usando.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Obtiene el estado de una serie
    ///
    /// Si la serie no existe se registra como "no iniciada" antes de leer,
    /// así que dos llamadas seguidas devuelven lo mismo.
    pub fn get_status(&self, series_uid: &str) -> JobStatus {
        let mut entries = self.lock();
        entries
            .entry(series_uid.to_string())
            .or_insert_with(|| Entry::new(JobStatus::not_started(), 0))
            .status
            .clone()
    }

    /// Estado serializado como JSON compacto
    pub fn status_json(&self, series_uid: &str) -> String {
        self.get_status(series_uid).to_json()
    }

    /// Marca la serie como en descarga y suma una descarga en curso
    pub fn set_started(&self, series_uid: &str) {
        let mut entries = self.lock();
        start(&mut entries, series_uid);
    }

    /// Marca la serie como descargada
    pub fn set_done(&self, series_uid: &str) {
        self.finish(series_uid, JobStatus::complete());
    }

    /// Marca la serie como fallida con el mensaje dado
    pub fn set_failed(&self, series_uid: &str, message: &str) {
        self.finish(series_uid, JobStatus::failed(message));
    }

    /// Guarda un estado terminal y resta una descarga en curso
    fn finish(&self, series_uid: &str, status: JobStatus) {
        let mut entries = self.lock();
        let in_flight = entries
            .get(series_uid)
            .map(|entry| entry.in_flight.saturating_sub(1))
            .unwrap_or(0);
        entries.insert(series_uid.to_string(), Entry::new(status, in_flight));
    }

    /// Registra el inicio de una descarga en una sola sección crítica
    ///
    /// Con `allow_duplicates == false`, si la serie ya tiene una descarga en
    /// curso no se toca la entrada y se devuelve `AlreadyRunning`. Con
    /// `allow_duplicates == true` siempre se devuelve `Started` y dos
    /// descargas simultáneas compiten: gana la última en terminar.
    pub fn begin_fetch(&self, series_uid: &str, allow_duplicates: bool) -> FetchTicket {
        let mut entries = self.lock();

        if !allow_duplicates {
            if let Some(entry) = entries.get(series_uid) {
                if entry.in_flight > 0 {
                    return FetchTicket::AlreadyRunning(entry.status.clone());
                }
            }
        }

        FetchTicket::Started(start(&mut entries, series_uid))
    }

    /// Indica si hay una descarga en curso para la serie
    pub fn is_in_flight(&self, series_uid: &str) -> bool {
        self.lock()
            .get(series_uid)
            .is_some_and(|entry| entry.in_flight > 0)
    }

    /// Elimina las entradas sin descarga en curso cuya última actualización
    /// tiene más de `ttl`. Retorna cuántas se eliminaron.
    pub fn evict_expired(&self, ttl: Duration) -> usize {
        self.evict_expired_at(Instant::now(), ttl)
    }

    fn evict_expired_at(&self, now: Instant, ttl: Duration) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| {
            entry.in_flight > 0 || now.saturating_duration_since(entry.updated_at) <= ttl
        });
        before - entries.len()
    }

    /// Cantidad de series registradas
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Pasa la serie a "Download Started" y suma una descarga en curso
fn start(entries: &mut HashMap<String, Entry>, series_uid: &str) -> JobStatus {
    let in_flight = entries
        .get(series_uid)
        .map(|entry| entry.in_flight + 1)
        .unwrap_or(1);
    let status = JobStatus::started();
    entries.insert(series_uid.to_string(), Entry::new(status.clone(), in_flight));
    status
}
