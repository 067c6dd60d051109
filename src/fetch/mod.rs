//! # Pipeline de Descarga
//! src/fetch/mod.rs
//!
//! Contrato de la operación larga que trae una serie del servicio remoto y
//! la deja extraída en disco. El servidor solo conoce este contrato:
//! la llamada bloquea al worker hasta terminar y, si falla, lo hace con
//! una de tres categorías de error.

pub mod remote;

pub use remote::RemoteArchivePipeline;

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Mensaje de estado cuando falla el servicio remoto
pub const SERVICE_FAULT_MESSAGE: &str = "Internal Server Error at NBIA Site.";

/// Mensaje de estado para fallas de I/O locales
pub const IO_FAULT_MESSAGE: &str = "IOException when writing to socket stream.";

/// Mensaje de estado para cualquier otra falla
pub const UNKNOWN_FAULT_MESSAGE: &str = "Unknown Server Error";

/// Categorías de falla de una descarga
#[derive(Debug, Error)]
pub enum FetchFault {
    /// El servicio remoto no respondió o respondió con error
    #[error("grid service fault: {0}")]
    Service(String),

    /// Error de I/O local (disco, socket)
    #[error("local I/O fault: {0}")]
    Io(#[from] io::Error),

    /// Todo lo demás (archivo corrupto, panic del pipeline, ...)
    #[error("unknown fault: {0}")]
    Unknown(String),
}

impl FetchFault {
    /// Mensaje que queda en el registro y que ve el cliente al consultar
    pub fn status_message(&self) -> &'static str {
        match self {
            FetchFault::Service(_) => SERVICE_FAULT_MESSAGE,
            FetchFault::Io(_) => IO_FAULT_MESSAGE,
            FetchFault::Unknown(_) => UNKNOWN_FAULT_MESSAGE,
        }
    }
}

/// Resumen de una descarga exitosa
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchReport {
    /// Archivos escritos en disco
    pub files: usize,

    /// Directorio donde quedaron
    pub output_dir: PathBuf,
}

/// Operación que descarga y extrae una serie
///
/// Las implementaciones se comparten entre todos los workers, por eso
/// `Send + Sync`. La duración de `fetch` no tiene cota.
pub trait FetchPipeline: Send + Sync {
    fn fetch(&self, series_uid: &str, output_dir: &Path) -> Result<FetchReport, FetchFault>;
}
