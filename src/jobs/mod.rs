//! # Sistema de Descargas
//!
//! Estado por serie y handlers de los endpoints.
//!
//! ## Endpoints
//!
//! - `/fetch/<series_uid>` - Inicia la descarga y responde el estado inicial
//! - `/status/<series_uid>` - Consulta el estado

pub mod handlers;
pub mod registry;
pub mod status;

pub use registry::{FetchTicket, StatusRegistry};
pub use status::JobStatus;
