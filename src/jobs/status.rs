//! # Estado de una Descarga
//!
//! Lo que ve el cliente al consultar `/status/<id>`: un mensaje y un flag
//! `ok`. Los nombres `message` y `ok` son parte del protocolo.

use serde::{Deserialize, Serialize};

/// Mensaje para una serie que nunca se pidió
pub const NOT_STARTED_MESSAGE: &str = "Download Not Started.";

/// Mensaje mientras la descarga está en curso
pub const STARTED_MESSAGE: &str = "Download Started";

/// Mensaje de descarga terminada
pub const COMPLETE_MESSAGE: &str = "Download Complete.";

/// Estado de una serie
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatus {
    /// Texto legible para el usuario
    pub message: String,

    /// true solo cuando la descarga terminó bien
    pub ok: bool,
}

impl JobStatus {
    pub fn new(message: impl Into<String>, ok: bool) -> Self {
        Self {
            message: message.into(),
            ok,
        }
    }

    pub fn not_started() -> Self {
        Self::new(NOT_STARTED_MESSAGE, false)
    }

    pub fn started() -> Self {
        Self::new(STARTED_MESSAGE, false)
    }

    pub fn complete() -> Self {
        Self::new(COMPLETE_MESSAGE, true)
    }

    /// Falla con el mensaje de la categoría de error
    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(message, false)
    }

    /// Serialización compacta: `{"message":"...","ok":false}`
    pub fn to_json(&self) -> String {
        serde_json::json!({
            "message": self.message,
            "ok": self.ok,
        })
        .to_string()
    }
}
