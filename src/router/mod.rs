//! # Sistema de Routing
//! src/router/mod.rs
//!
//! Clasifica el target de la request en una de tres rutas:
//!
//! ```text
//! /fetch/<series_uid>   → Route::Fetch
//! /status/<series_uid>  → Route::Status
//! cualquier otra cosa   → Route::NotFound
//! ```
//!
//! Las reglas se evalúan en ese orden sobre los segmentos del path. Los
//! segmentos posteriores al identificador se ignoran
//! (`/status/abc/extra` consulta `abc`).

use crate::http::Request;

/// Destino de una request ya parseada
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Iniciar la descarga de una serie
    Fetch(String),

    /// Consultar el estado de una serie
    Status(String),

    /// Ruta desconocida
    NotFound,
}

impl Route {
    /// Clasifica una request
    ///
    /// # Ejemplo
    /// ```
    /// use nbia_adapter::http::Request;
    /// use nbia_adapter::router::Route;
    ///
    /// let request = Request::parse(b"GET /fetch/1.2.3 HTTP/1.0\r\n").unwrap();
    /// assert_eq!(Route::classify(&request), Route::Fetch("1.2.3".to_string()));
    /// ```
    pub fn classify(request: &Request) -> Self {
        Self::from_segments(&request.segments())
    }

    /// Aplica las reglas de routing sobre los segmentos del path
    pub fn from_segments(segments: &[&str]) -> Self {
        if segments.len() < 3 || segments[2].is_empty() {
            return Route::NotFound;
        }

        let series_uid = segments[2].to_string();
        match segments[1] {
            "fetch" => Route::Fetch(series_uid),
            "status" => Route::Status(series_uid),
            _ => Route::NotFound,
        }
    }

    /// Nombre corto de la ruta para logs
    pub fn name(&self) -> &'static str {
        match self {
            Route::Fetch(_) => "fetch",
            Route::Status(_) => "status",
            Route::NotFound => "not_found",
        }
    }
}
