//! # Construcción de Respuestas HTTP
//!
//! API para construir respuestas HTTP/1.0 y convertirlas a bytes.
//!
//! ## Formato de una respuesta de estado
//!
//! ```text
//! HTTP/1.0 200 OK\r\n
//! Server: NBIAAdapter\r\n
//! Last-Modified: Sat, 17 Oct 2026 10:00:00 GMT\r\n
//! Content-Type: application/json\r\n
//! Content-Length: 42\r\n
//! \r\n
//! {"message":"Download Started","ok":false}
//! ```
//!
//! ## Ejemplo de uso
//!
//! ```
//! use nbia_adapter::http::{Response, StatusCode};
//!
//! let response = Response::new(StatusCode::Ok)
//!     .with_header("Content-Type", "application/json")
//!     .with_body(r#"{"message":"Download Complete.","ok":true}"#);
//!
//! let bytes = response.to_bytes();
//! assert!(bytes.starts_with(b"HTTP/1.0 200 OK\r\n"));
//! ```

use super::StatusCode;
use chrono::Utc;
use std::collections::HashMap;
use std::io::{self, Write};

/// Valor del header `Server`. Los clientes existentes lo reconocen.
pub const SERVER_NAME: &str = "NBIAAdapter";

/// Body fijo de las respuestas 404
pub const NOT_FOUND_BODY: &str = "Not Found\n\nThe requested resource was not found.\n";

/// Formato de fecha HTTP (RFC 7231, IMF-fixdate)
const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Representa una respuesta HTTP/1.0 completa
#[derive(Debug, Clone)]
pub struct Response {
    /// Código de estado HTTP
    status: StatusCode,

    /// Headers HTTP; el HashMap evita duplicados
    headers: HashMap<String, String>,

    /// Cuerpo de la respuesta (puede ser vacío)
    body: Vec<u8>,
}

impl Response {
    /// Crea una respuesta sin headers ni body
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    /// Agrega un header (si ya existe, se sobrescribe)
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }

    /// Versión mutable de [`Response::with_header`]
    pub fn add_header(&mut self, name: &str, value: &str) {
        self.headers.insert(name.to_string(), value.to_string());
    }

    /// Establece el body y calcula `Content-Length` con su largo exacto
    pub fn with_body(mut self, body: &str) -> Self {
        self.body = body.as_bytes().to_vec();
        self.headers
            .insert("Content-Length".to_string(), self.body.len().to_string());
        self
    }

    /// Respuesta 200 con body JSON
    ///
    /// # Ejemplo
    /// ```
    /// use nbia_adapter::http::Response;
    ///
    /// let response = Response::json(r#"{"message":"Download Started","ok":false}"#);
    /// assert_eq!(
    ///     response.headers().get("Content-Type").map(String::as_str),
    ///     Some("application/json")
    /// );
    /// ```
    pub fn json(body: &str) -> Self {
        Self::new(StatusCode::Ok)
            .with_header("Content-Type", "application/json")
            .with_body(body)
    }

    /// Respuesta 404 con el texto fijo de recurso no encontrado
    pub fn not_found() -> Self {
        Self::new(StatusCode::NotFound)
            .with_header("Content-Type", "text/plain")
            .with_body(NOT_FOUND_BODY)
    }

    /// Respuesta para métodos no soportados
    pub fn bad_method(method: &str) -> Self {
        Self::new(StatusCode::MethodNotAllowed)
            .with_header("Content-Type", "text/plain")
            .with_body(&format!("unsupported method type: {}\n", method))
    }

    /// Agrega los headers que llevan todas las respuestas del adaptador
    ///
    /// `Last-Modified` es la hora actual: el estado se genera al vuelo.
    pub fn add_common_headers(&mut self) {
        self.add_header("Server", SERVER_NAME);
        self.add_header("Last-Modified", &http_date());
        self.add_header("Connection", "close");
    }

    /// Convierte la respuesta a bytes listos para enviar por el socket
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut result = Vec::with_capacity(128 + self.body.len());

        // 1. Status line
        result.extend_from_slice(format!("HTTP/1.0 {}\r\n", self.status).as_bytes());

        // 2. Headers
        for (name, value) in &self.headers {
            result.extend_from_slice(format!("{}: {}\r\n", name, value).as_bytes());
        }

        // 3. Línea vacía y body
        result.extend_from_slice(b"\r\n");
        result.extend_from_slice(&self.body);

        result
    }

    /// Escribe la respuesta completa y hace flush
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.to_bytes())?;
        writer.flush()
    }

    /// Código de estado de la respuesta
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Referencia a los headers
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Referencia al body
    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

/// Hora actual en formato de fecha HTTP
fn http_date() -> String {
    Utc::now().format(HTTP_DATE_FORMAT).to_string()
}
