//! # Módulo HTTP
//!
//! Implementa la porción de HTTP/1.0 que necesita el adaptador, sin
//! librerías de alto nivel:
//!
//! - Parsing de la request line (solo `GET`)
//! - Construcción de responses con `Server`, `Last-Modified`,
//!   `Content-Type` y `Content-Length`
//! - Códigos de estado
//!
//! Las conexiones nunca se mantienen abiertas: una request, una respuesta,
//! y el socket se cierra.

pub mod request;   // Parsing de la request line
pub mod response;  // Construcción de HTTP responses
pub mod status;    // Códigos de estado HTTP

// Re-exportamos los tipos principales para usar `http::Request`
pub use request::{ParseError, Request};
pub use response::Response;
pub use status::StatusCode;
