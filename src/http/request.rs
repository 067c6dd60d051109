//! # Parsing de la Request Line HTTP/1.0
//! src/http/request.rs
//!
//! El adaptador solo consume la primera línea del request:
//!
//! ```text
//! GET /fetch/1.3.6.1.4.1.9328.50.1.2 HTTP/1.0\r\n
//! ```
//!
//! Headers y body se ignoran. El método debe ser exactamente `GET` seguido
//! de un espacio; cualquier otra cosa es un método no soportado.

use thiserror::Error;

/// Prefijo obligatorio de toda request aceptada
const GET_PREFIX: &[u8] = b"GET ";

/// Cantidad de bytes del método que se reportan en el error (como el
/// eco de `unsupported method type: XXXXX`)
const METHOD_ECHO_LEN: usize = 5;

/// Request line parseada
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Target tal como llegó (ej: "/status/1.2.3")
    target: String,

    /// Versión HTTP si el cliente la envió (HTTP/0.9 no la trae)
    version: Option<String>,
}

/// Errores que pueden ocurrir durante el parsing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Método distinto de GET (o request vacía)
    #[error("unsupported method type: {0}")]
    UnsupportedMethod(String),
}

impl Request {
    /// Parsea la request line desde los bytes leídos del socket
    ///
    /// El buffer puede traer más que la primera línea; todo lo que sigue
    /// al primer `\r` o `\n` se descarta.
    ///
    /// # Ejemplo
    ///
    /// ```
    /// use nbia_adapter::http::Request;
    ///
    /// let request = Request::parse(b"GET /status/abc HTTP/1.0\r\n\r\n").unwrap();
    /// assert_eq!(request.target(), "/status/abc");
    /// assert_eq!(request.segments(), vec!["", "status", "abc"]);
    /// ```
    pub fn parse(buffer: &[u8]) -> Result<Self, ParseError> {
        let line_end = buffer
            .iter()
            .position(|&b| b == b'\n' || b == b'\r')
            .unwrap_or(buffer.len());
        let line = &buffer[..line_end];

        let rest = match line.strip_prefix(GET_PREFIX) {
            Some(rest) => rest,
            None => {
                let echo = &line[..line.len().min(METHOD_ECHO_LEN)];
                return Err(ParseError::UnsupportedMethod(
                    String::from_utf8_lossy(echo).trim_end().to_string(),
                ));
            }
        };

        // El target llega hasta el siguiente espacio
        let (target, version) = match rest.iter().position(|&b| b == b' ') {
            Some(space) => {
                let version = String::from_utf8_lossy(&rest[space + 1..])
                    .trim()
                    .to_string();
                (&rest[..space], Some(version).filter(|v| !v.is_empty()))
            }
            None => (rest, None),
        };

        Ok(Request {
            target: String::from_utf8_lossy(target).to_string(),
            version,
        })
    }

    /// Target completo del request
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Versión HTTP, si vino en la request line
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Segmentos del target separados por `/`
    ///
    /// Un target absoluto empieza con un segmento vacío, así que
    /// `/fetch/abc` produce `["", "fetch", "abc"]`.
    pub fn segments(&self) -> Vec<&str> {
        self.target.split('/').collect()
    }
}
