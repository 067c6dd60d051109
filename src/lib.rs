//! # NBIA Adapter
//! src/lib.rs
//!
//! Servidor HTTP/1.0 que descarga series de imágenes de un servicio NBIA en
//! segundo plano. Un cliente pide `/fetch/<series_uid>` y luego consulta
//! `/status/<series_uid>` hasta ver `"ok":true`.
//!
//! ## Arquitectura
//!
//! - `http`: request line, códigos de estado y responses
//! - `router`: clasificación de la request en fetch, status o 404
//! - `server`: listener TCP, pool de workers y workers
//! - `jobs`: registro de estados y handlers de los endpoints
//! - `fetch`: descarga y extracción de una serie
//! - `config`: CLI, variables de entorno y archivo TOML
//! - `logging`: inicialización de `tracing`
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use nbia_adapter::config::Config;
//! use nbia_adapter::fetch::RemoteArchivePipeline;
//! use nbia_adapter::server::Server;
//! use std::sync::Arc;
//!
//! let config = Config::default();
//! let pipeline = RemoteArchivePipeline::new(&config.grid_service_url).unwrap();
//! let server = Server::bind(&config, Arc::new(pipeline)).unwrap();
//! server.run().unwrap();
//! ```

pub mod config;
pub mod fetch;
pub mod http;
pub mod jobs;
pub mod logging;
pub mod router;
pub mod server;
