//! # Contexto Compartido
//! src/server/context.rs
//!
//! Todo lo que un worker necesita para atender una request. Se crea una
//! vez al arrancar y se comparte por `Arc`.

use crate::config::Config;
use crate::fetch::FetchPipeline;
use crate::jobs::StatusRegistry;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub struct ServerContext {
    /// Estado de cada serie
    pub registry: StatusRegistry,

    /// Operación de descarga
    pub pipeline: Arc<dyn FetchPipeline>,

    /// Directorio de salida por defecto para las descargas
    pub download_dir: PathBuf,

    /// Timeout de lectura de la request line (`None` = sin límite)
    pub read_timeout: Option<Duration>,

    /// Si es true, dos `fetch` de la misma serie pueden correr a la vez
    pub allow_duplicate_fetches: bool,
}

impl ServerContext {
    /// Contexto con registro vacío, sin timeout y sin descargas duplicadas
    pub fn new(pipeline: Arc<dyn FetchPipeline>, download_dir: PathBuf) -> Self {
        Self {
            registry: StatusRegistry::new(),
            pipeline,
            download_dir,
            read_timeout: None,
            allow_duplicate_fetches: false,
        }
    }

    /// Crea el contexto desde la configuración principal
    pub fn from_config(config: &Config, pipeline: Arc<dyn FetchPipeline>) -> Self {
        Self {
            read_timeout: config.read_timeout(),
            allow_duplicate_fetches: config.allow_duplicate_fetches,
            ..Self::new(pipeline, config.download_dir())
        }
    }
}
