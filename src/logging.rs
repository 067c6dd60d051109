//! # Logging
//! src/logging.rs
//!
//! Inicializa `tracing` hacia stdout o hacia el archivo de `--log`.
//! `RUST_LOG` tiene prioridad; si no está, se usa `info` (o `debug` con
//! `--verbose`).

use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Filtro por defecto según la verbosidad
fn default_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose {
            "info,nbia_adapter=debug"
        } else {
            "info"
        })
    })
}

/// Instala el subscriber global
///
/// Con `log_file` los eventos se agregan al final del archivo, sin
/// colores ANSI.
pub fn init(verbose: bool, log_file: Option<&Path>) -> io::Result<()> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(default_filter(verbose))
        .with_thread_names(true);

    match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            builder.with_writer(Mutex::new(file)).with_ansi(false).init();
        }
        None => builder.with_writer(io::stdout).init(),
    }

    tracing::debug!("logging initialized");
    Ok(())
}
