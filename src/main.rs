//! # NBIA Adapter - Entry Point
//! src/main.rs
//!
//! Sin `--uid` levanta el servidor. Con `--uid` descarga esa serie una vez
//! y termina; el código de salida indica si la descarga falló.

use anyhow::{bail, Context, Result};
use nbia_adapter::config::Config;
use nbia_adapter::fetch::{FetchPipeline, RemoteArchivePipeline};
use nbia_adapter::logging;
use nbia_adapter::server::Server;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

fn main() -> Result<()> {
    let config = Config::load()?;

    logging::init(config.verbose, config.log_file.as_deref())
        .context("cannot initialize logging")?;
    config.log_summary();

    let pipeline = RemoteArchivePipeline::new(&config.grid_service_url)?;

    if let Some(series_uid) = &config.series_uid {
        let output_dir = config
            .output
            .clone()
            .unwrap_or_else(|| config.download_dir());
        return fetch_once(&pipeline, series_uid, &output_dir);
    }

    let server = Server::bind(&config, Arc::new(pipeline))
        .with_context(|| format!("cannot bind {}", config.address()))?;
    server.run().context("listener failed")
}

/// Modo de una sola descarga
fn fetch_once(pipeline: &dyn FetchPipeline, series_uid: &str, output_dir: &Path) -> Result<()> {
    info!(series_uid, dir = %output_dir.display(), "fetching single series");

    match pipeline.fetch(series_uid, output_dir) {
        Ok(report) => {
            info!(
                series_uid,
                files = report.files,
                dir = %report.output_dir.display(),
                "series downloaded"
            );
            Ok(())
        }
        Err(fault) => bail!("{} ({})", fault.status_message(), fault),
    }
}
