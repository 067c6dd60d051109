//! # Pipeline contra el Servicio Grid
//! src/fetch/remote.rs
//!
//! Pide `<grid_service_url>/<series_uid>`, recibe la serie como un
//! `.tar.gz` y la extrae entrada por entrada en el directorio de salida,
//! sin cargar el archivo completo en memoria.

use crate::fetch::{FetchFault, FetchPipeline, FetchReport};
use flate2::read::GzDecoder;
use reqwest::blocking::Client;
use std::fs;
use std::io::{self, Read};
use std::path::Path;
use std::time::Duration;
use tar::Archive;
use tracing::{debug, info, warn};

/// Pipeline que descarga series desde el servicio grid por HTTP
pub struct RemoteArchivePipeline {
    /// URL base del servicio
    service_url: String,

    /// Cliente HTTP bloqueante, reutilizado entre descargas
    client: Client,
}

impl RemoteArchivePipeline {
    /// Crea el pipeline para un servicio
    ///
    /// El cliente no tiene timeout total: una serie grande puede tardar
    /// lo que tenga que tardar.
    pub fn new(service_url: &str) -> Result<Self, FetchFault> {
        let client = Client::builder()
            .timeout(None::<Duration>)
            .user_agent(concat!("nbia_adapter/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchFault::Unknown(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            service_url: service_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// URL de una serie en el servicio
    pub fn series_url(&self, series_uid: &str) -> String {
        format!("{}/{}", self.service_url, series_uid)
    }
}

impl FetchPipeline for RemoteArchivePipeline {
    fn fetch(&self, series_uid: &str, output_dir: &Path) -> Result<FetchReport, FetchFault> {
        let url = self.series_url(series_uid);
        debug!(%url, "requesting series archive");

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| FetchFault::Service(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchFault::Service(format!("{} answered {}", url, status)));
        }

        fs::create_dir_all(output_dir)?;
        let files = unpack_archive(response, output_dir)?;

        info!(series_uid, files, dir = %output_dir.display(), "series extracted");
        Ok(FetchReport {
            files,
            output_dir: output_dir.to_path_buf(),
        })
    }
}

/// Extrae un `.tar.gz` en `output_dir` y retorna cuántos archivos escribió
///
/// Las entradas que intentan salir del directorio (`../x`, rutas
/// absolutas) se saltan.
pub fn unpack_archive<R: Read>(reader: R, output_dir: &Path) -> Result<usize, FetchFault> {
    let mut archive = Archive::new(GzDecoder::new(reader));
    let mut files = 0;

    for entry in archive.entries().map_err(classify_archive_error)? {
        let mut entry = entry.map_err(classify_archive_error)?;
        let is_file = entry.header().entry_type().is_file();
        let path = entry
            .path()
            .map(|p| p.display().to_string())
            .unwrap_or_default();

        if !entry.unpack_in(output_dir).map_err(classify_archive_error)? {
            warn!(%path, "skipping archive entry outside the output directory");
            continue;
        }

        if is_file {
            debug!(%path, "extracted");
            files += 1;
        }
    }

    Ok(files)
}

/// Datos ilegibles → `Unknown`; el resto de errores de I/O → `Io`
fn classify_archive_error(err: io::Error) -> FetchFault {
    match err.kind() {
        io::ErrorKind::InvalidData | io::ErrorKind::InvalidInput | io::ErrorKind::UnexpectedEof => {
            FetchFault::Unknown(format!("corrupt series archive: {}", err))
        }
        _ => FetchFault::Io(err),
    }
}
