//! # Configuración del Adaptador
//! src/config.rs
//!
//! Configuración por argumentos CLI y variables de entorno, más un archivo
//! TOML opcional que se puede cargar (`--loadconfig`) y guardar
//! (`--saveconfig`).
//!
//! ## Ejemplos de uso
//!
//! ### CLI
//! ```bash
//! ./nbia_adapter --port 8080 --workers 5 --timeout 0 --log server.log
//! ```
//!
//! ### Archivo de configuración
//! ```toml
//! server_port = 8080
//! server_workers = 5
//! server_timeout = 0
//! grid_service_url = "http://imaging.nci.nih.gov/wsrf/services/cagrid/NCIACoreService"
//! client_download_location = "NBIAGridClientDownload"
//! ```
//!
//! Los valores del archivo pisan a los de la línea de comandos.

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Servicio grid por defecto
pub const DEFAULT_GRID_SERVICE_URL: &str =
    "http://imaging.nci.nih.gov/wsrf/services/cagrid/NCIACoreService";

/// Carpeta de descargas por defecto (relativa al directorio temporal)
pub const DEFAULT_DOWNLOAD_LOCATION: &str = "NBIAGridClientDownload";

/// Errores de configuración
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot write config file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("cannot serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("{0}")]
    Invalid(String),
}

/// Configuración del servidor
#[derive(Debug, Clone, Parser)]
#[command(name = "nbia_adapter")]
#[command(about = "Servidor HTTP que descarga series de NBIA en segundo plano")]
#[command(version)]
pub struct Config {
    /// Puerto en el que escucha el servidor
    #[arg(short, long, default_value = "8080", env = "NBIA_PORT")]
    pub port: u16,

    /// Host/IP en el que escucha
    #[arg(long, default_value = "0.0.0.0", env = "NBIA_HOST")]
    pub host: String,

    /// Workers que se mantienen en el pool
    #[arg(short, long, default_value = "5", env = "NBIA_WORKERS")]
    pub workers: usize,

    /// Timeout de lectura por conexión en milisegundos (0 = sin límite)
    #[arg(short, long = "timeout", default_value = "0", env = "NBIA_TIMEOUT")]
    pub timeout_ms: u64,

    /// Archivo de log (stdout si no se indica)
    #[arg(short = 'o', long = "log", env = "NBIA_LOG")]
    pub log_file: Option<PathBuf>,

    /// Log detallado
    #[arg(short, long)]
    pub verbose: bool,

    /// Carga parámetros desde un archivo de configuración
    #[arg(short = 'l', long = "loadconfig")]
    pub load_config: Option<PathBuf>,

    /// Guarda los parámetros efectivos en un archivo de configuración
    #[arg(short = 's', long = "saveconfig")]
    pub save_config: Option<PathBuf>,

    /// URL del servicio grid que entrega las series
    #[arg(long, default_value = DEFAULT_GRID_SERVICE_URL, env = "NBIA_GRID_SERVICE_URL")]
    pub grid_service_url: String,

    /// Carpeta de descargas; si es relativa se ubica en el directorio temporal
    #[arg(long, default_value = DEFAULT_DOWNLOAD_LOCATION, env = "NBIA_DOWNLOAD_LOCATION")]
    pub client_download_location: String,

    /// Segundos que se conserva una entrada de estado sin descarga en curso (0 = siempre)
    #[arg(long = "status-ttl", default_value = "3600", env = "NBIA_STATUS_TTL")]
    pub status_ttl_secs: u64,

    /// Permite descargas simultáneas de la misma serie (gana la última en terminar)
    #[arg(long)]
    pub allow_duplicate_fetches: bool,

    /// Descarga una sola serie y termina, sin levantar el servidor
    #[arg(short = 'u', long = "uid")]
    pub series_uid: Option<String>,

    /// Directorio de salida para --uid (por defecto, la carpeta de descargas)
    #[arg(long, requires = "series_uid")]
    pub output: Option<PathBuf>,
}

/// Forma del archivo de configuración. Todas las claves son opcionales.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub server_port: Option<u16>,
    pub server_workers: Option<usize>,
    pub server_timeout: Option<u64>,
    pub grid_service_url: Option<String>,
    pub client_download_location: Option<String>,
    pub status_ttl_secs: Option<u64>,
}

impl ConfigFile {
    /// Lee un archivo TOML
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Escribe el archivo TOML
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let text = format!("# NBIAAdapter Configuration\n{}", toml::to_string_pretty(self)?);
        fs::write(path, text).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl Config {
    /// Parsea CLI, aplica el archivo de `--loadconfig`, valida y, si se
    /// pidió, guarda la configuración resultante
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Config::parse();

        if let Some(path) = config.load_config.clone() {
            config.apply_file(&ConfigFile::load(&path)?);
        }

        config.validate()?;

        if let Some(path) = &config.save_config {
            config.to_file().save(path)?;
        }

        Ok(config)
    }

    /// Aplica los valores presentes en el archivo
    pub fn apply_file(&mut self, file: &ConfigFile) {
        if let Some(port) = file.server_port {
            self.port = port;
        }
        if let Some(workers) = file.server_workers {
            self.workers = workers;
        }
        if let Some(timeout) = file.server_timeout {
            self.timeout_ms = timeout;
        }
        if let Some(url) = &file.grid_service_url {
            self.grid_service_url = url.clone();
        }
        if let Some(location) = &file.client_download_location {
            self.client_download_location = location.clone();
        }
        if let Some(ttl) = file.status_ttl_secs {
            self.status_ttl_secs = ttl;
        }
    }

    /// Parámetros persistibles, con todas las claves presentes
    pub fn to_file(&self) -> ConfigFile {
        ConfigFile {
            server_port: Some(self.port),
            server_workers: Some(self.workers),
            server_timeout: Some(self.timeout_ms),
            grid_service_url: Some(self.grid_service_url.clone()),
            client_download_location: Some(self.client_download_location.clone()),
            status_ttl_secs: Some(self.status_ttl_secs),
        }
    }

    /// Dirección completa para bind (host:port)
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Timeout de lectura por conexión; `None` cuando es 0
    pub fn read_timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }

    /// Tiempo de vida de las entradas de estado; `None` cuando es 0
    pub fn status_ttl(&self) -> Option<Duration> {
        (self.status_ttl_secs > 0).then(|| Duration::from_secs(self.status_ttl_secs))
    }

    /// Directorio donde el servidor deja las series descargadas
    pub fn download_dir(&self) -> PathBuf {
        let location = Path::new(&self.client_download_location);
        if location.is_absolute() {
            location.to_path_buf()
        } else {
            std::env::temp_dir().join(location)
        }
    }

    /// Valida la configuración
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::Invalid("workers must be >= 1".to_string()));
        }

        let url = self.grid_service_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "grid service URL must be http(s): {:?}",
                self.grid_service_url
            )));
        }

        if self.client_download_location.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "client download location must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Registra un resumen de la configuración
    pub fn log_summary(&self) {
        tracing::info!(
            address = %self.address(),
            workers = self.workers,
            timeout_ms = self.timeout_ms,
            "server configuration"
        );
        tracing::info!(
            grid_service_url = %self.grid_service_url,
            download_dir = %self.download_dir().display(),
            status_ttl_secs = self.status_ttl_secs,
            allow_duplicate_fetches = self.allow_duplicate_fetches,
            "fetch configuration"
        );
    }
}

impl Default for Config {
    /// Configuración por defecto
    fn default() -> Self {
        Self {
            port: 8080,
            host: "0.0.0.0".to_string(),
            workers: 5,
            timeout_ms: 0,
            log_file: None,
            verbose: false,
            load_config: None,
            save_config: None,
            grid_service_url: DEFAULT_GRID_SERVICE_URL.to_string(),
            client_download_location: DEFAULT_DOWNLOAD_LOCATION.to_string(),
            status_ttl_secs: 3600,
            allow_duplicate_fetches: false,
            series_uid: None,
            output: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.workers, 5);
        assert_eq!(config.read_timeout(), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_cli_defaults_match_default() {
        let parsed = Config::try_parse_from(["nbia_adapter"]).unwrap();
        let default = Config::default();

        assert_eq!(parsed.port, default.port);
        assert_eq!(parsed.host, default.host);
        assert_eq!(parsed.workers, default.workers);
        assert_eq!(parsed.timeout_ms, default.timeout_ms);
        assert_eq!(parsed.grid_service_url, default.grid_service_url);
        assert_eq!(parsed.status_ttl_secs, default.status_ttl_secs);
    }

    #[test]
    fn test_cli_short_flags() {
        let config = Config::try_parse_from([
            "nbia_adapter", "-p", "9000", "-w", "3", "-t", "1500", "-o", "server.log", "-v",
        ])
        .unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.workers, 3);
        assert_eq!(config.read_timeout(), Some(Duration::from_millis(1500)));
        assert_eq!(config.log_file, Some(PathBuf::from("server.log")));
        assert!(config.verbose);
    }

    #[test]
    fn test_output_requires_uid() {
        assert!(Config::try_parse_from(["nbia_adapter", "--output", "/tmp/x"]).is_err());
        let config =
            Config::try_parse_from(["nbia_adapter", "-u", "1.2.3", "--output", "/tmp/x"]).unwrap();
        assert_eq!(config.series_uid.as_deref(), Some("1.2.3"));
    }

    #[test]
    fn test_address() {
        let mut config = Config::default();
        config.host = "127.0.0.1".to_string();
        config.port = 3000;
        assert_eq!(config.address(), "127.0.0.1:3000");
    }

    #[test]
    fn test_validate_invalid_workers() {
        let mut config = Config::default();
        config.workers = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("workers"));
    }

    #[test]
    fn test_validate_invalid_service_url() {
        let mut config = Config::default();
        config.grid_service_url = "ftp://grid".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_empty_download_location() {
        let mut config = Config::default();
        config.client_download_location = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_status_ttl() {
        let mut config = Config::default();
        assert_eq!(config.status_ttl(), Some(Duration::from_secs(3600)));
        config.status_ttl_secs = 0;
        assert_eq!(config.status_ttl(), None);
    }

    #[test]
    fn test_download_dir_relative_goes_to_temp() {
        let config = Config::default();
        assert_eq!(
            config.download_dir(),
            std::env::temp_dir().join(DEFAULT_DOWNLOAD_LOCATION)
        );
    }

    #[test]
    fn test_download_dir_absolute() {
        let mut config = Config::default();
        let dir = std::env::temp_dir().join("absolute-download");
        config.client_download_location = dir.display().to_string();
        assert_eq!(config.download_dir(), dir);
    }

    #[test]
    fn test_file_overrides_cli_values() {
        let mut config = Config::default();
        let file: ConfigFile = toml::from_str(
            r#"
            server_port = 9090
            server_workers = 2
            grid_service_url = "https://grid.example/core"
            "#,
        )
        .unwrap();

        config.apply_file(&file);

        assert_eq!(config.port, 9090);
        assert_eq!(config.workers, 2);
        assert_eq!(config.grid_service_url, "https://grid.example/core");
        // Claves ausentes no se tocan
        assert_eq!(config.timeout_ms, 0);
        assert_eq!(config.client_download_location, DEFAULT_DOWNLOAD_LOCATION);
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("adapter.toml");

        let mut config = Config::default();
        config.port = 7070;
        config.timeout_ms = 250;
        config.to_file().save(&path).unwrap();

        let loaded = ConfigFile::load(&path).unwrap();
        assert_eq!(loaded, config.to_file());

        let mut fresh = Config::default();
        fresh.apply_file(&loaded);
        assert_eq!(fresh.port, 7070);
        assert_eq!(fresh.timeout_ms, 250);
    }

    #[test]
    fn test_load_missing_file() {
        let result = ConfigFile::load(Path::new("/definitely/not/here.toml"));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_load_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "server_port = \"not a number\"").unwrap();

        assert!(matches!(ConfigFile::load(&path), Err(ConfigError::Parse { .. })));
    }
}
