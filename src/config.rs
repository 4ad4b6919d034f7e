//! # Configuración del Servidor
//! src/config.rs
//!
//! Configuración del servidor de lotes con soporte para argumentos CLI y
//! variables de entorno.
//!
//! ## Ejemplos de uso
//!
//! ### CLI
//! ```bash
//! ./batch_server --port 8080 \
//!   --pool-size 8 \
//!   --batch-timeout-ms 30000 \
//!   --shutdown-grace-ms 60000
//! ```
//!
//! ### Variables de entorno
//! ```bash
//! HTTP_PORT=8080 POOL_SIZE=4 DEMO_STEP_MS=200 ./batch_server
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// Configuración del servidor de lotes
#[derive(Debug, Clone, Parser)]
#[command(name = "batch_server")]
#[command(about = "Servidor HTTP/1.0 que ejecuta lotes de tareas en paralelo sobre un pool fijo")]
#[command(version)]
pub struct Config {
    /// Puerto en el que escucha el servidor
    #[arg(short, long, default_value = "8080", env = "HTTP_PORT")]
    pub port: u16,

    /// Host/IP en el que escucha
    #[arg(long, default_value = "127.0.0.1", env = "HTTP_HOST")]
    pub host: String,

    // === Pool ===

    /// Número de workers del pool (0 = paralelismo disponible del host)
    #[arg(long = "pool-size", default_value = "0", env = "POOL_SIZE")]
    pub pool_size: usize,

    // === Timeouts ===

    /// Tiempo máximo de espera de un lote en milisegundos
    #[arg(long = "batch-timeout-ms", default_value = "30000", env = "BATCH_TIMEOUT_MS")]
    pub batch_timeout_ms: u64,

    /// Gracia para que terminen los trabajos al apagar, en milisegundos
    #[arg(long = "shutdown-grace-ms", default_value = "60000", env = "SHUTDOWN_GRACE_MS")]
    pub shutdown_grace_ms: u64,

    /// Unidad de espera de las tareas de demostración, en milisegundos
    #[arg(long = "demo-step-ms", default_value = "1000", env = "DEMO_STEP_MS")]
    pub demo_step_ms: u64,

    // === Archivos ===

    /// Directorio base para los archivos temporales (por defecto, el del sistema)
    #[arg(long = "temp-dir", env = "BATCH_TEMP_DIR")]
    pub temp_dir: Option<PathBuf>,

    // === Logging ===

    /// Nivel de log cuando `RUST_LOG` no está definido
    #[arg(long = "log-level", default_value = "info", env = "LOG_LEVEL")]
    pub log_level: String,
}

impl Config {
    /// Crea una nueva configuración parseando argumentos CLI
    pub fn new() -> Self {
        Config::parse()
    }

    /// Dirección completa para bind (host:port)
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn batch_timeout(&self) -> Duration {
        Duration::from_millis(self.batch_timeout_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    pub fn demo_step(&self) -> Duration {
        Duration::from_millis(self.demo_step_ms)
    }

    /// Valida la configuración
    pub fn validate(&self) -> Result<(), String> {
        if self.batch_timeout_ms == 0 {
            return Err("Batch timeout must be > 0".to_string());
        }
        if self.demo_step_ms == 0 {
            return Err("Demo step must be > 0".to_string());
        }
        if let Some(dir) = &self.temp_dir {
            if !dir.is_dir() {
                return Err(format!("Temp dir {} is not a directory", dir.display()));
            }
        }

        Ok(())
    }

    /// Loguea un resumen de la configuración efectiva
    pub fn print_summary(&self) {
        let pool_size = if self.pool_size == 0 {
            "auto".to_string()
        } else {
            self.pool_size.to_string()
        };
        let temp_dir = self
            .temp_dir
            .as_ref()
            .map(|d| d.display().to_string())
            .unwrap_or_else(|| std::env::temp_dir().display().to_string());

        info!(address = %self.address(), "network");
        info!(pool_size = %pool_size, "worker pool");
        info!(
            batch_timeout_ms = self.batch_timeout_ms,
            shutdown_grace_ms = self.shutdown_grace_ms,
            demo_step_ms = self.demo_step_ms,
            "timeouts"
        );
        info!(temp_dir = %temp_dir, "files");
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "127.0.0.1".to_string(),
            pool_size: 0,
            batch_timeout_ms: 30_000,
            shutdown_grace_ms: 60_000,
            demo_step_ms: 1_000,
            temp_dir: None,
            log_level: "info".to_string(),
        }
    }
}
