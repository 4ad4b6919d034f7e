//! # Servicio de Lotes
//! src/service.rs
//!
//! Dueño del pool compartido. Expone los flujos que usa la capa HTTP:
//!
//! - Flujo de archivo: 5 tareas crean un archivo cada una, se sincronizan
//!   por composición de futures y el resultado se empaqueta en un ZIP
//! - Flujo de archivo con falla: igual, pero la tarea 2 usa el generador
//!   CSV que siempre falla
//! - Demos de las dos estrategias de sincronización
//! - Información del sistema y del pool
//!
//! Cada petición trabaja en su propio directorio temporal. Los archivos se
//! borran en todos los caminos de salida.

use crate::archive::TempFiles;
use crate::batch::{
    BatchOutcome, CountdownLatchBatch, FutureComposition, SyncStrategy, TaskId, TaskResult,
    TaskUnit, DEFAULT_BATCH_TIMEOUT,
};
use crate::config::Config;
use crate::error::{ServiceError, UnitError};
use crate::files::{FileGenerator, FileKind, GeneratedFile};
use crate::pool::{PoolStats, ShutdownReport, WorkerPool, DEFAULT_SHUTDOWN_GRACE};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tracing::{error, info};

/// Número de tareas de cada flujo
pub const BATCH_SIZE: TaskId = 5;

/// Tarea que falla en el flujo de archivo con falla
pub const FAILING_TASK: TaskId = 2;

/// Parámetros del servicio
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// 0 = paralelismo disponible del host
    pub pool_size: usize,
    pub batch_timeout: Duration,
    pub shutdown_grace: Duration,
    pub demo_step: Duration,
    pub temp_dir: Option<PathBuf>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            pool_size: 0,
            batch_timeout: DEFAULT_BATCH_TIMEOUT,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
            demo_step: Duration::from_secs(1),
            temp_dir: None,
        }
    }
}

impl From<&Config> for ServiceConfig {
    fn from(config: &Config) -> Self {
        Self {
            pool_size: config.pool_size,
            batch_timeout: config.batch_timeout(),
            shutdown_grace: config.shutdown_grace(),
            demo_step: config.demo_step(),
            temp_dir: config.temp_dir.clone(),
        }
    }
}

/// Resultado de una demo de sincronización
#[derive(Debug, Clone, Serialize)]
pub struct DemoReport {
    pub strategy: SyncStrategy,
    pub submission_order: bool,
    pub fails_on_timeout: bool,
    pub total: usize,
    pub succeeded: usize,
    pub timed_out: bool,
    pub elapsed_ms: u64,
    pub results: Vec<TaskResult<String>>,
}

/// Información del host y del pool
#[derive(Debug, Clone, Serialize)]
pub struct SystemInfo {
    pub available_parallelism: usize,
    pub pool: PoolStats,
    pub pid: u32,
    pub os: &'static str,
    pub arch: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
    pub batch_timeout_ms: u64,
}

pub struct BatchService {
    pool: Arc<WorkerPool>,
    futures: FutureComposition,
    latch: CountdownLatchBatch,
    config: ServiceConfig,
    started: Instant,
}

impl BatchService {
    pub fn new(config: ServiceConfig) -> Self {
        let pool = Arc::new(if config.pool_size == 0 {
            WorkerPool::with_available_parallelism()
        } else {
            WorkerPool::new(config.pool_size)
        });

        Self {
            futures: FutureComposition::new(Arc::clone(&pool), config.batch_timeout),
            latch: CountdownLatchBatch::new(Arc::clone(&pool), config.batch_timeout),
            pool,
            config,
            started: Instant::now(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(ServiceConfig::from(config))
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Crea los 5 archivos en paralelo y retorna el ZIP
    pub fn create_files_and_archive(&self) -> Result<Vec<u8>, ServiceError> {
        info!("running file batch");
        self.archive_flow(None)
    }

    /// Como `create_files_and_archive`, pero la tarea 2 falla a propósito
    pub fn create_files_with_failure_and_archive(&self) -> Result<Vec<u8>, ServiceError> {
        info!(failing_task = FAILING_TASK, "running file batch with a failing task");
        self.archive_flow(Some(FAILING_TASK))
    }

    fn archive_flow(&self, failing: Option<TaskId>) -> Result<Vec<u8>, ServiceError> {
        // Cada tarea retiene el directorio: si la espera vence, la última
        // tarea rezagada es la que lo borra
        let workspace = Arc::new(self.workspace()?);
        let generator = FileGenerator::new(workspace.path());

        let units: Vec<TaskUnit<GeneratedFile>> = FileKind::ALL
            .iter()
            .zip(1..)
            .map(|(&kind, id)| {
                let generator = generator.clone();
                let workspace = Arc::clone(&workspace);
                let fail = failing == Some(id);
                TaskUnit::new(id, move || {
                    let file = if fail {
                        generator.produce_failing(kind, id)
                    } else {
                        generator.produce(kind, id)
                    };
                    // Se suelta antes de entregar el resultado
                    drop(workspace);
                    Ok(file?)
                })
            })
            .collect();

        let outcome = self.futures.join(units)?;

        // Los archivos exitosos quedan bajo el guard antes de revisar fallas
        let mut files = TempFiles::new();
        files.extend(outcome.payloads().map(|file| file.path.clone()));

        let outcome = outcome.ensure_success().map_err(|e| {
            error!(error = %e, "file batch failed");
            e
        })?;

        for file in outcome.payloads() {
            info!(task_id = file.task_id, file = %file.name, size = file.size, "file ready");
        }

        let archive = files.bundle()?;
        info!(bytes = archive.len(), "file batch archived");

        Ok(archive)
    }

    /// Corre 5 tareas que duermen 1-3 pasos con la estrategia indicada
    ///
    /// `fail` hace fallar la tarea con ese id. Cualquier falla hace fallar
    /// la demo con el mensaje agregado.
    pub fn run_demo(
        &self,
        strategy: SyncStrategy,
        fail: Option<TaskId>,
    ) -> Result<DemoReport, ServiceError> {
        info!(strategy = %strategy, ?fail, "running demo batch");

        let step = self.config.demo_step;
        let units = (1..=BATCH_SIZE)
            .map(|id| {
                let sleep = step * ((id - 1) % 3 + 1);
                TaskUnit::new(id, move || {
                    thread::sleep(sleep);
                    if fail == Some(id) {
                        return Err(UnitError::Message(format!(
                            "intentional failure in task {}",
                            id
                        )));
                    }
                    Ok(format!("task {} completed after {} ms", id, sleep.as_millis()))
                })
            })
            .collect::<Vec<_>>();

        let start = Instant::now();
        let outcome: BatchOutcome<String> = match strategy {
            SyncStrategy::FutureComposition => self.futures.run_batch(units)?,
            SyncStrategy::CountdownLatch => self.latch.run_batch(units)?.ensure_success()?,
        };

        Ok(DemoReport {
            strategy,
            submission_order: strategy.preserves_submission_order(),
            fails_on_timeout: strategy.fails_on_timeout(),
            total: BATCH_SIZE as usize,
            succeeded: outcome.succeeded(),
            timed_out: outcome.timed_out,
            elapsed_ms: start.elapsed().as_millis() as u64,
            results: outcome.results,
        })
    }

    pub fn system_info(&self) -> SystemInfo {
        SystemInfo {
            available_parallelism: WorkerPool::available_parallelism(),
            pool: self.pool.stats(),
            pid: std::process::id(),
            os: std::env::consts::OS,
            arch: std::env::consts::ARCH,
            version: env!("CARGO_PKG_VERSION"),
            uptime_secs: self.started.elapsed().as_secs(),
            batch_timeout_ms: self.config.batch_timeout.as_millis() as u64,
        }
    }

    /// Apaga el pool; las llamadas siguientes no tienen efecto
    pub fn shutdown(&self) -> ShutdownReport {
        self.pool.shutdown(self.config.shutdown_grace)
    }

    fn workspace(&self) -> Result<TempDir, ServiceError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("batch-");

        match &self.config.temp_dir {
            Some(dir) => builder.tempdir_in(dir),
            None => builder.tempdir(),
        }
        .map_err(ServiceError::Workspace)
    }
}
