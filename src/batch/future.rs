//! # Sincronizador por Composición de Futures
//! src/batch/future.rs
//!
//! Envía cada tarea al pool (un handle por tarea, en orden de envío),
//! compone la señal conjunta `AllOf` y la espera con timeout. Si vence, el
//! lote completo falla. Si no, lee cada handle en orden y corre el
//! agregador de fallas.

use crate::batch::task::{BatchOutcome, TaskResult, TaskUnit};
use crate::batch::DEFAULT_BATCH_TIMEOUT;
use crate::error::BatchError;
use crate::pool::{AllOf, WorkerPool};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

pub struct FutureComposition {
    pool: Arc<WorkerPool>,
    timeout: Duration,
}

impl FutureComposition {
    pub fn new(pool: Arc<WorkerPool>, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    pub fn with_default_timeout(pool: Arc<WorkerPool>) -> Self {
        Self::new(pool, DEFAULT_BATCH_TIMEOUT)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Ejecuta el lote y espera la señal conjunta, sin agregar fallas
    ///
    /// `results` queda alineado al orden de envío y siempre tiene un
    /// resultado por tarea. Útil para quien necesita liberar recursos de las
    /// tareas exitosas antes de reportar la falla agregada.
    pub fn join<P>(&self, units: Vec<TaskUnit<P>>) -> Result<BatchOutcome<P>, BatchError>
    where
        P: Send + 'static,
    {
        let total = units.len();
        info!(total, timeout_ms = self.timeout.as_millis() as u64, "submitting batch");

        let handles = units
            .into_iter()
            .map(|unit| self.pool.submit(move || unit.run()))
            .collect::<Result<Vec<_>, _>>()?;

        let resolved = AllOf::new(handles).wait(self.timeout).map_err(|timeout| {
            error!(
                pending = timeout.pending,
                resolved = timeout.resolved,
                "batch did not complete in time"
            );
            BatchError::Timeout {
                timeout: self.timeout,
                pending: timeout.pending,
                total,
            }
        })?;

        // Errores inesperados (pánico, interrupción) se capturan aquí, un nivel
        // arriba de la unidad, donde ya no se conoce su id
        let results = resolved
            .into_iter()
            .map(|outcome| {
                outcome.unwrap_or_else(|e| {
                    warn!(error = %e, "task handle resolved without a result");
                    TaskResult::failure(None, e.to_string())
                })
            })
            .collect();

        Ok(BatchOutcome::new(results, false))
    }

    /// Ejecuta el lote completo: join + agregación de fallas
    pub fn run_batch<P>(&self, units: Vec<TaskUnit<P>>) -> Result<BatchOutcome<P>, BatchError>
    where
        P: Send + 'static,
    {
        let outcome = self.join(units)?.ensure_success()?;
        info!(completed = outcome.len(), "all tasks completed");
        Ok(outcome)
    }
}
