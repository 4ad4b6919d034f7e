//! # Motor de Lotes
//! src/batch/mod.rs
//!
//! Ejecuta un lote fijo de tareas independientes sobre el pool compartido.
//! Hay dos estrategias de sincronización, intercambiables pero con
//! semánticas distintas a propósito:
//!
//! | Estrategia | Orden de resultados | Timeout |
//! |---|---|---|
//! | `FutureComposition` | orden de envío | falla el lote completo |
//! | `CountdownLatchBatch` | orden de finalización | continúa con resultados parciales |
//!
//! Después de sincronizar, el agregador de fallas (`aggregate`) decide si
//! el lote fue exitoso y arma un único mensaje con todas las fallas.

pub mod aggregate;
pub mod future;
pub mod latch;
pub mod task;

pub use aggregate::{aggregate, Aggregation, FailedTask};
pub use future::FutureComposition;
pub use latch::{CountDownGuard, CountDownLatch, CountdownLatchBatch};
pub use task::{BatchOutcome, TaskId, TaskMetadata, TaskResult, TaskUnit};

pub use crate::error::BatchError;

use serde::Serialize;
use std::time::Duration;

/// Presupuesto por defecto para esperar un lote
pub const DEFAULT_BATCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Estrategia de sincronización de un lote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncStrategy {
    /// Un handle por tarea + señal conjunta; timeout = falla total
    FutureComposition,

    /// Contador compartido decrementado por cada tarea; timeout = parcial
    CountdownLatch,
}

impl SyncStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStrategy::FutureComposition => "future-composition",
            SyncStrategy::CountdownLatch => "countdown-latch",
        }
    }

    /// Indica si los resultados quedan alineados al orden de envío
    pub fn preserves_submission_order(&self) -> bool {
        matches!(self, SyncStrategy::FutureComposition)
    }

    /// Indica si un timeout hace fallar el lote completo
    pub fn fails_on_timeout(&self) -> bool {
        matches!(self, SyncStrategy::FutureComposition)
    }
}

impl std::fmt::Display for SyncStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
