//! # Errores del motor de lotes
//! src/error.rs
//!
//! Taxonomía de errores, de la unidad hacia afuera:
//!
//! - `UnitError`: falla propia de una tarea (se convierte en `TaskResult::Failure`)
//! - `TaskError`: el handle de una tarea no produjo valor (pánico o interrupción)
//! - `PoolError`: el pool ya no acepta trabajo
//! - `BatchError`: timeout del lote o fallo agregado
//! - `ArchiveError`: error al construir el ZIP
//! - `ServiceError`: lo que ve la capa HTTP
//!
//! Los errores de limpieza de archivos temporales no tienen tipo: solo se loguean.

use std::io;
use std::time::Duration;
use thiserror::Error;

use crate::batch::TaskId;

/// Falla de una unidad de trabajo
#[derive(Debug, Error)]
pub enum UnitError {
    #[error("file creation error: {0}")]
    Io(#[from] io::Error),

    #[error("{0}")]
    Message(String),
}

/// Resultado de un handle que nunca produjo valor
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    #[error("task panicked: {0}")]
    Panicked(String),

    /// El trabajo fue descartado por un apagado forzado antes de ejecutarse
    #[error("task was interrupted before completing")]
    Interrupted,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("worker pool is shut down and no longer accepts work")]
    ShutDown,
}

/// Error de un lote completo
#[derive(Debug, Error)]
pub enum BatchError {
    /// El join no se resolvió dentro del presupuesto (solo composición de futures)
    #[error("batch timed out after {timeout:?} with {pending} of {total} tasks still pending")]
    Timeout {
        timeout: Duration,
        pending: usize,
        total: usize,
    },

    /// Una o más tareas fallaron; `message` las enumera todas
    #[error("the following tasks failed: {message}")]
    Aggregate {
        message: String,
        failed: Vec<Option<TaskId>>,
    },

    #[error(transparent)]
    Pool(#[from] PoolError),
}

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("archive I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// Error de una operación del servicio
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("task execution failed: {0}")]
    Batch(#[from] BatchError),

    #[error("archive creation failed: {0}")]
    Archive(#[from] ArchiveError),

    #[error("could not prepare the request workspace: {0}")]
    Workspace(#[source] io::Error),
}
