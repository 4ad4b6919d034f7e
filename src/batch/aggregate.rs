//! # Agregador de Fallas
//! src/batch/aggregate.rs
//!
//! Recorre los resultados en orden y junta todas las fallas en un único
//! mensaje determinístico: `"task {id}: {message}"` separados por `", "`.
//! No es "gana el primer error": el llamador ve todas las fallas juntas.

use crate::batch::task::{TaskId, TaskResult};
use crate::error::BatchError;
use serde::Serialize;

/// Separador entre entradas del mensaje agregado
pub const SEPARATOR: &str = ", ";

/// Una tarea fallida dentro de un lote
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedTask {
    pub id: Option<TaskId>,
    pub message: String,
}

impl std::fmt::Display for FailedTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.id {
            Some(id) => write!(f, "task {}: {}", id, self.message),
            None => write!(f, "task unknown: {}", self.message),
        }
    }
}

/// Resultado de la agregación
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregation {
    pub ok: bool,

    /// Vacío cuando `ok`
    pub message: String,

    pub failures: Vec<FailedTask>,
}

impl Aggregation {
    /// `Ok(())` si no hubo fallas, `BatchError::Aggregate` si las hubo
    pub fn into_result(self) -> Result<(), BatchError> {
        if self.ok {
            return Ok(());
        }

        Err(BatchError::Aggregate {
            failed: self.failures.iter().map(|f| f.id).collect(),
            message: self.message,
        })
    }
}

/// Extrae `(id, mensaje)` de cada `Failure`, en orden
pub fn collect_failures<P>(results: &[TaskResult<P>]) -> Vec<FailedTask> {
    results
        .iter()
        .filter_map(|result| match result {
            TaskResult::Failure { id, message } => Some(FailedTask {
                id: *id,
                message: message.clone(),
            }),
            TaskResult::Success { .. } => None,
        })
        .collect()
}

/// Agrega las fallas de un lote
pub fn aggregate<P>(results: &[TaskResult<P>]) -> Aggregation {
    let failures = collect_failures(results);

    if failures.is_empty() {
        return Aggregation {
            ok: true,
            message: String::new(),
            failures,
        };
    }

    let message = failures
        .iter()
        .map(FailedTask::to_string)
        .collect::<Vec<_>>()
        .join(SEPARATOR);

    Aggregation {
        ok: false,
        message,
        failures,
    }
}
