//! # Tareas y Resultados
//! src/batch/task.rs
//!
//! Tipos del modelo de datos del lote: la unidad de trabajo, su resultado
//! y el resultado del lote completo.

use crate::batch::aggregate::{self, FailedTask};
use crate::error::{BatchError, UnitError};
use serde::Serialize;
use std::thread;
use std::time::Instant;
use tracing::{debug, error};

/// Identificador de una tarea dentro de un lote
pub type TaskId = u32;

type Work<P> = Box<dyn FnOnce() -> Result<P, UnitError> + Send + 'static>;

/// Unidad de trabajo: un id y una función que se ejecuta una sola vez
pub struct TaskUnit<P> {
    id: TaskId,
    work: Work<P>,
}

impl<P> TaskUnit<P> {
    pub fn new<F>(id: TaskId, work: F) -> Self
    where
        F: FnOnce() -> Result<P, UnitError> + Send + 'static,
    {
        Self {
            id,
            work: Box::new(work),
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Ejecuta la unidad en el thread actual
    ///
    /// La falla propia de la unidad (`UnitError`) nunca sale de aquí: se
    /// convierte en `TaskResult::Failure`.
    pub fn run(self) -> TaskResult<P> {
        let id = self.id;
        let start = Instant::now();
        let worker = thread::current()
            .name()
            .unwrap_or("unnamed")
            .to_string();

        debug!(task_id = id, worker = %worker, "task started");

        match (self.work)() {
            Ok(payload) => {
                let elapsed_ms = start.elapsed().as_millis() as u64;
                debug!(task_id = id, elapsed_ms, "task finished");
                TaskResult::Success {
                    id,
                    payload,
                    metadata: TaskMetadata { worker, elapsed_ms },
                }
            }
            Err(e) => {
                error!(task_id = id, error = %e, "task failed");
                TaskResult::failure(Some(id), e.to_string())
            }
        }
    }
}

impl<P> std::fmt::Debug for TaskUnit<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskUnit").field("id", &self.id).finish_non_exhaustive()
    }
}

/// Datos de ejecución de una tarea exitosa
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskMetadata {
    /// Nombre del thread del pool que la ejecutó
    pub worker: String,
    pub elapsed_ms: u64,
}

/// Resultado de una tarea: exactamente una de las dos variantes
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum TaskResult<P> {
    Success {
        id: TaskId,
        payload: P,
        metadata: TaskMetadata,
    },

    /// `id` es `None` cuando la falla se capturó en el borde del handle,
    /// donde ya no se sabe qué tarea la produjo
    Failure { id: Option<TaskId>, message: String },
}

impl<P> TaskResult<P> {
    pub fn failure(id: Option<TaskId>, message: impl Into<String>) -> Self {
        TaskResult::Failure {
            id,
            message: message.into(),
        }
    }

    pub fn id(&self) -> Option<TaskId> {
        match self {
            TaskResult::Success { id, .. } => Some(*id),
            TaskResult::Failure { id, .. } => *id,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TaskResult::Success { .. })
    }

    pub fn payload(&self) -> Option<&P> {
        match self {
            TaskResult::Success { payload, .. } => Some(payload),
            TaskResult::Failure { .. } => None,
        }
    }

    pub fn into_payload(self) -> Option<P> {
        match self {
            TaskResult::Success { payload, .. } => Some(payload),
            TaskResult::Failure { .. } => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            TaskResult::Success { .. } => None,
            TaskResult::Failure { message, .. } => Some(message),
        }
    }
}

/// Resultado de un lote completo
#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome<P> {
    /// Con composición de futures: alineado al orden de envío y de la misma
    /// longitud que el lote. Con countdown-latch: orden de finalización.
    pub results: Vec<TaskResult<P>>,

    /// Fallas en el orden en que aparecen en `results`
    pub failures: Vec<FailedTask>,

    /// La espera venció antes de que terminaran todas las tareas
    pub timed_out: bool,
}

impl<P> BatchOutcome<P> {
    pub fn new(results: Vec<TaskResult<P>>, timed_out: bool) -> Self {
        let failures = aggregate::collect_failures(&results);
        Self {
            results,
            failures,
            timed_out,
        }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    /// Payloads de las tareas exitosas, en el orden de `results`
    pub fn payloads(&self) -> impl Iterator<Item = &P> {
        self.results.iter().filter_map(TaskResult::payload)
    }

    pub fn into_payloads(self) -> Vec<P> {
        self.results
            .into_iter()
            .filter_map(TaskResult::into_payload)
            .collect()
    }

    /// Corre el agregador de fallas: si alguna tarea falló, el lote falla
    /// con un único mensaje que las enumera todas
    pub fn ensure_success(self) -> Result<Self, BatchError> {
        aggregate::aggregate(&self.results).into_result()?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_run_success_records_metadata() {
        let unit = TaskUnit::new(3, || Ok::<_, UnitError>("payload"));
        assert_eq!(unit.id(), 3);

        match unit.run() {
            TaskResult::Success { id, payload, metadata } => {
                assert_eq!(id, 3);
                assert_eq!(payload, "payload");
                assert!(!metadata.worker.is_empty());
            }
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[test]
    fn test_run_converts_unit_error_to_failure() {
        let unit: TaskUnit<()> = TaskUnit::new(2, || {
            Err(UnitError::from(io::Error::other("no space")))
        });

        let result = unit.run();
        assert!(!result.is_success());
        assert_eq!(result.id(), Some(2));
        assert_eq!(result.error_message(), Some("file creation error: no space"));
    }

    #[test]
    fn test_outcome_collects_failures_in_order() {
        let results = vec![
            TaskResult::failure(Some(4), "four"),
            TaskResult::Success {
                id: 1,
                payload: 10,
                metadata: TaskMetadata {
                    worker: "w".to_string(),
                    elapsed_ms: 0,
                },
            },
            TaskResult::failure(None, "lost"),
        ];

        let outcome = BatchOutcome::new(results, false);
        assert_eq!(outcome.len(), 3);
        assert_eq!(outcome.succeeded(), 1);
        assert_eq!(outcome.failures.len(), 2);
        assert_eq!(outcome.failures[0].id, Some(4));
        assert_eq!(outcome.failures[1].id, None);
        assert_eq!(outcome.payloads().copied().collect::<Vec<_>>(), vec![10]);
    }

    #[test]
    fn test_ensure_success_fails_with_all_messages() {
        let results: Vec<TaskResult<u32>> = vec![
            TaskResult::failure(Some(1), "a"),
            TaskResult::failure(Some(2), "b"),
        ];

        let err = BatchOutcome::new(results, false).ensure_success().unwrap_err();
        assert!(err.to_string().contains("task 1: a, task 2: b"));
    }

    #[test]
    fn test_failure_serializes_with_status_tag() {
        let result: TaskResult<u32> = TaskResult::failure(Some(5), "bad");
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["status"], "failure");
        assert_eq!(json["id"], 5);
        assert_eq!(json["message"], "bad");
    }
}
