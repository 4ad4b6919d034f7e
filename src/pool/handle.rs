//! # Handles de Tareas
//! src/pool/handle.rs
//!
//! Un `TaskHandle<T>` representa el resultado todavía desconocido de un
//! trabajo enviado al pool. Por debajo es un canal de un solo mensaje: si el
//! trabajo se descarta sin ejecutarse (apagado forzado) el emisor se destruye
//! y el handle se resuelve como `TaskError::Interrupted`.
//!
//! `AllOf` es la señal conjunta: se resuelve solo cuando todos los handles
//! se resolvieron, con éxito o con falla. La falla de uno no corta la espera
//! de los demás.

use crate::error::TaskError;
use std::sync::mpsc::{self, RecvTimeoutError, TryRecvError};
use std::time::{Duration, Instant};

type Slot<T> = Result<T, TaskError>;

/// Lado del worker: entrega el resultado una única vez
pub(crate) struct Completer<T> {
    tx: mpsc::Sender<Slot<T>>,
}

impl<T> Completer<T> {
    /// Entrega el resultado. Si nadie espera (p. ej. el lote ya expiró) se ignora.
    pub(crate) fn complete(self, outcome: Slot<T>) {
        let _ = self.tx.send(outcome);
    }
}

/// Resultado eventual de un trabajo
pub struct TaskHandle<T> {
    rx: mpsc::Receiver<Slot<T>>,
}

/// Crea un par completer/handle conectados
pub(crate) fn channel<T>() -> (Completer<T>, TaskHandle<T>) {
    let (tx, rx) = mpsc::channel();
    (Completer { tx }, TaskHandle { rx })
}

impl<T> TaskHandle<T> {
    /// Bloquea hasta que el trabajo se resuelva
    pub fn join(self) -> Result<T, TaskError> {
        self.rx.recv().unwrap_or(Err(TaskError::Interrupted))
    }

    /// Espera como máximo `timeout`; `None` si el trabajo sigue en curso
    pub fn join_timeout(&self, timeout: Duration) -> Option<Result<T, TaskError>> {
        match self.rx.recv_timeout(timeout) {
            Ok(outcome) => Some(outcome),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(Err(TaskError::Interrupted)),
        }
    }

    /// Consulta sin bloquear
    pub fn try_join(&self) -> Option<Result<T, TaskError>> {
        match self.rx.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(TaskError::Interrupted)),
        }
    }
}

/// La espera conjunta excedió su presupuesto
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinTimeout {
    /// Handles resueltos antes de expirar
    pub resolved: usize,

    /// Handles que seguían en curso
    pub pending: usize,
}

/// Señal conjunta sobre varios handles
pub struct AllOf<T> {
    handles: Vec<TaskHandle<T>>,
}

impl<T> AllOf<T> {
    pub fn new(handles: Vec<TaskHandle<T>>) -> Self {
        Self { handles }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Espera a que todos los handles se resuelvan, con un único deadline
    ///
    /// Retorna los resultados en el mismo orden en que se crearon los
    /// handles. Si el deadline vence antes, retorna `JoinTimeout` y los
    /// resultados ya obtenidos se descartan.
    pub fn wait(self, timeout: Duration) -> Result<Vec<Result<T, TaskError>>, JoinTimeout> {
        let total = self.handles.len();
        let deadline = Instant::now() + timeout;
        let mut resolved = Vec::with_capacity(total);
        let mut handles = self.handles.into_iter();

        while let Some(handle) = handles.next() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match handle.join_timeout(remaining) {
                Some(outcome) => resolved.push(outcome),
                None => {
                    let finished_late = handles.by_ref().filter(|h| h.try_join().is_some()).count();
                    let resolved = resolved.len() + finished_late;
                    return Err(JoinTimeout {
                        resolved,
                        pending: total - resolved,
                    });
                }
            }
        }

        Ok(resolved)
    }
}
