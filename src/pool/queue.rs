//! # Cola de Trabajos
//! src/pool/queue.rs
//!
//! Cola FIFO thread-safe y sin límite de capacidad: encolar nunca bloquea
//! al que envía. Los workers se bloquean en `pop` hasta que haya trabajo o
//! la cola se cierre.

use crate::error::PoolError;
use crate::pool::lock;
use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};

/// Unidad de ejecución que corre un worker
pub type Job = Box<dyn FnOnce() + Send + 'static>;

struct QueueState {
    jobs: VecDeque<Job>,
    closed: bool,
}

/// Cola compartida entre el pool y sus workers
#[derive(Clone)]
pub struct JobQueue {
    state: Arc<Mutex<QueueState>>,

    /// Notifica a los workers cuando hay trabajo nuevo o la cola se cierra
    condvar: Arc<Condvar>,
}

impl JobQueue {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(QueueState {
                jobs: VecDeque::new(),
                closed: false,
            })),
            condvar: Arc::new(Condvar::new()),
        }
    }

    /// Encola un trabajo
    ///
    /// Retorna `Err(PoolError::ShutDown)` si la cola ya fue cerrada; en ese
    /// caso el trabajo se descarta aquí mismo.
    pub fn push(&self, job: Job) -> Result<(), PoolError> {
        let mut state = lock(&self.state);

        if state.closed {
            return Err(PoolError::ShutDown);
        }

        state.jobs.push_back(job);
        self.condvar.notify_one();

        Ok(())
    }

    /// Desencola el siguiente trabajo
    ///
    /// Bloquea mientras la cola esté vacía y abierta. Retorna `None` solo
    /// cuando está cerrada y ya no queda nada por hacer.
    pub fn pop(&self) -> Option<Job> {
        let mut state = lock(&self.state);

        loop {
            if let Some(job) = state.jobs.pop_front() {
                return Some(job);
            }
            if state.closed {
                return None;
            }
            state = self
                .condvar
                .wait(state)
                .unwrap_or_else(std::sync::PoisonError::into_inner);
        }
    }

    /// Cierra la cola y despierta a todos los workers
    pub fn close(&self) {
        let mut state = lock(&self.state);
        state.closed = true;
        self.condvar.notify_all();
    }

    /// Retira todos los trabajos pendientes (apagado forzado)
    pub fn drain(&self) -> Vec<Job> {
        let mut state = lock(&self.state);
        state.jobs.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        lock(&self.state).jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.state).closed
    }
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new()
    }
}
