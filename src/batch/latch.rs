//! # Sincronizador por Countdown Latch
//! src/batch/latch.rs
//!
//! Un contador compartido se inicializa con el número de tareas. Cada tarea
//! agrega su resultado a un vector compartido y después decrementa el
//! contador, pase lo que pase (retorno, error, pánico o descarte por un
//! apagado forzado). El iniciador espera a que llegue a cero con timeout.
//!
//! A diferencia de la composición de futures, un timeout aquí no hace
//! fallar el lote: se continúa con los resultados que alcanzaron a llegar.

use crate::batch::task::{BatchOutcome, TaskResult, TaskUnit};
use crate::batch::DEFAULT_BATCH_TIMEOUT;
use crate::error::{BatchError, TaskError};
use crate::pool::{lock, panic_message, WorkerPool};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;
use tracing::{error, info, warn};

/// Contador que libera a quien espera cuando llega a cero
#[derive(Debug)]
pub struct CountDownLatch {
    count: Mutex<usize>,
    zero: Condvar,
}

impl CountDownLatch {
    pub fn new(count: usize) -> Self {
        Self {
            count: Mutex::new(count),
            zero: Condvar::new(),
        }
    }

    /// Decrementa en uno; en cero no hace nada
    pub fn count_down(&self) {
        let mut count = lock(&self.count);
        if *count == 0 {
            return;
        }

        *count -= 1;
        if *count == 0 {
            self.zero.notify_all();
        }
    }

    pub fn count(&self) -> usize {
        *lock(&self.count)
    }

    /// Espera hasta que el contador llegue a cero o venza `timeout`.
    /// Retorna `true` si llegó a cero.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let guard = lock(&self.count);
        let (count, _) = self
            .zero
            .wait_timeout_while(guard, timeout, |count| *count > 0)
            .unwrap_or_else(PoisonError::into_inner);

        *count == 0
    }
}

/// Decrementa el latch exactamente una vez, al destruirse
///
/// Se crea fuera del trabajo y se mueve dentro, así que un trabajo que el
/// pool descarta sin ejecutar también cuenta.
#[derive(Debug)]
pub struct CountDownGuard {
    latch: Arc<CountDownLatch>,
}

impl CountDownGuard {
    pub fn new(latch: Arc<CountDownLatch>) -> Self {
        Self { latch }
    }
}

impl Drop for CountDownGuard {
    fn drop(&mut self) {
        self.latch.count_down();
    }
}

pub struct CountdownLatchBatch {
    pool: Arc<WorkerPool>,
    timeout: Duration,
}

impl CountdownLatchBatch {
    pub fn new(pool: Arc<WorkerPool>, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    pub fn with_default_timeout(pool: Arc<WorkerPool>) -> Self {
        Self::new(pool, DEFAULT_BATCH_TIMEOUT)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Ejecuta el lote y espera el latch
    ///
    /// `results` queda en orden de finalización. Si la espera vence,
    /// `timed_out` es `true` y `results` puede ser más corto que el lote.
    /// El único error es que el pool rechace trabajo.
    pub fn run_batch<P>(&self, units: Vec<TaskUnit<P>>) -> Result<BatchOutcome<P>, BatchError>
    where
        P: Send + 'static,
    {
        let total = units.len();
        let latch = Arc::new(CountDownLatch::new(total));
        let results: Arc<Mutex<Vec<TaskResult<P>>>> = Arc::new(Mutex::new(Vec::with_capacity(total)));

        info!(total, timeout_ms = self.timeout.as_millis() as u64, "submitting latch batch");

        for (index, unit) in units.into_iter().enumerate() {
            let guard = CountDownGuard::new(Arc::clone(&latch));
            let results = Arc::clone(&results);
            let id = unit.id();

            let submitted = self.pool.execute(move || {
                let result = panic::catch_unwind(AssertUnwindSafe(|| unit.run()))
                    .unwrap_or_else(|payload| {
                        let e = TaskError::Panicked(panic_message(&*payload));
                        error!(task_id = id, error = %e, "task failed");
                        TaskResult::failure(Some(id), e.to_string())
                    });

                lock(&results).push(result);
                drop(guard);
            });

            if let Err(e) = submitted {
                // El trabajo rechazado ya decrementó al descartarse
                for _ in index + 1..total {
                    latch.count_down();
                }
                error!(task_id = id, "pool refused latch batch work");
                return Err(e.into());
            }
        }

        let completed = latch.wait_timeout(self.timeout);
        let results = std::mem::take(&mut *lock(&results));

        if !completed {
            warn!(
                arrived = results.len(),
                total,
                "latch wait timed out, continuing with partial results"
            );
        } else {
            info!(completed = results.len(), "all latch tasks completed");
        }

        Ok(BatchOutcome::new(results, !completed))
    }
}
