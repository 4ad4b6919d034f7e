//! # Pool Fijo de Workers
//! src/pool/worker.rs
//!
//! Pool de tamaño fijo (por defecto, el paralelismo disponible del host).
//! Se crea una vez al iniciar el servicio y se apaga una sola vez al
//! terminar; llamar `shutdown` de nuevo no hace nada.
//!
//! Ningún trabajo se pierde en silencio: cada trabajo enviado se completa,
//! falla (pánico capturado) o se reporta como interrumpido.

use crate::error::{PoolError, TaskError};
use crate::pool::handle::{self, TaskHandle};
use crate::pool::queue::JobQueue;
use crate::pool::{lock, panic_message};
use serde::Serialize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Período de gracia por defecto para que terminen los trabajos en curso
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(60);

/// Cada cuánto se revisa si los workers terminaron durante el apagado
const SHUTDOWN_POLL: Duration = Duration::from_millis(20);

#[derive(Default)]
struct Counters {
    active: AtomicUsize,
    completed: AtomicUsize,
}

/// Snapshot del estado del pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub size: usize,
    pub queued: usize,
    pub active: usize,
    pub completed: usize,
    pub shut_down: bool,
}

/// Resultado de `WorkerPool::shutdown`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReport {
    /// Todos los workers terminaron dentro del período de gracia
    Graceful,

    /// Venció la gracia: se descartaron trabajos en cola y/o quedaron
    /// workers ocupados que se sueltan sin esperar
    Forced { interrupted: usize, detached: usize },

    /// El pool ya estaba apagado; la llamada no tuvo efecto
    AlreadyShutDown,
}

/// Pool fijo de threads
pub struct WorkerPool {
    size: usize,
    queue: JobQueue,
    workers: Mutex<Vec<JoinHandle<()>>>,
    shut_down: AtomicBool,
    counters: Arc<Counters>,
}

impl WorkerPool {
    /// Crea un pool con `size` workers (mínimo 1)
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        let queue = JobQueue::new();
        let counters = Arc::new(Counters::default());

        let workers = (0..size)
            .map(|i| {
                let name = format!("batch-worker-{}", i);
                let queue = queue.clone();
                let counters = Arc::clone(&counters);

                thread::Builder::new()
                    .name(name.clone())
                    .spawn(move || Self::worker_loop(name, queue, counters))
                    .unwrap_or_else(|e| panic!("failed to spawn pool worker {}: {}", i, e))
            })
            .collect();

        info!(size, "worker pool started");

        Self {
            size,
            queue,
            workers: Mutex::new(workers),
            shut_down: AtomicBool::new(false),
            counters,
        }
    }

    /// Crea un pool dimensionado al paralelismo disponible del host
    pub fn with_available_parallelism() -> Self {
        Self::new(Self::available_parallelism())
    }

    /// Número de unidades de ejecución del host (1 si no se puede determinar)
    pub fn available_parallelism() -> usize {
        thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }

    /// Loop principal de cada worker
    fn worker_loop(name: String, queue: JobQueue, counters: Arc<Counters>) {
        debug!(worker = %name, "worker started");

        while let Some(job) = queue.pop() {
            counters.active.fetch_add(1, Ordering::SeqCst);

            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
                warn!(worker = %name, panic = %panic_message(&*payload), "job panicked");
            }

            counters.active.fetch_sub(1, Ordering::SeqCst);
            counters.completed.fetch_add(1, Ordering::SeqCst);
        }

        debug!(worker = %name, "worker stopped");
    }

    /// Envía un trabajo y retorna el handle de su resultado
    ///
    /// Nunca bloquea. Un pánico dentro de `work` se captura y el handle se
    /// resuelve como `TaskError::Panicked`.
    pub fn submit<F, T>(&self, work: F) -> Result<TaskHandle<T>, PoolError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (completer, handle) = handle::channel();

        self.execute(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(work))
                .map_err(|payload| TaskError::Panicked(panic_message(&*payload)));
            completer.complete(outcome);
        })?;

        Ok(handle)
    }

    /// Envía un trabajo sin handle (fire-and-forget)
    pub fn execute<F>(&self, work: F) -> Result<(), PoolError>
    where
        F: FnOnce() + Send + 'static,
    {
        if self.is_shut_down() {
            return Err(PoolError::ShutDown);
        }

        self.queue.push(Box::new(work))
    }

    /// Apaga el pool
    ///
    /// 1. Deja de aceptar trabajo nuevo
    /// 2. Espera hasta `grace` a que los workers vacíen la cola
    /// 3. Si vence la gracia, descarta lo que quede en cola (sus handles se
    ///    resuelven como interrumpidos) y suelta a los workers ocupados
    ///
    /// Solo la primera llamada tiene efecto.
    pub fn shutdown(&self, grace: Duration) -> ShutdownReport {
        if self
            .shut_down
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("worker pool already shut down");
            return ShutdownReport::AlreadyShutDown;
        }

        info!(grace_ms = grace.as_millis() as u64, "shutting down worker pool");
        self.queue.close();

        let workers: Vec<JoinHandle<()>> = std::mem::take(&mut *lock(&self.workers));
        let deadline = Instant::now() + grace;

        while !workers.iter().all(|w| w.is_finished()) && Instant::now() < deadline {
            thread::sleep(SHUTDOWN_POLL);
        }

        // Los trabajos descartados destruyen su completer o su guard al salir de scope
        let interrupted = self.queue.drain().len();

        let mut detached = 0;
        for worker in workers {
            if worker.is_finished() {
                let _ = worker.join();
            } else {
                detached += 1;
            }
        }

        if interrupted == 0 && detached == 0 {
            info!("worker pool shut down gracefully");
            ShutdownReport::Graceful
        } else {
            warn!(interrupted, detached, "worker pool shutdown forced after grace period");
            ShutdownReport::Forced {
                interrupted,
                detached,
            }
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            size: self.size,
            queued: self.queue.len(),
            active: self.counters.active.load(Ordering::SeqCst),
            completed: self.counters.completed.load(Ordering::SeqCst),
            shut_down: self.is_shut_down(),
        }
    }
}

impl Drop for WorkerPool {
    /// Si nadie llamó `shutdown`, cierra la cola y deja que los workers
    /// terminen lo encolado por su cuenta, sin bloquear.
    fn drop(&mut self) {
        if !self.shut_down.swap(true, Ordering::SeqCst) {
            self.queue.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_pool_size_is_at_least_one() {
        let pool = WorkerPool::new(0);
        assert_eq!(pool.size(), 1);
    }

    #[test]
    fn test_available_parallelism_is_positive() {
        assert!(WorkerPool::available_parallelism() >= 1);
        let pool = WorkerPool::with_available_parallelism();
        assert_eq!(pool.size(), WorkerPool::available_parallelism());
    }

    #[test]
    fn test_submit_returns_value() {
        let pool = WorkerPool::new(2);
        let handle = pool.submit(|| 6 * 7).unwrap();

        assert_eq!(handle.join(), Ok(42));
    }

    #[test]
    fn test_runs_on_named_worker_threads() {
        let pool = WorkerPool::new(1);
        let handle = pool
            .submit(|| thread::current().name().map(str::to_string))
            .unwrap();

        assert_eq!(handle.join(), Ok(Some("batch-worker-0".to_string())));
    }

    #[test]
    fn test_panic_is_reported_and_worker_survives() {
        let pool = WorkerPool::new(1);

        let failed = pool.submit(|| -> u32 { panic!("unexpected") }).unwrap();
        assert_eq!(
            failed.join(),
            Err(TaskError::Panicked("unexpected".to_string()))
        );

        let next = pool.submit(|| 1).unwrap();
        assert_eq!(next.join(), Ok(1));
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let pool = WorkerPool::new(2);

        assert_eq!(pool.shutdown(Duration::from_secs(5)), ShutdownReport::Graceful);
        let stats = pool.stats();

        assert_eq!(pool.shutdown(Duration::from_secs(5)), ShutdownReport::AlreadyShutDown);
        assert_eq!(pool.stats(), stats);
        assert!(pool.is_shut_down());
    }

    #[test]
    fn test_submit_after_shutdown_is_rejected() {
        let pool = WorkerPool::new(1);
        pool.shutdown(Duration::from_secs(5));

        assert!(matches!(pool.submit(|| 1), Err(PoolError::ShutDown)));
        assert_eq!(pool.execute(|| {}), Err(PoolError::ShutDown));
    }

    #[test]
    fn test_graceful_shutdown_finishes_queued_work() {
        let pool = WorkerPool::new(1);
        let handles: Vec<_> = (0..4)
            .map(|i| {
                pool.submit(move || {
                    thread::sleep(Duration::from_millis(10));
                    i
                })
                .unwrap()
            })
            .collect();

        assert_eq!(pool.shutdown(Duration::from_secs(5)), ShutdownReport::Graceful);

        let values: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(values, vec![0, 1, 2, 3]);
        assert_eq!(pool.stats().completed, 4);
    }

    #[test]
    fn test_forced_shutdown_interrupts_queued_work() {
        let pool = WorkerPool::new(1);
        let (started_tx, started_rx) = mpsc::channel();

        let running = pool
            .submit(move || {
                started_tx.send(()).unwrap();
                thread::sleep(Duration::from_millis(300));
                "done"
            })
            .unwrap();
        started_rx.recv().unwrap();

        let queued = pool.submit(|| "never runs").unwrap();

        let report = pool.shutdown(Duration::ZERO);
        assert_eq!(
            report,
            ShutdownReport::Forced {
                interrupted: 1,
                detached: 1
            }
        );
        assert_eq!(queued.join(), Err(TaskError::Interrupted));
        assert_eq!(running.join(), Ok("done"));
    }

    #[test]
    fn test_stats_track_completed_jobs() {
        let pool = WorkerPool::new(2);
        for _ in 0..3 {
            pool.submit(|| ()).unwrap().join().unwrap();
        }

        let stats = pool.stats();
        assert_eq!(stats.size, 2);
        assert_eq!(stats.queued, 0);
        assert!(!stats.shut_down);
        // `completed` se incrementa después de entregar el resultado
        thread::sleep(Duration::from_millis(20));
        assert_eq!(pool.stats().completed, 3);
    }
}
