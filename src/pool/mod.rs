//! # Pool de Workers
//! src/pool/mod.rs
//!
//! Pool fijo de threads del sistema operativo, dimensionado una sola vez
//! al paralelismo disponible del host.
//!
//! ```text
//! submit(f) ──► JobQueue (FIFO, sin límite) ──► batch-worker-0..N
//!     │                                              │
//!     └──────────── TaskHandle<T> ◄──────────────────┘
//! ```
//!
//! - `queue`: cola thread-safe con `Mutex` + `Condvar`
//! - `handle`: resultado eventual de un trabajo y la señal conjunta `AllOf`
//! - `worker`: el pool en sí, con apagado idempotente

pub mod handle;
pub mod queue;
pub mod worker;

pub use handle::{AllOf, JoinTimeout, TaskHandle};
pub use queue::JobQueue;
pub use worker::{PoolStats, ShutdownReport, WorkerPool, DEFAULT_SHUTDOWN_GRACE};

use std::any::Any;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Toma un lock ignorando el envenenamiento: un pánico en un trabajo no
/// debe dejar inservible el estado compartido del pool.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Extrae el mensaje de un payload de pánico
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
