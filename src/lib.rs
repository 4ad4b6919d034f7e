//! # Batch Server
//! src/lib.rs
//!
//! Motor de ejecución de lotes de tareas en paralelo sobre un pool fijo de
//! threads, con una capa HTTP/1.0 implementada desde cero para dispararlo.
//!
//! ## Arquitectura
//!
//! ```text
//! HTTP → router → handlers → BatchService → sincronizador → WorkerPool → tareas
//!                                                │
//!                                   agregador de fallas → ZIP → HTTP
//! ```
//!
//! - `pool`: pool fijo de workers, handles y señal conjunta
//! - `batch`: tareas, resultados, las dos estrategias de sincronización y el agregador
//! - `files`: generador de archivos por tarea
//! - `archive`: ZIP en memoria y limpieza de temporales
//! - `service`: flujos de archivo, demos e información del sistema
//! - `http`, `router`, `handlers`, `server`: la capa HTTP/1.0
//! - `config`, `error`: configuración CLI y taxonomía de errores
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use batch_server::service::{BatchService, ServiceConfig};
//!
//! let service = BatchService::new(ServiceConfig::default());
//! let zip = service.create_files_and_archive().unwrap();
//! println!("{} bytes", zip.len());
//! service.shutdown();
//! ```

pub mod archive;
pub mod batch;
pub mod config;
pub mod error;
pub mod files;
pub mod handlers;
pub mod http;
pub mod pool;
pub mod router;
pub mod server;
pub mod service;
