//! # Módulo del Servidor HTTP
//! src/server/mod.rs
//!
//! Servidor TCP que:
//! 1. Escucha en un puerto
//! 2. Acepta conexiones (un thread por conexión)
//! 3. Lee y parsea el request HTTP/1.0
//! 4. Lo enruta a un handler y envía la respuesta

pub mod tcp;

pub use tcp::{Server, StopHandle};
