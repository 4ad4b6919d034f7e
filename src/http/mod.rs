//! # Módulo HTTP
//! src/http/mod.rs
//!
//! Protocolo HTTP/1.0 (RFC 1945) implementado desde cero:
//!
//! - Parsing de requests (`GET`/`HEAD`, query string, headers)
//! - Construcción de responses (JSON, errores, descargas)
//! - Códigos de estado
//!
//! Una conexión, un request, una respuesta: no hay conexiones persistentes
//! ni chunked transfer encoding.

pub mod request;
pub mod response;
pub mod status;

pub use request::{Method, ParseError, Request};
pub use response::Response;
pub use status::StatusCode;
