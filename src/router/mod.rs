//! # Sistema de Routing
//! src/router/mod.rs
//!
//! ```text
//! Request → Router → Handler(&Request, &BatchService) → Response
//! ```
//!
//! Coincidencia exacta de path. Si no hay handler, 404.

use crate::http::{Request, Response, StatusCode};
use crate::service::BatchService;

/// Un handler recibe el request y el servicio compartido
pub type Handler = fn(&Request, &BatchService) -> Response;

pub struct Router {
    routes: Vec<(String, Handler)>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    pub fn register(&mut self, path: &str, handler: Handler) {
        self.routes.push((path.to_string(), handler));
    }

    /// Paths registrados, en orden de registro
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.routes.iter().map(|(path, _)| path.as_str())
    }

    pub fn route(&self, request: &Request, service: &BatchService) -> Response {
        let path = request.path();

        let mut response = match self.routes.iter().find(|(route, _)| route == path) {
            Some((_, handler)) => handler(request, service),
            None => Response::error(StatusCode::NotFound, &format!("Route not found: {}", path)),
        };

        Self::add_common_headers(&mut response);
        response
    }

    fn add_common_headers(response: &mut Response) {
        response.add_header("Server", concat!("batch_server/", env!("CARGO_PKG_VERSION")));
        response.add_header("Connection", "close");
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}
