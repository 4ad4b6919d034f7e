//! # Parsing de Requests HTTP/1.0
//! src/http/request.rs
//!
//! Parser HTTP/1.0 mínimo: request line, query string y headers.
//!
//! ```text
//! GET /api/threads/completable-future?fail=3 HTTP/1.0\r\n
//! Host: localhost:8080\r\n
//! \r\n
//! ```
//!
//! Todos los endpoints del servidor son de lectura, así que solo se aceptan
//! `GET` y `HEAD` y el body se ignora.

use std::collections::HashMap;
use thiserror::Error;

/// Métodos HTTP soportados
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    GET,

    /// Como GET, pero la respuesta se envía sin body
    HEAD,
}

impl Method {
    fn parse(s: &str) -> Result<Self, ParseError> {
        match s {
            "GET" => Ok(Method::GET),
            "HEAD" => Ok(Method::HEAD),
            _ => Err(ParseError::UnsupportedMethod(s.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::HEAD => "HEAD",
        }
    }
}

/// Errores que pueden ocurrir durante el parsing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Empty request")]
    EmptyRequest,

    #[error("Invalid request line format")]
    InvalidRequestLine,

    #[error("Unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    #[error("Invalid HTTP version: {0}")]
    InvalidHttpVersion(String),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),
}

/// Request HTTP/1.0 parseado
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    path: String,
    query_params: HashMap<String, String>,

    /// Nombres en minúsculas
    headers: HashMap<String, String>,
    version: String,
}

impl Request {
    /// Parsea un request desde los bytes leídos del socket
    ///
    /// ```
    /// use batch_server::http::Request;
    ///
    /// let request = Request::parse(b"GET /api/threads/health?x=1 HTTP/1.0\r\n\r\n").unwrap();
    /// assert_eq!(request.path(), "/api/threads/health");
    /// assert_eq!(request.query_param("x"), Some("1"));
    /// ```
    pub fn parse(buffer: &[u8]) -> Result<Self, ParseError> {
        let text = std::str::from_utf8(buffer).map_err(|_| ParseError::InvalidRequestLine)?;

        if text.trim().is_empty() {
            return Err(ParseError::EmptyRequest);
        }

        let mut lines = text.split("\r\n");
        let request_line = lines.next().ok_or(ParseError::EmptyRequest)?;
        let (method, target, version) = Self::parse_request_line(request_line)?;
        let (path, query_params) = Self::parse_target(target);
        let headers = Self::parse_headers(lines)?;

        Ok(Request {
            method,
            path,
            query_params,
            headers,
            version,
        })
    }

    fn parse_request_line(line: &str) -> Result<(Method, &str, String), ParseError> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let [method, target, version] = parts[..] else {
            return Err(ParseError::InvalidRequestLine);
        };

        let method = Method::parse(method)?;

        if version != "HTTP/1.0" && version != "HTTP/1.1" {
            return Err(ParseError::InvalidHttpVersion(version.to_string()));
        }

        Ok((method, target, version.to_string()))
    }

    /// Separa path y query: `/demo?fail=2&x` → (`/demo`, {fail: 2, x: ""})
    fn parse_target(target: &str) -> (String, HashMap<String, String>) {
        let Some((path, query)) = target.split_once('?') else {
            return (target.to_string(), HashMap::new());
        };

        let params = query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| match pair.split_once('=') {
                Some((key, value)) => (key.to_string(), Self::url_decode(value)),
                None => (pair.to_string(), String::new()),
            })
            .collect();

        (path.to_string(), params)
    }

    /// Decodificación básica: `+` y `%20` como espacio
    fn url_decode(s: &str) -> String {
        s.replace("%20", " ").replace('+', " ")
    }

    fn parse_headers<'a>(
        lines: impl Iterator<Item = &'a str>,
    ) -> Result<HashMap<String, String>, ParseError> {
        let mut headers = HashMap::new();

        for line in lines {
            if line.trim().is_empty() {
                break;
            }

            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| ParseError::InvalidHeader(line.to_string()))?;
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }

        Ok(headers)
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_params(&self) -> &HashMap<String, String> {
        &self.query_params
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_params.get(name).map(|s| s.as_str())
    }

    /// Búsqueda sin distinguir mayúsculas
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(|s| s.as_str())
    }

    pub fn version(&self) -> &str {
        &self.version
    }
}
