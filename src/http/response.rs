//! # Construcción de Respuestas HTTP
//! src/http/response.rs
//!
//! ```text
//! HTTP/1.0 200 OK\r\n
//! Content-Type: application/octet-stream\r\n
//! Content-Disposition: attachment; filename="service_generated_files_20240101_120000.zip"\r\n
//! Content-Length: 1234\r\n
//! \r\n
//! <bytes del ZIP>
//! ```

use super::StatusCode;
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;

/// Respuesta HTTP/1.0
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,

    /// Ordenados para que la salida sea estable
    headers: BTreeMap<String, String>,
    body: Vec<u8>,
}

impl Response {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: Vec::new(),
        }
    }

    /// Agrega o reemplaza un header
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.add_header(name, value);
        self
    }

    pub fn add_header(&mut self, name: &str, value: &str) {
        self.headers.insert(name.to_string(), value.to_string());
    }

    /// Establece el body y su `Content-Length`
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self.headers
            .insert("Content-Length".to_string(), self.body.len().to_string());
        self
    }

    /// 200 con el valor serializado como JSON
    pub fn json<T: Serialize>(value: &T) -> Self {
        Self::json_with_status(StatusCode::Ok, value)
    }

    pub fn json_with_status<T: Serialize>(status: StatusCode, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => Self::new(status)
                .with_header("Content-Type", "application/json")
                .with_body(body),
            Err(e) => Self::error(
                StatusCode::InternalServerError,
                &format!("failed to serialize response: {}", e),
            ),
        }
    }

    /// Error JSON: `{"status":"error","message":...,"timestamp":ms}`
    pub fn error(status: StatusCode, message: &str) -> Self {
        let body = json!({
            "status": "error",
            "message": message,
            "timestamp": Utc::now().timestamp_millis(),
        });

        Self::new(status)
            .with_header("Content-Type", "application/json")
            .with_body(body.to_string())
    }

    /// 200 con un archivo para descargar
    pub fn attachment(filename: &str, bytes: Vec<u8>) -> Self {
        Self::new(StatusCode::Ok)
            .with_header("Content-Type", "application/octet-stream")
            .with_header(
                "Content-Disposition",
                &format!("attachment; filename=\"{}\"", filename),
            )
            .with_body(bytes)
    }

    /// Status line, headers, línea vacía y body
    pub fn to_bytes(&self) -> Vec<u8> {
        self.serialize(true)
    }

    /// Igual que `to_bytes` pero sin body, para `HEAD`
    pub fn head_bytes(&self) -> Vec<u8> {
        self.serialize(false)
    }

    fn serialize(&self, with_body: bool) -> Vec<u8> {
        let mut result = format!("HTTP/1.0 {}\r\n", self.status).into_bytes();

        for (name, value) in &self.headers {
            result.extend_from_slice(format!("{}: {}\r\n", name, value).as_bytes());
        }
        result.extend_from_slice(b"\r\n");

        if with_body {
            result.extend_from_slice(&self.body);
        }

        result
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(|s| s.as_str())
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_with_body_sets_length() {
        let response = Response::new(StatusCode::Ok).with_body("Hello World");

        assert_eq!(response.body(), b"Hello World");
        assert_eq!(response.header("Content-Length"), Some("11"));
    }

    #[test]
    fn test_json_response() {
        let response = Response::json(&json!({"status": "UP"}));

        assert_eq!(response.status(), StatusCode::Ok);
        assert_eq!(response.header("Content-Type"), Some("application/json"));
        assert_eq!(response.body(), br#"{"status":"UP"}"#);
    }

    #[test]
    fn test_error_payload_is_escaped_json() {
        let response = Response::error(
            StatusCode::InternalServerError,
            "task 2: could not write \"data.csv\"",
        );
        let body: Value = serde_json::from_slice(response.body()).unwrap();

        assert_eq!(response.status(), StatusCode::InternalServerError);
        assert_eq!(body["status"], "error");
        assert_eq!(body["message"], "task 2: could not write \"data.csv\"");
        assert!(body["timestamp"].as_i64().unwrap() > 0);
    }

    #[test]
    fn test_attachment_headers() {
        let response = Response::attachment("bundle.zip", vec![0x50, 0x4B, 0x05, 0x06]);

        assert_eq!(response.header("Content-Type"), Some("application/octet-stream"));
        assert_eq!(
            response.header("Content-Disposition"),
            Some("attachment; filename=\"bundle.zip\"")
        );
        assert_eq!(response.header("Content-Length"), Some("4"));
    }

    #[test]
    fn test_to_bytes() {
        let response = Response::new(StatusCode::Ok)
            .with_header("Content-Type", "text/plain")
            .with_body("Test");
        let text = String::from_utf8(response.to_bytes()).unwrap();

        assert!(text.starts_with("HTTP/1.0 200 OK\r\n"));
        assert!(text.contains("Content-Type: text/plain\r\n"));
        assert!(text.contains("Content-Length: 4\r\n"));
        assert!(text.ends_with("\r\n\r\nTest"));
    }

    #[test]
    fn test_head_bytes_omit_body() {
        let response = Response::new(StatusCode::Ok).with_body("Test");
        let text = String::from_utf8(response.head_bytes()).unwrap();

        assert!(text.contains("Content-Length: 4\r\n"));
        assert!(text.ends_with("\r\n\r\n"));
    }
}
