//! # Handlers de la API
//! src/handlers.rs
//!
//! Endpoints bajo `/api/threads`:
//!
//! | Path | Descripción |
//! |---|---|
//! | `/create-files-with-service-and-download` | 5 archivos en paralelo → ZIP |
//! | `/create-files-with-failure-and-download` | igual, con la tarea 2 fallando |
//! | `/completable-future` | demo de composición de futures (`?fail=ID`) |
//! | `/countdown-latch` | demo de countdown latch (`?fail=ID`) |
//! | `/system-info` | host y pool |
//! | `/health` | liveness |

use crate::batch::{BatchError, SyncStrategy, TaskId};
use crate::error::ServiceError;
use crate::http::{Request, Response, StatusCode};
use crate::router::Router;
use crate::service::BatchService;
use chrono::{Local, Utc};
use serde_json::json;
use std::time::Instant;
use tracing::{error, info};

pub const API_PREFIX: &str = "/api/threads";

pub const ARCHIVE_PATH: &str = "/api/threads/create-files-with-service-and-download";
pub const FAILURE_ARCHIVE_PATH: &str = "/api/threads/create-files-with-failure-and-download";
pub const FUTURE_DEMO_PATH: &str = "/api/threads/completable-future";
pub const LATCH_DEMO_PATH: &str = "/api/threads/countdown-latch";
pub const SYSTEM_INFO_PATH: &str = "/api/threads/system-info";
pub const HEALTH_PATH: &str = "/api/threads/health";

/// Router con todos los endpoints registrados
pub fn router() -> Router {
    let mut router = Router::new();
    router.register(ARCHIVE_PATH, create_files_handler);
    router.register(FAILURE_ARCHIVE_PATH, create_files_with_failure_handler);
    router.register(FUTURE_DEMO_PATH, completable_future_handler);
    router.register(LATCH_DEMO_PATH, countdown_latch_handler);
    router.register(SYSTEM_INFO_PATH, system_info_handler);
    router.register(HEALTH_PATH, health_handler);
    router
}

/// `{prefix}_{YYYYmmdd_HHMMSS}.zip`
pub fn download_filename(prefix: &str) -> String {
    format!("{}_{}.zip", prefix, Local::now().format("%Y%m%d_%H%M%S"))
}

fn status_for(error: &ServiceError) -> StatusCode {
    match error {
        ServiceError::Batch(BatchError::Pool(_)) => StatusCode::ServiceUnavailable,
        _ => StatusCode::InternalServerError,
    }
}

fn archive_response(
    result: Result<Vec<u8>, ServiceError>,
    prefix: &str,
    context: &str,
    start: Instant,
) -> Response {
    match result {
        Ok(bytes) => {
            let filename = download_filename(prefix);
            info!(
                filename = %filename,
                bytes = bytes.len(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "archive ready for download"
            );
            Response::attachment(&filename, bytes)
        }
        Err(e) => {
            error!(error = %e, "{}", context);
            Response::error(status_for(&e), &format!("{}: {}", context, e))
        }
    }
}

pub fn create_files_handler(_req: &Request, service: &BatchService) -> Response {
    let start = Instant::now();
    archive_response(
        service.create_files_and_archive(),
        "service_generated_files",
        "error while creating and archiving files",
        start,
    )
}

pub fn create_files_with_failure_handler(_req: &Request, service: &BatchService) -> Response {
    let start = Instant::now();
    archive_response(
        service.create_files_with_failure_and_archive(),
        "failure_test_files",
        "error during the failure scenario",
        start,
    )
}

/// `?fail=ID` opcional; un valor no numérico es 400
fn parse_fail(req: &Request) -> Result<Option<TaskId>, Response> {
    match req.query_param("fail") {
        None => Ok(None),
        Some(raw) => raw.parse::<TaskId>().map(Some).map_err(|_| {
            Response::error(
                StatusCode::BadRequest,
                &format!("Invalid parameter: fail must be a task id, got '{}'", raw),
            )
        }),
    }
}

fn demo(req: &Request, service: &BatchService, strategy: SyncStrategy) -> Response {
    let fail = match parse_fail(req) {
        Ok(fail) => fail,
        Err(response) => return response,
    };

    match service.run_demo(strategy, fail) {
        Ok(report) => Response::json(&report),
        Err(e) => {
            error!(strategy = %strategy, error = %e, "demo batch failed");
            Response::error(status_for(&e), &e.to_string())
        }
    }
}

pub fn completable_future_handler(req: &Request, service: &BatchService) -> Response {
    demo(req, service, SyncStrategy::FutureComposition)
}

pub fn countdown_latch_handler(req: &Request, service: &BatchService) -> Response {
    demo(req, service, SyncStrategy::CountdownLatch)
}

pub fn system_info_handler(_req: &Request, service: &BatchService) -> Response {
    Response::json(&service.system_info())
}

pub fn health_handler(_req: &Request, _service: &BatchService) -> Response {
    Response::json(&json!({
        "status": "UP",
        "timestamp": Utc::now().timestamp_millis(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::ServiceConfig;
    use serde_json::Value;
    use std::time::Duration;

    fn service() -> BatchService {
        BatchService::new(ServiceConfig {
            pool_size: 2,
            demo_step: Duration::from_millis(5),
            ..ServiceConfig::default()
        })
    }

    fn get(path: &str) -> Request {
        Request::parse(format!("GET {} HTTP/1.0\r\n\r\n", path).as_bytes()).unwrap()
    }

    fn body(response: &Response) -> Value {
        serde_json::from_slice(response.body()).unwrap()
    }

    #[test]
    fn test_router_has_every_endpoint() {
        let router = router();
        let paths: Vec<_> = router.paths().collect();

        assert_eq!(paths.len(), 6);
        assert!(paths.iter().all(|p| p.starts_with(API_PREFIX)));
    }

    #[test]
    fn test_download_filename_format() {
        let name = download_filename("service_generated_files");
        let stamp = name
            .strip_prefix("service_generated_files_")
            .and_then(|rest| rest.strip_suffix(".zip"))
            .unwrap();

        assert_eq!(stamp.len(), "20240101_120000".len());
        assert_eq!(stamp.as_bytes()[8], b'_');
        assert!(stamp.replace('_', "").chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_health() {
        let response = health_handler(&get(HEALTH_PATH), &service());
        let json = body(&response);

        assert_eq!(response.status(), StatusCode::Ok);
        assert_eq!(json["status"], "UP");
        assert!(json["timestamp"].is_i64());
    }

    #[test]
    fn test_system_info() {
        let response = system_info_handler(&get(SYSTEM_INFO_PATH), &service());
        let json = body(&response);

        assert_eq!(json["pool"]["size"], 2);
        assert!(json["available_parallelism"].as_u64().unwrap() >= 1);
    }

    #[test]
    fn test_failure_archive_is_json_error() {
        let response =
            create_files_with_failure_handler(&get(FAILURE_ARCHIVE_PATH), &service());
        let json = body(&response);

        assert_eq!(response.status(), StatusCode::InternalServerError);
        assert_eq!(json["status"], "error");
        assert!(json["message"].as_str().unwrap().contains("task 2:"));
    }

    #[test]
    fn test_demo_with_invalid_fail_param() {
        let response = completable_future_handler(
            &get("/api/threads/completable-future?fail=abc"),
            &service(),
        );
        assert_eq!(response.status(), StatusCode::BadRequest);
    }

    #[test]
    fn test_latch_demo_succeeds() {
        let response = countdown_latch_handler(&get(LATCH_DEMO_PATH), &service());
        let json = body(&response);

        assert_eq!(response.status(), StatusCode::Ok);
        assert_eq!(json["strategy"], "countdown-latch");
        assert_eq!(json["succeeded"], 5);
        assert_eq!(json["results"].as_array().unwrap().len(), 5);
    }

    #[test]
    fn test_future_demo_failure_is_500() {
        let response = completable_future_handler(
            &get("/api/threads/completable-future?fail=3"),
            &service(),
        );
        let json = body(&response);

        assert_eq!(response.status(), StatusCode::InternalServerError);
        assert!(json["message"].as_str().unwrap().contains("task 3:"));
    }

    #[test]
    fn test_shut_down_service_is_503() {
        let service = service();
        service.shutdown();

        let response = create_files_handler(&get(ARCHIVE_PATH), &service);
        assert_eq!(response.status(), StatusCode::ServiceUnavailable);
    }
}
