//! # Servidor TCP Concurrente
//! src/server/tcp.rs
//!
//! Un thread por conexión. El loop de accept es no bloqueante y revisa un
//! flag de parada, así `Ctrl-C` puede terminarlo sin matar el proceso. Al
//! salir espera a las conexiones en curso; el apagado del pool lo hace el
//! llamador con `Server::shutdown`, una sola vez.

use crate::config::Config;
use crate::handlers;
use crate::http::{Method, Request, Response, StatusCode};
use crate::pool::ShutdownReport;
use crate::router::Router;
use crate::service::BatchService;
use std::io::{self, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Cada cuánto se revisa el flag de parada cuando no hay conexiones
const ACCEPT_POLL: Duration = Duration::from_millis(50);

/// Tiempo máximo para recibir el request completo
const READ_TIMEOUT: Duration = Duration::from_secs(5);

const MAX_REQUEST_BYTES: usize = 8192;

static NEXT_CONNECTION: AtomicU64 = AtomicU64::new(1);

/// Permite detener el loop de accept desde otro thread (p. ej. el handler de Ctrl-C)
#[derive(Debug, Clone)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Servidor HTTP/1.0 sobre el servicio de lotes
pub struct Server {
    config: Config,
    router: Arc<Router>,
    service: Arc<BatchService>,
    stop: StopHandle,
}

impl Server {
    pub fn new(config: Config) -> Self {
        let service = Arc::new(BatchService::from_config(&config));
        Self::with_service(config, service)
    }

    pub fn with_service(config: Config, service: Arc<BatchService>) -> Self {
        Self {
            config,
            router: Arc::new(handlers::router()),
            service,
            stop: StopHandle {
                flag: Arc::new(AtomicBool::new(false)),
            },
        }
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Hace bind en la dirección configurada y atiende hasta que se pida parar
    pub fn run(&self) -> io::Result<()> {
        let address = self.config.address();
        let listener = TcpListener::bind(&address)?;
        self.serve(listener)
    }

    /// Atiende conexiones sobre un listener ya abierto
    pub fn serve(&self, listener: TcpListener) -> io::Result<()> {
        listener.set_nonblocking(true)?;
        let local = listener.local_addr()?;

        info!(address = %local, "server listening, one thread per connection");
        for path in self.router.paths() {
            info!("  GET http://{}{}", local, path);
        }

        let mut connections: Vec<JoinHandle<()>> = Vec::new();

        while !self.stop.is_stopped() {
            match listener.accept() {
                Ok((stream, peer)) => {
                    let id = NEXT_CONNECTION.fetch_add(1, Ordering::Relaxed);
                    debug!(peer = %peer, connection = id, "new connection");

                    let router = Arc::clone(&self.router);
                    let service = Arc::clone(&self.service);

                    let spawned = thread::Builder::new()
                        .name(format!("conn-{}", id))
                        .spawn(move || {
                            if let Err(e) = Self::handle_connection(stream, id, &router, &service) {
                                warn!(connection = id, error = %e, "connection error");
                            }
                        });

                    match spawned {
                        Ok(handle) => connections.push(handle),
                        Err(e) => error!(error = %e, "failed to spawn connection thread"),
                    }
                    connections.retain(|c| !c.is_finished());
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => thread::sleep(ACCEPT_POLL),
                Err(e) => warn!(error = %e, "failed to accept connection"),
            }
        }

        info!(in_flight = connections.len(), "stop requested, waiting for open connections");
        for connection in connections {
            let _ = connection.join();
        }
        info!("server stopped accepting connections");

        Ok(())
    }

    /// Apaga el pool del servicio; solo la primera llamada tiene efecto
    pub fn shutdown(&self) -> ShutdownReport {
        self.stop.stop();
        let report = self.service.shutdown();
        info!(?report, "batch service shut down");
        report
    }

    fn handle_connection(
        mut stream: TcpStream,
        connection: u64,
        router: &Router,
        service: &BatchService,
    ) -> io::Result<()> {
        let start = Instant::now();
        stream.set_nonblocking(false)?;
        stream.set_read_timeout(Some(READ_TIMEOUT))?;

        let Some(buffer) = Self::read_request(&mut stream)? else {
            debug!(connection, "connection closed before sending a request");
            return Ok(());
        };

        let request_id = format!("{:x}-{:04x}", chrono::Utc::now().timestamp_millis(), connection);
        let worker = thread::current().name().unwrap_or("unnamed").to_string();

        let (mut response, method) = match Request::parse(&buffer) {
            Ok(request) => {
                info!(
                    request_id = %request_id,
                    method = request.method().as_str(),
                    path = request.path(),
                    "request"
                );
                (router.route(&request, service), request.method())
            }
            Err(e) => {
                warn!(request_id = %request_id, error = %e, "malformed request");
                (
                    Response::error(StatusCode::BadRequest, &format!("Invalid request: {}", e)),
                    Method::GET,
                )
            }
        };

        response.add_header("X-Request-Id", &request_id);
        response.add_header("X-Worker-Thread", &worker);

        let bytes = match method {
            Method::HEAD => response.head_bytes(),
            Method::GET => response.to_bytes(),
        };
        stream.write_all(&bytes)?;
        stream.flush()?;

        info!(
            request_id = %request_id,
            status = response.status().as_u16(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "response sent"
        );

        Ok(())
    }

    /// Lee hasta el fin de los headers; `None` si el peer cerró sin enviar nada
    fn read_request(stream: &mut TcpStream) -> io::Result<Option<Vec<u8>>> {
        let mut buffer = Vec::with_capacity(1024);
        let mut chunk = [0u8; 1024];

        loop {
            let read = stream.read(&mut chunk)?;
            if read == 0 {
                break;
            }

            buffer.extend_from_slice(&chunk[..read]);
            if buffer.windows(4).any(|w| w == b"\r\n\r\n") || buffer.len() >= MAX_REQUEST_BYTES {
                break;
            }
        }

        Ok(if buffer.is_empty() { None } else { Some(buffer) })
    }
}
