//! Host loop: one OS thread per fake service, running its own tokio runtime.
//!
//! The listener is bound synchronously so the address is known before any
//! async code runs. The loop only holds the service id and resolves the
//! service through the directory for every request.

use crate::directory::ServiceDirectory;
use crate::error::{FakeServiceError, Result};
use crate::logging::{log_request, log_response};
use crate::request::FakeRequest;
use crate::response::FakeResponse;
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;
use tokio::net::TcpListener;
use tokio::runtime::Runtime;
use tokio::sync::broadcast;
use tracing::{debug, error, info};

/// Bind `host` on an ephemeral port.
pub(crate) fn bind(host: &str) -> Result<std::net::TcpListener> {
    let bind_error = |source| FakeServiceError::Bind {
        host: host.to_string(),
        source,
    };
    let listener = std::net::TcpListener::bind((host, 0)).map_err(bind_error)?;
    listener.set_nonblocking(true).map_err(bind_error)?;
    Ok(listener)
}

/// Running host loop. Dropping it without [`shutdown`](Self::shutdown) leaves the thread running.
#[derive(Debug)]
pub(crate) struct ServerHandle {
    local_addr: SocketAddr,
    shutdown_tx: broadcast::Sender<()>,
    thread: Option<JoinHandle<()>>,
}

impl ServerHandle {
    /// Stop accepting, drop every connection task, and wait for the port to close.
    pub(crate) fn shutdown(&mut self) {
        // The loop may already be gone; nothing to signal then
        let _ = self.shutdown_tx.send(());
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Host thread for {} panicked", self.local_addr);
            }
        }
    }
}

/// Start serving `listener` for `service_id` on a dedicated thread.
///
/// Returns once the listener is registered with the runtime.
pub(crate) fn spawn(
    listener: std::net::TcpListener,
    directory: &'static ServiceDirectory,
    service_id: &str,
    workers: usize,
) -> Result<ServerHandle> {
    let local_addr = listener
        .local_addr()
        .map_err(FakeServiceError::Runtime)?;
    let runtime = build_runtime(workers).map_err(FakeServiceError::Runtime)?;
    let (shutdown_tx, _) = broadcast::channel(1);
    let shutdown_rx = shutdown_tx.subscribe();
    let (ready_tx, ready_rx) = mpsc::channel();
    let id: Arc<str> = Arc::from(service_id);

    let thread = std::thread::Builder::new()
        .name(format!("fake-http-{}", local_addr.port()))
        .spawn(move || {
            runtime.block_on(async move {
                let listener = match TcpListener::from_std(listener) {
                    Ok(listener) => listener,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));
                accept_loop(listener, local_addr, directory, id, shutdown_rx).await;
            });
            // Dropping the runtime cancels in-flight connection tasks
            drop(runtime);
        })
        .map_err(FakeServiceError::Runtime)?;

    let mut handle = ServerHandle {
        local_addr,
        shutdown_tx,
        thread: Some(thread),
    };

    let ready = ready_rx.recv().unwrap_or_else(|_| {
        Err(std::io::Error::other("host thread exited before starting"))
    });
    if let Err(e) = ready {
        handle.shutdown();
        return Err(FakeServiceError::Runtime(e));
    }

    info!("Fake service {} listening on {}", service_id, local_addr);
    Ok(handle)
}

fn build_runtime(workers: usize) -> std::io::Result<Runtime> {
    if workers == 0 {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
    } else {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(workers)
            .thread_name("fake-http-worker")
            .enable_all()
            .build()
    }
}

async fn accept_loop(
    listener: TcpListener,
    local_addr: SocketAddr,
    directory: &'static ServiceDirectory,
    service_id: Arc<str>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let port = local_addr.port();
    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, _peer)) => {
                        let service_id = Arc::clone(&service_id);
                        tokio::spawn(async move {
                            let io = TokioIo::new(stream);
                            let service = service_fn(move |req| {
                                let service_id = Arc::clone(&service_id);
                                async move {
                                    handle_request(req, directory, &service_id, local_addr).await
                                }
                            });
                            if let Err(e) = http1::Builder::new()
                                .serve_connection(io, service)
                                .await
                            {
                                debug!("Connection error on port {}: {}", port, e);
                            }
                        });
                    }
                    Err(e) => {
                        error!("Accept error on port {}: {}", port, e);
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                info!("Fake service on port {} shutting down", port);
                break;
            }
        }
    }
}

async fn handle_request(
    req: Request<Incoming>,
    directory: &'static ServiceDirectory,
    service_id: &str,
    local_addr: SocketAddr,
) -> std::result::Result<Response<Full<Bytes>>, Infallible> {
    let Some(state) = directory.lookup(service_id) else {
        debug!("Service {} is no longer registered", service_id);
        return Ok(FakeResponse::with_status(StatusCode::SERVICE_UNAVAILABLE).into_hyper());
    };

    let request = FakeRequest::from_hyper(req, &local_addr.to_string()).await;
    log_request(&request);

    let response = state.dispatch(&request).await;
    log_response(&response);
    Ok(response.into_hyper())
}
