//! HTTP/JSON adapter over the progression service
//!
//! A fixed pool of worker threads pulls requests from one `tiny_http`
//! listener. Each request is handled start to finish on one worker; workers
//! share only the service (and through it the ledger database handle).

mod auth;
mod routes;

pub use auth::{TOKEN_HEADER, USER_ID_HEADER, USER_NAME_HEADER, USER_ROLE_HEADER, caller_identity};
pub use routes::{ROUTES, Reply, Router};

use std::io::Read;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result, anyhow};
use tiny_http::{Header, Request, Response, Server};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::ServerSettings;

/// Running server; dropping it without [`HttpServer::shutdown`] leaves the workers running
pub struct HttpServer {
    server: Arc<Server>,
    addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    workers: Vec<JoinHandle<()>>,
}

impl HttpServer {
    /// Bind and start `settings.workers` worker threads
    pub fn start(settings: &ServerSettings, router: Router) -> Result<Self> {
        let bind_addr = settings.listen_addr();
        let server = Server::http(&bind_addr)
            .map_err(|e| anyhow!("Failed to start server on {bind_addr}: {e}"))?;
        let addr = server
            .server_addr()
            .to_ip()
            .context("Server is not bound to an IP address")?;
        let server = Arc::new(server);
        let shutdown = Arc::new(AtomicBool::new(false));

        info!(
            "[points:http] Server listening on http://{} (auth: {}, workers: {})",
            addr,
            if router.auth_enabled() { "enabled" } else { "disabled" },
            settings.workers.max(1)
        );
        for (method, path, operation) in ROUTES {
            info!("[points:http]   {:<6} {:<22} {}", method, path, operation);
        }

        let workers = (0..settings.workers.max(1))
            .map(|n| {
                let server = Arc::clone(&server);
                let shutdown = Arc::clone(&shutdown);
                let router = router.clone();
                let max_body_bytes = settings.max_body_bytes;
                thread::Builder::new()
                    .name(format!("points-http-{n}"))
                    .spawn(move || worker_loop(&server, &shutdown, &router, max_body_bytes))
                    .context("Failed to spawn HTTP worker")
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            server,
            addr,
            shutdown,
            workers,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting requests and wait for in-flight ones to finish
    pub fn shutdown(self) {
        self.shutdown.store(true, Ordering::SeqCst);
        // Each unblock wakes one worker waiting in recv()
        for _ in &self.workers {
            self.server.unblock();
        }
        for worker in self.workers {
            if worker.join().is_err() {
                error!("[points:http] Worker panicked");
            }
        }
        info!("[points:http] Server stopped");
    }
}

fn worker_loop(server: &Server, shutdown: &AtomicBool, router: &Router, max_body_bytes: usize) {
    loop {
        match server.recv() {
            Ok(request) => serve_request(router, max_body_bytes, request),
            Err(_) if shutdown.load(Ordering::SeqCst) => break,
            Err(e) => warn!("[points:http] Failed to receive request: {}", e),
        }
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
    }
}

fn serve_request(router: &Router, max_body_bytes: usize, mut request: Request) {
    let request_id = Uuid::new_v4();
    let method = request.method().to_string();
    let url = request.url().to_string();
    let path = url.split('?').next().unwrap_or(url.as_str());

    let reply = match read_request_body(&mut request, max_body_bytes) {
        Ok(body) => router.handle(&method, path, request.headers(), &body, request_id),
        Err(reply) => reply,
    };

    debug!(%request_id, method = %method, path, status = reply.status, "[points:http] Handled request");
    respond_json(request, reply, request_id);
}

fn read_request_body(request: &mut Request, max_body_bytes: usize) -> Result<String, Reply> {
    let mut body = String::new();
    let mut reader = request.as_reader().take(max_body_bytes as u64 + 1);
    if let Err(e) = reader.read_to_string(&mut body) {
        error!("[points:http] Failed to read body: {}", e);
        return Err(Reply::error(400, "bad_request", "unreadable request body"));
    }

    if body.len() > max_body_bytes {
        return Err(Reply::error(
            413,
            "payload_too_large",
            format!("body exceeds {max_body_bytes} bytes"),
        ));
    }

    Ok(body)
}

fn respond_json(request: Request, reply: Reply, request_id: Uuid) {
    let body = serde_json::to_string(&reply.body)
        .unwrap_or_else(|_| "{\"error\":\"serialize\"}".to_string());
    let mut response = Response::from_string(body).with_status_code(reply.status);
    for (field, value) in [
        ("Content-Type", "application/json".to_string()),
        ("X-Request-Id", request_id.to_string()),
    ] {
        if let Ok(header) = Header::from_bytes(field.as_bytes(), value.as_bytes()) {
            response = response.with_header(header);
        }
    }
    if let Err(e) = request.respond(response) {
        debug!(%request_id, "[points:http] Client went away: {}", e);
    }
}
