//! Logger module
//!
//! Provides logging utilities for the mock REST server including:
//! - Server lifecycle logging
//! - Access logging with multiple formats
//! - API request, warning and error logging
//! - File-based logging support

mod format;
pub mod writer;

pub use format::AccessLogEntry;

use crate::config::{AppState, Config};
use std::net::SocketAddr;

/// Initialize the logger with configuration
///
/// Should be called once at application startup.
pub fn init(config: &Config) -> std::io::Result<()> {
    writer::init(
        config.logging.access_log_file.as_deref(),
        config.logging.error_log_file.as_deref(),
    )
}

/// Info lines share the access sink; stdout until `init()` runs
fn write_info(message: &str) {
    match writer::get() {
        Some(w) => w.write_info(message),
        None => println!("{message}"),
    }
}

/// Error sink; stderr until `init()` runs
fn write_error(message: &str) {
    match writer::get() {
        Some(w) => w.write_error(message),
        None => eprintln!("{message}"),
    }
}

fn write_access(message: &str) {
    match writer::get() {
        Some(w) => w.write_access(message),
        None => println!("{message}"),
    }
}

pub fn log_server_start(addr: &SocketAddr, state: &AppState) {
    let config = &state.config;
    write_info(&format!(
        "Starting a server on port {}. Use CNTRL+C to stop the server.",
        addr.port()
    ));
    write_info(&format!("Listening on: http://{addr}"));
    write_info(&format!("API prefix: {}", config.api.prefix));
    write_info(&format!("Data directory: {}", state.store.root().display()));
    write_info(&format!("Static root: {}", config.static_files.root));
    write_info(&format!("Log level: {}", config.logging.level));
    if let Some(workers) = config.server.workers {
        write_info(&format!("Worker threads: {workers}"));
    }
    if let Some(ref path) = config.logging.access_log_file {
        write_info(&format!("Access log: {path}"));
    }
    if let Some(ref path) = config.logging.error_log_file {
        write_info(&format!("Error log: {path}"));
    }
}

pub fn log_server_stop() {
    write_info("Server stopped. Bye bye!");
}

pub fn log_connection_accepted(peer_addr: &SocketAddr) {
    write_info(&format!("[Connection] Accepted from: {peer_addr}"));
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    write_error(&format!("[ERROR] Failed to serve connection: {err:?}"));
}

pub fn log_error(message: &str) {
    write_error(&format!("[ERROR] {message}"));
}

pub fn log_warning(message: &str) {
    write_error(&format!("[WARN] {message}"));
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    write_access(&entry.format(format));
}

pub fn log_api_request(method: &str, path: &str, status: u16) {
    write_info(&format!("[API] {method} {path} - {status}"));
}

pub fn log_bind_failed(addr: &SocketAddr, err: &std::io::Error) {
    if err.kind() == std::io::ErrorKind::AddrInUse {
        write_error(&format!(
            "ERROR: The port {} is already used by another process.",
            addr.port()
        ));
    } else {
        log_error(&format!("Failed to bind {addr}: {err}"));
    }
}
