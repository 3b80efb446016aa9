// Server loop module
// Accepts connections until Ctrl-C

use std::sync::Arc;
use tokio::net::TcpListener;

use super::connection::accept_connection;
use crate::config;
use crate::logger;

/// Run the accept loop until the process receives Ctrl-C.
///
/// Must be polled inside a `LocalSet`, connections are spawned with `spawn_local`.
pub async fn start_server_loop(listener: TcpListener, state: Arc<config::AppState>) {
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => accept_connection(stream, peer_addr, &state),
                    Err(e) => logger::log_error(&format!("Failed to accept connection: {e}")),
                }
            }

            signal = &mut shutdown => {
                if let Err(e) = signal {
                    logger::log_error(&format!("Failed to listen for Ctrl-C: {e}"));
                }
                logger::log_server_stop();
                return;
            }
        }
    }
}
