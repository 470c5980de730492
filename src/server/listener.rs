//! TCP accept loop (spec.md §6): one listener, one reader thread per
//! accepted connection, read timeout and `TCP_NODELAY` set on every
//! socket.

use super::connection::{self, Collaborators};
use std::net::TcpListener;
use std::sync::Arc;

pub fn serve(listener: TcpListener, collaborators: Arc<Collaborators>) -> std::io::Result<()> {
    log::info!("listening on {}", listener.local_addr()?);
    for incoming in listener.incoming() {
        match incoming {
            Ok(stream) => {
                let collaborators = collaborators.clone();
                std::thread::spawn(move || connection::run(stream, collaborators));
            }
            Err(e) => log::warn!("failed to accept connection: {e}"),
        }
    }
    Ok(())
}
