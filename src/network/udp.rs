//! UDP socket setup
//!
//! Sockets are bound without address reuse, so a second channel on a port
//! that is already taken fails to bind instead of silently sharing it.

use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::SocketAddr;
use tokio::net::UdpSocket;

use crate::error::ChannelError;

/// Create a non-blocking UDP socket bound to `addr`
pub fn create_socket(addr: SocketAddr, recv_buffer_bytes: usize) -> io::Result<Socket> {
    let socket = Socket::new(Domain::for_address(addr), Type::DGRAM, Some(Protocol::UDP))?;

    if recv_buffer_bytes > 0 {
        // The kernel may clamp this; a smaller buffer is not fatal
        if let Err(e) = socket.set_recv_buffer_size(recv_buffer_bytes) {
            tracing::warn!("Failed to set receive buffer to {} bytes: {}", recv_buffer_bytes, e);
        }
    }

    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    Ok(socket)
}

/// Resolve `bind_address` and bind a tokio UDP socket on `port`
pub async fn bind_udp(
    bind_address: &str,
    port: u16,
    recv_buffer_bytes: usize,
) -> Result<UdpSocket, ChannelError> {
    let bind_error = |reason: String| ChannelError::Bind {
        address: format!("{}:{}", bind_address, port),
        reason,
    };

    let addr = tokio::net::lookup_host((bind_address, port))
        .await
        .map_err(|e| bind_error(e.to_string()))?
        .next()
        .ok_or_else(|| bind_error("address did not resolve".to_string()))?;

    let socket = create_socket(addr, recv_buffer_bytes).map_err(|e| bind_error(e.to_string()))?;

    UdpSocket::from_std(socket.into()).map_err(|e| bind_error(e.to_string()))
}
