//! Control-channel transport
//!
//! The client only needs two capabilities from its channel: push one frame
//! toward the kernel, pull one datagram back. Splitting them into separate
//! traits lets the dispatcher own the receive half outright while the
//! coordinator keeps sending, and lets tests swap the kernel out for an
//! in-process stand-in.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use netlink_sys::protocols::NETLINK_GENERIC;
use netlink_sys::{Socket, SocketAddr};

/// Sleep between receive attempts on an empty socket
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Sending half of a control channel
#[async_trait::async_trait]
pub trait LinkTx: Send {
    /// Send one complete frame.
    async fn send_frame(&mut self, frame: &[u8]) -> io::Result<()>;
}

/// Receiving half of a control channel
#[async_trait::async_trait]
pub trait LinkRx: Send {
    /// Receive one complete datagram, waiting for it to arrive.
    async fn recv_frame(&mut self) -> io::Result<Vec<u8>>;
}

/// Sending half of a generic netlink socket
pub struct GenlTx {
    socket: Arc<Socket>,
}

/// Receiving half of a generic netlink socket
pub struct GenlRx {
    socket: Arc<Socket>,
}

/// Open a generic netlink socket and split it into halves.
///
/// Binds with port 0 so the kernel assigns one, connects to the kernel
/// endpoint, and switches to non-blocking mode so the receive half can
/// poll without pinning a runtime thread.
pub fn connect() -> io::Result<(GenlTx, GenlRx)> {
    let mut socket = Socket::new(NETLINK_GENERIC)?;
    socket.bind(&SocketAddr::new(0, 0))?;
    socket.connect(&SocketAddr::new(0, 0))?;
    socket.set_non_blocking(true)?;
    let socket = Arc::new(socket);
    Ok((
        GenlTx {
            socket: Arc::clone(&socket),
        },
        GenlRx { socket },
    ))
}

#[async_trait::async_trait]
impl LinkTx for GenlTx {
    async fn send_frame(&mut self, frame: &[u8]) -> io::Result<()> {
        self.socket.send(frame, 0)?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl LinkRx for GenlRx {
    async fn recv_frame(&mut self) -> io::Result<Vec<u8>> {
        loop {
            match self.socket.recv_from_full() {
                Ok((datagram, _addr)) => return Ok(datagram),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    tokio::time::sleep(POLL_INTERVAL).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
