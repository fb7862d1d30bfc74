//! In-memory control channel
//!
//! A connected pair of datagram channels standing in for the netlink
//! socket. Frames the client sends surface on the kernel side and vice
//! versa, preserving datagram boundaries the way the socket does.

use std::io;

use tokio::sync::mpsc;

use hwsim_ctrl::{LinkRx, LinkTx};

/// Buffered datagrams per direction
const CHANNEL_DEPTH: usize = 32;

/// Client-side sending half
pub struct ChanTx {
    to_kernel: mpsc::Sender<Vec<u8>>,
}

/// Client-side receiving half
pub struct ChanRx {
    from_kernel: mpsc::Receiver<Vec<u8>>,
}

/// Kernel-side endpoints of the channel
pub struct Peer {
    /// Datagrams the client sent
    pub from_client: mpsc::Receiver<Vec<u8>>,
    /// Delivers datagrams to the client
    pub to_client: mpsc::Sender<Vec<u8>>,
}

/// Create a connected channel pair.
///
/// The client halves plug into the control client through
/// [`LinkTx`]/[`LinkRx`]; the [`Peer`] end goes to whatever plays the
/// kernel.
pub fn pair() -> (ChanTx, ChanRx, Peer) {
    let (to_kernel, from_client) = mpsc::channel(CHANNEL_DEPTH);
    let (to_client, from_kernel) = mpsc::channel(CHANNEL_DEPTH);
    (
        ChanTx { to_kernel },
        ChanRx { from_kernel },
        Peer {
            from_client,
            to_client,
        },
    )
}

#[async_trait::async_trait]
impl LinkTx for ChanTx {
    async fn send_frame(&mut self, frame: &[u8]) -> io::Result<()> {
        self.to_kernel
            .send(frame.to_vec())
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "kernel side closed"))
    }
}

#[async_trait::async_trait]
impl LinkRx for ChanRx {
    async fn recv_frame(&mut self) -> io::Result<Vec<u8>> {
        self.from_kernel
            .recv()
            .await
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "kernel side closed"))
    }
}
