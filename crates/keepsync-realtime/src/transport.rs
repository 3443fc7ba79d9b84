//! Connection abstraction for the realtime hub.
//!
//! The hub only needs to push frames, pull frames, and notice when the
//! connection is gone. Implementations may sit on WebSockets, SSE, or any
//! other persistent transport.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// One live, already-authenticated client connection.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait Connection: Send + Sync {
    /// Push one frame to the client.
    async fn send(&self, frame: Bytes) -> Result<()>;

    /// Wait for the next frame from the client.
    ///
    /// Returns `Ok(None)` once the connection is closed.
    async fn recv(&self) -> Result<Option<Bytes>>;
}

/// A simple in-memory transport for testing.
///
/// Uses channels to stand in for a socket. The hub side is a
/// [`MemoryConnection`], the client side a [`MemoryPeer`].
pub mod memory {
    use super::*;
    use crate::error::RealtimeError;
    use tokio::sync::{mpsc, Mutex};

    /// Default buffered frames per direction.
    pub const DEFAULT_CAPACITY: usize = 64;

    /// Create a connected pair with the default buffer size.
    pub fn pair() -> (MemoryConnection, MemoryPeer) {
        pair_with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a connected pair buffering up to `capacity` frames each way.
    pub fn pair_with_capacity(capacity: usize) -> (MemoryConnection, MemoryPeer) {
        let (to_peer, from_hub) = mpsc::channel(capacity);
        let (to_hub, from_peer) = mpsc::channel(capacity);

        (
            MemoryConnection {
                outbound: to_peer,
                inbound: Mutex::new(from_peer),
            },
            MemoryPeer {
                outbound: Mutex::new(Some(to_hub)),
                inbound: Mutex::new(from_hub),
            },
        )
    }

    /// Hub side of an in-memory connection.
    pub struct MemoryConnection {
        outbound: mpsc::Sender<Bytes>,
        inbound: Mutex<mpsc::Receiver<Bytes>>,
    }

    #[async_trait]
    impl Connection for MemoryConnection {
        async fn send(&self, frame: Bytes) -> Result<()> {
            // Never wait on a slow reader.
            self.outbound.try_send(frame).map_err(|e| match e {
                mpsc::error::TrySendError::Closed(_) => RealtimeError::Closed,
                mpsc::error::TrySendError::Full(_) => {
                    RealtimeError::Transport("peer buffer full".into())
                }
            })
        }

        async fn recv(&self) -> Result<Option<Bytes>> {
            let mut rx = self.inbound.lock().await;
            Ok(rx.recv().await)
        }
    }

    /// Client side of an in-memory connection.
    pub struct MemoryPeer {
        outbound: Mutex<Option<mpsc::Sender<Bytes>>>,
        inbound: Mutex<mpsc::Receiver<Bytes>>,
    }

    impl MemoryPeer {
        /// Send a frame to the hub.
        pub async fn send(&self, frame: impl Into<Bytes>) -> Result<()> {
            let guard = self.outbound.lock().await;
            let tx = guard.as_ref().ok_or(RealtimeError::Closed)?;
            tx.send(frame.into())
                .await
                .map_err(|_| RealtimeError::Closed)
        }

        /// Wait for the next frame from the hub. `None` once the hub side
        /// is dropped.
        pub async fn recv(&self) -> Option<Bytes> {
            self.inbound.lock().await.recv().await
        }

        /// Take a frame if one is already queued.
        pub async fn try_recv(&self) -> Option<Bytes> {
            self.inbound.lock().await.try_recv().ok()
        }

        /// Close the client-to-hub direction; the hub sees end of stream.
        pub async fn close(&self) {
            self.outbound.lock().await.take();
        }
    }
}
