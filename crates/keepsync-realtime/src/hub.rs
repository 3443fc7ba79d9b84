//! Connection registry and per-account fan-out.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use bytes::Bytes;
use futures::future::join_all;

use keepsync_core::{AccountId, Caller, SessionId};

use crate::error::Result;
use crate::event::SecretEvent;
use crate::transport::Connection;

/// Lifecycle of a connection as seen by the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Transport is up, not yet in the index.
    Connecting,
    /// Indexed under (account, session); receives broadcasts.
    Registered,
    /// Removed from the index. Terminal.
    Closed,
}

/// Outcome of one broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub failed: usize,
    pub excluded: usize,
}

struct Entry {
    connection_id: u64,
    session_id: SessionId,
    connection: Arc<dyn Connection>,
}

#[derive(Default)]
struct HubInner {
    index: RwLock<HashMap<AccountId, Vec<Entry>>>,
    next_id: AtomicU64,
}

/// Live connection registry.
///
/// Cheap to clone; all clones share one index. The index lock is never held
/// while writing to a connection.
#[derive(Clone, Default)]
pub struct Hub {
    inner: Arc<HubInner>,
}

impl fmt::Debug for Hub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hub")
            .field("accounts", &self.read().len())
            .finish()
    }
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<AccountId, Vec<Entry>>> {
        self.inner.index.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<AccountId, Vec<Entry>>> {
        self.inner.index.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Accept an authenticated connection. The session id comes from the
    /// caller, or is generated when absent.
    pub fn connect(&self, caller: &Caller, connection: Arc<dyn Connection>) -> PendingConnection {
        let session_id = caller.session.clone().unwrap_or_else(SessionId::generate);
        PendingConnection {
            hub: self.clone(),
            account: caller.account.clone(),
            session_id,
            connection,
        }
    }

    /// Run a connection until the client goes away.
    ///
    /// Inbound frames are ignored. The entry is removed when `recv` reports
    /// end of stream or an error, or when this future is dropped.
    pub async fn serve(&self, caller: &Caller, connection: Arc<dyn Connection>) {
        let registration = self.connect(caller, connection).register();

        loop {
            match registration.connection.recv().await {
                Ok(Some(frame)) => {
                    tracing::trace!(
                        account = %registration.account,
                        session_id = %registration.session_id,
                        len = frame.len(),
                        "inbound frame ignored"
                    );
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(
                        account = %registration.account,
                        session_id = %registration.session_id,
                        error = %e,
                        "connection receive failed"
                    );
                    break;
                }
            }
        }

        registration.close();
    }

    fn insert(&self, account: &AccountId, session_id: &SessionId, connection: Arc<dyn Connection>) -> u64 {
        let connection_id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let mut index = self.write();
        let entries = index.entry(account.clone()).or_default();
        entries.push(Entry {
            connection_id,
            session_id: session_id.clone(),
            connection,
        });

        tracing::info!(
            account = %account,
            session_id = %session_id,
            connections = entries.len(),
            "connection registered"
        );
        connection_id
    }

    fn remove(&self, account: &AccountId, connection_id: u64) {
        let mut index = self.write();
        let remaining = match index.get_mut(account) {
            Some(entries) => {
                entries.retain(|e| e.connection_id != connection_id);
                entries.len()
            }
            None => return,
        };
        if remaining == 0 {
            index.remove(account);
        }

        tracing::info!(account = %account, connections = remaining, "connection closed");
    }

    /// Send an event to every registered session of `account` except
    /// `exclude`.
    ///
    /// Per-connection failures are logged and counted, never returned.
    pub async fn broadcast(
        &self,
        account: &AccountId,
        event: &SecretEvent,
        exclude: Option<&SessionId>,
    ) -> Result<BroadcastReport> {
        let mut report = BroadcastReport::default();

        let targets: Vec<(SessionId, Arc<dyn Connection>)> = {
            let index = self.read();
            index
                .get(account)
                .map(|entries| {
                    entries
                        .iter()
                        .filter(|e| {
                            let skip = exclude == Some(&e.session_id);
                            if skip {
                                report.excluded += 1;
                            }
                            !skip
                        })
                        .map(|e| (e.session_id.clone(), Arc::clone(&e.connection)))
                        .collect()
                })
                .unwrap_or_default()
        };

        if targets.is_empty() {
            tracing::debug!(
                account = %account,
                kind = event.kind.as_str(),
                excluded = report.excluded,
                "no recipients for event"
            );
            return Ok(report);
        }

        let frame = Bytes::from(serde_json::to_vec(event)?);

        let results = join_all(targets.iter().map(|(session_id, connection)| {
            let frame = frame.clone();
            async move { (session_id, connection.send(frame).await) }
        }))
        .await;

        for (session_id, result) in results {
            match result {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(
                        account = %account,
                        session_id = %session_id,
                        error = %e,
                        "event delivery failed"
                    );
                }
            }
        }

        tracing::info!(
            account = %account,
            secret_id = %event.secret_id,
            kind = event.kind.as_str(),
            recipients = report.delivered,
            failed = report.failed,
            "event broadcast"
        );

        Ok(report)
    }

    /// Number of registered connections for an account.
    pub fn connection_count(&self, account: &AccountId) -> usize {
        self.read().get(account).map_or(0, Vec::len)
    }

    /// Look up a registered connection by session id.
    pub fn find_session(
        &self,
        account: &AccountId,
        session_id: &SessionId,
    ) -> Option<Arc<dyn Connection>> {
        self.read().get(account).and_then(|entries| {
            entries
                .iter()
                .find(|e| &e.session_id == session_id)
                .map(|e| Arc::clone(&e.connection))
        })
    }
}

/// A connection that has not been indexed yet.
///
/// Dropping it leaves nothing behind in the hub.
pub struct PendingConnection {
    hub: Hub,
    account: AccountId,
    session_id: SessionId,
    connection: Arc<dyn Connection>,
}

impl PendingConnection {
    pub fn state(&self) -> ConnectionState {
        ConnectionState::Connecting
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Add the connection to the index.
    pub fn register(self) -> Registration {
        let connection_id = self
            .hub
            .insert(&self.account, &self.session_id, Arc::clone(&self.connection));
        Registration {
            hub: self.hub,
            account: self.account,
            session_id: self.session_id,
            connection_id,
            connection: self.connection,
        }
    }
}

/// A registered connection. Dropping it deregisters.
pub struct Registration {
    hub: Hub,
    account: AccountId,
    session_id: SessionId,
    connection_id: u64,
    connection: Arc<dyn Connection>,
}

impl Registration {
    pub fn state(&self) -> ConnectionState {
        ConnectionState::Registered
    }

    pub fn account(&self) -> &AccountId {
        &self.account
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Deregister now.
    pub fn close(self) -> ConnectionState {
        drop(self);
        ConnectionState::Closed
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.hub.remove(&self.account, self.connection_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use crate::transport::memory::{self, MemoryPeer};
    use keepsync_core::SecretId;

    fn alice() -> AccountId {
        AccountId::from("alice")
    }

    fn register(hub: &Hub, caller: &Caller) -> (Registration, MemoryPeer) {
        let (conn, peer) = memory::pair();
        (hub.connect(caller, Arc::new(conn)).register(), peer)
    }

    fn event() -> SecretEvent {
        SecretEvent::new(EventKind::Updated, SecretId::new(), alice())
    }

    #[tokio::test]
    async fn test_broadcast_excludes_originating_session() {
        let hub = Hub::new();
        let (_a, peer_a) = register(&hub, &Caller::new(alice()).with_session("a"));
        let (_b, peer_b) = register(&hub, &Caller::new(alice()).with_session("b"));
        let (_c, peer_c) = register(&hub, &Caller::new(alice()).with_session("c"));

        let report = hub
            .broadcast(&alice(), &event(), Some(&SessionId::from("a")))
            .await
            .unwrap();

        assert_eq!(
            report,
            BroadcastReport {
                delivered: 2,
                failed: 0,
                excluded: 1
            }
        );
        assert!(peer_a.try_recv().await.is_none());
        assert!(peer_b.try_recv().await.is_some());
        assert!(peer_c.try_recv().await.is_some());
    }

    #[tokio::test]
    async fn test_broadcast_frame_is_event_json() {
        let hub = Hub::new();
        let (_b, peer) = register(&hub, &Caller::new(alice()).with_session("b"));
        let sent = event();

        hub.broadcast(&alice(), &sent, None).await.unwrap();

        let frame = peer.recv().await.unwrap();
        let received: SecretEvent = serde_json::from_slice(&frame).unwrap();
        assert_eq!(received.secret_id, sent.secret_id);
        assert_eq!(received.kind, EventKind::Updated);
    }

    #[tokio::test]
    async fn test_broadcast_to_empty_account() {
        let hub = Hub::new();
        let (_other, peer) = register(&hub, &Caller::new("bob"));

        let report = hub.broadcast(&alice(), &event(), None).await.unwrap();
        assert_eq!(report, BroadcastReport::default());
        assert!(peer.try_recv().await.is_none());
    }

    #[tokio::test]
    async fn test_failed_delivery_does_not_abort_others() {
        let hub = Hub::new();
        let (_a, peer_a) = register(&hub, &Caller::new(alice()).with_session("a"));
        let (_b, peer_b) = register(&hub, &Caller::new(alice()).with_session("b"));
        drop(peer_a);

        let report = hub.broadcast(&alice(), &event(), None).await.unwrap();
        assert_eq!(report.delivered, 1);
        assert_eq!(report.failed, 1);
        assert!(peer_b.try_recv().await.is_some());
    }

    #[tokio::test]
    async fn test_state_transitions() {
        let hub = Hub::new();
        let caller = Caller::new(alice()).with_session("s1");
        let (conn, _peer) = memory::pair();

        let pending = hub.connect(&caller, Arc::new(conn));
        assert_eq!(pending.state(), ConnectionState::Connecting);
        assert_eq!(hub.connection_count(&alice()), 0);

        let registration = pending.register();
        assert_eq!(registration.state(), ConnectionState::Registered);
        assert_eq!(hub.connection_count(&alice()), 1);
        assert!(hub.find_session(&alice(), &SessionId::from("s1")).is_some());

        assert_eq!(registration.close(), ConnectionState::Closed);
        assert_eq!(hub.connection_count(&alice()), 0);
        assert!(hub.find_session(&alice(), &SessionId::from("s1")).is_none());
    }

    #[tokio::test]
    async fn test_abandoned_pending_leaves_no_entry() {
        let hub = Hub::new();
        let (conn, _peer) = memory::pair();
        let pending = hub.connect(&Caller::new(alice()), Arc::new(conn));
        assert_eq!(pending.session_id().as_str().len(), 36);
        drop(pending);
        assert_eq!(hub.connection_count(&alice()), 0);
    }

    #[tokio::test]
    async fn test_serve_deregisters_on_disconnect() {
        let hub = Hub::new();
        let (conn, peer) = memory::pair();
        let caller = Caller::new(alice()).with_session("live");

        let task = {
            let hub = hub.clone();
            let caller = caller.clone();
            tokio::spawn(async move { hub.serve(&caller, Arc::new(conn)).await })
        };

        peer.send("ping").await.unwrap();
        while hub.connection_count(&alice()) == 0 {
            tokio::task::yield_now().await;
        }
        assert!(hub.find_session(&alice(), &SessionId::from("live")).is_some());

        peer.close().await;
        task.await.unwrap();
        assert_eq!(hub.connection_count(&alice()), 0);
    }

    #[tokio::test]
    async fn test_serve_deregisters_when_aborted() {
        let hub = Hub::new();
        let (conn, _peer) = memory::pair();

        let task = {
            let hub = hub.clone();
            tokio::spawn(async move { hub.serve(&Caller::new("alice"), Arc::new(conn)).await })
        };
        while hub.connection_count(&alice()) == 0 {
            tokio::task::yield_now().await;
        }

        task.abort();
        let _ = task.await;
        assert_eq!(hub.connection_count(&alice()), 0);
    }

    #[tokio::test]
    async fn test_accounts_are_isolated() {
        let hub = Hub::new();
        let (_a, _pa) = register(&hub, &Caller::new(alice()).with_session("x"));
        let (_b, _pb) = register(&hub, &Caller::new("bob").with_session("x"));

        assert_eq!(hub.connection_count(&alice()), 1);
        assert_eq!(hub.connection_count(&AccountId::from("bob")), 1);
        assert!(hub.find_session(&AccountId::from("carol"), &SessionId::from("x")).is_none());
    }
}
