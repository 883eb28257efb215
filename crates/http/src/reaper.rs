//! Idle connection reaper.
//!
//! Every connection is registered with a time-to-live and refreshed whenever bytes
//! arrive on it. A periodic sweep closes the connections that stayed silent for
//! longer than their ttl. This is the only keep-alive policy of the server.
//!
//! The sweep runs on a dedicated timer thread, see [`ConnectionReaper::spawn`].

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Process-unique identifier of an accepted connection.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Allocates the next identifier.
    pub fn next() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// A connection the reaper can close.
pub trait Reapable: Clone + Send + Sync + 'static {
    fn id(&self) -> ConnectionId;

    /// Closes the connection. Called at most once per registration, from the
    /// reaper thread.
    fn close(&self);
}

#[derive(Debug)]
struct Entry<C> {
    conn: C,
    seen_at: Instant,
    ttl: Duration,
}

/// Tracks the last activity of every live connection.
#[derive(Debug)]
pub struct ConnectionReaper<C> {
    entries: DashMap<ConnectionId, Entry<C>>,
}

impl<C: Reapable> ConnectionReaper<C> {
    pub fn new() -> Self {
        Self { entries: DashMap::new() }
    }

    /// Registers `conn` or refreshes its last activity.
    ///
    /// The ttl of a connection is fixed by its first registration.
    pub fn seen(&self, conn: &C, ttl: Duration) {
        self.seen_at(conn, ttl, Instant::now());
    }

    /// Same as [`seen`](Self::seen) with an explicit clock.
    pub fn seen_at(&self, conn: &C, ttl: Duration, now: Instant) {
        self.entries
            .entry(conn.id())
            .and_modify(|entry| entry.seen_at = now)
            .or_insert_with(|| Entry { conn: conn.clone(), seen_at: now, ttl });
    }

    /// Stops tracking a connection, returns true if it was tracked.
    pub fn remove(&self, id: ConnectionId) -> bool {
        self.entries.remove(&id).is_some()
    }

    /// Number of tracked connections.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Closes every connection idle for longer than its ttl.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    /// Same as [`sweep`](Self::sweep) with an explicit clock, returns the number of
    /// connections closed.
    pub fn sweep_at(&self, now: Instant) -> usize {
        let mut expired = vec![];
        self.entries.retain(|_, entry| {
            let alive = now.saturating_duration_since(entry.seen_at) <= entry.ttl;
            if !alive {
                expired.push(entry.conn.clone());
            }
            alive
        });

        // closed outside of the map so that `close` may call back into `remove`
        for conn in &expired {
            debug!(connection = conn.id().as_u64(), "reaping idle connection");
            conn.close();
        }
        expired.len()
    }

    /// Starts sweeping every `interval` on a dedicated timer thread.
    ///
    /// The thread stops once the returned handle is shut down or dropped.
    pub fn spawn(self: &Arc<Self>, interval: Duration) -> io::Result<ReaperHandle> {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_time().build()?;
        let token = CancellationToken::new();

        let reaper = Arc::clone(self);
        let cancelled = token.clone();
        let thread = thread::Builder::new().name("ring-http-reaper".into()).spawn(move || {
            runtime.block_on(async move {
                let mut ticker = tokio::time::interval(interval);
                ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
                loop {
                    tokio::select! {
                        () = cancelled.cancelled() => break,
                        _ = ticker.tick() => {
                            let reaped = reaper.sweep();
                            if reaped > 0 {
                                info!(reaped, remaining = reaper.len(), "closed idle connections");
                            }
                        }
                    }
                }
            });
            debug!("reaper stopped");
        })?;

        Ok(ReaperHandle { token, thread: Some(thread) })
    }
}

impl<C: Reapable> Default for ConnectionReaper<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle of a running reaper thread.
#[derive(Debug)]
pub struct ReaperHandle {
    token: CancellationToken,
    thread: Option<JoinHandle<()>>,
}

impl ReaperHandle {
    /// Stops the reaper and waits for its thread to exit.
    pub fn shutdown(mut self) {
        self.token.cancel();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("reaper thread panicked");
            }
        }
    }
}

impl Drop for ReaperHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    #[derive(Debug, Clone)]
    struct TestConn {
        id: ConnectionId,
        closed: Arc<AtomicUsize>,
    }

    impl TestConn {
        fn new() -> Self {
            Self { id: ConnectionId::next(), closed: Arc::new(AtomicUsize::new(0)) }
        }

        fn closed(&self) -> usize {
            self.closed.load(Ordering::SeqCst)
        }
    }

    impl Reapable for TestConn {
        fn id(&self) -> ConnectionId {
            self.id
        }

        fn close(&self) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    const TTL: Duration = Duration::from_millis(1000);

    #[test]
    fn idle_connection_is_reaped() {
        let reaper = ConnectionReaper::new();
        let conn = TestConn::new();
        let start = Instant::now();

        reaper.seen_at(&conn, TTL, start);

        assert_eq!(reaper.sweep_at(start + TTL), 0);
        assert_eq!(reaper.sweep_at(start + Duration::from_millis(1001)), 1);
        assert_eq!(conn.closed(), 1);
        assert!(reaper.is_empty());

        assert_eq!(reaper.sweep_at(start + Duration::from_millis(5000)), 0);
        assert_eq!(conn.closed(), 1);
    }

    #[test]
    fn active_connection_survives() {
        let reaper = ConnectionReaper::new();
        let conn = TestConn::new();
        let start = Instant::now();

        for step in 0..10 {
            let now = start + Duration::from_millis(500 * step);
            reaper.seen_at(&conn, TTL, now);
            assert_eq!(reaper.sweep_at(now + Duration::from_millis(250)), 0);
        }

        assert_eq!(conn.closed(), 0);
        assert_eq!(reaper.len(), 1);
    }

    #[test]
    fn ttl_is_fixed_at_registration() {
        let reaper = ConnectionReaper::new();
        let conn = TestConn::new();
        let start = Instant::now();

        reaper.seen_at(&conn, TTL, start);
        reaper.seen_at(&conn, Duration::from_secs(3600), start);

        assert_eq!(reaper.sweep_at(start + Duration::from_secs(2)), 1);
    }

    #[test]
    fn removed_connection_is_not_closed() {
        let reaper = ConnectionReaper::new();
        let conn = TestConn::new();
        let start = Instant::now();

        reaper.seen_at(&conn, TTL, start);
        assert!(reaper.remove(conn.id()));
        assert!(!reaper.remove(conn.id()));

        assert_eq!(reaper.sweep_at(start + Duration::from_secs(2)), 0);
        assert_eq!(conn.closed(), 0);
    }

    #[test]
    fn spawned_reaper_closes_idle_connections() {
        let reaper = Arc::new(ConnectionReaper::new());
        let conn = TestConn::new();
        reaper.seen(&conn, Duration::from_millis(20));

        let handle = reaper.spawn(Duration::from_millis(10)).unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while conn.closed() == 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        handle.shutdown();

        assert_eq!(conn.closed(), 1);
        assert!(reaper.is_empty());
    }
}
