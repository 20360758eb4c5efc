use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, mpsc};
use wayfinder_core::{CampusGraph, GuidanceEvent, NavigationSession};

use crate::config::ServerConfig;

/// A guidance session and the queue its events land in
#[derive(Debug)]
pub struct SessionEntry {
    pub session: Arc<NavigationSession>,
    pub events: mpsc::Receiver<GuidanceEvent>,
    /// When the task was first seen finished
    finished_at: Option<Instant>,
}

impl SessionEntry {
    pub fn new(session: NavigationSession, events: mpsc::Receiver<GuidanceEvent>) -> Self {
        Self {
            session: Arc::new(session),
            events,
            finished_at: None,
        }
    }

    /// Whether a finished session has outlived `ttl`
    fn expired(&mut self, now: Instant, ttl: Duration) -> bool {
        if !self.session.is_finished() {
            return false;
        }
        let finished_at = *self.finished_at.get_or_insert(now);
        now.duration_since(finished_at) >= ttl
    }
}

/// Shared state of all handlers
#[derive(Debug)]
pub struct AppState {
    pub graph: Arc<CampusGraph>,
    pub config: ServerConfig,
    pub sessions: Mutex<HashMap<u64, SessionEntry>>,
    next_session: AtomicU64,
}

impl AppState {
    pub fn new(graph: CampusGraph, config: ServerConfig) -> Self {
        Self {
            graph: Arc::new(graph),
            config,
            sessions: Mutex::new(HashMap::new()),
            next_session: AtomicU64::new(1),
        }
    }

    pub fn next_session_id(&self) -> u64 {
        self.next_session.fetch_add(1, Ordering::Relaxed)
    }

    /// Drops finished sessions nobody collected within the configured TTL.
    /// Returns how many were removed.
    pub fn sweep_finished(&self, sessions: &mut HashMap<u64, SessionEntry>) -> usize {
        let now = Instant::now();
        let ttl = Duration::from_secs(self.config.finished_session_ttl_secs);
        let before = sessions.len();
        sessions.retain(|_, entry| !entry.expired(now, ttl));
        let removed = before - sessions.len();
        if removed > 0 {
            tracing::info!(removed, "Swept finished guidance sessions");
        }
        removed
    }
}
