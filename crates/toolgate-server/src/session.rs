use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

pub const DEFAULT_IDLE_TIMEOUT_MINUTES: i64 = 30;
pub const DEFAULT_MAX_SESSIONS: usize = 1024;

/// Bookkeeping for one MCP client over HTTP.
#[derive(Debug, Clone)]
pub struct Session {
    pub created_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}

/// Tracks `Mcp-Session-Id` values handed out by `initialize`.
///
/// Sessions idle longer than `idle_timeout` are dropped, and the table never
/// holds more than `max_sessions` entries; the least recently seen session is
/// evicted to make room.
pub struct SessionManager {
    sessions: RwLock<HashMap<String, Session>>,
    idle_timeout: Duration,
    max_sessions: usize,
}

impl SessionManager {
    #[must_use]
    pub fn new() -> Self {
        Self::with_limits(
            Duration::minutes(DEFAULT_IDLE_TIMEOUT_MINUTES),
            DEFAULT_MAX_SESSIONS,
        )
    }

    #[must_use]
    pub fn with_limits(idle_timeout: Duration, max_sessions: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_timeout,
            max_sessions: max_sessions.max(1),
        }
    }

    /// Open a new session and return its id.
    pub async fn create(&self) -> String {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let mut sessions = self.sessions.write().await;
        self.reap(&mut sessions, now);
        while sessions.len() >= self.max_sessions {
            let Some(oldest) = sessions
                .iter()
                .min_by_key(|(_, s)| s.last_seen_at)
                .map(|(id, _)| id.clone())
            else {
                break;
            };
            sessions.remove(&oldest);
            tracing::info!(session = %oldest, "MCP session evicted");
        }
        sessions.insert(
            id.clone(),
            Session {
                created_at: now,
                last_seen_at: now,
            },
        );
        tracing::info!(session = %id, active = sessions.len(), "MCP session opened");
        id
    }

    /// Mark a session as active. Returns false if the id is unknown or the
    /// session has expired.
    pub async fn touch(&self, id: &str) -> bool {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(id) {
            Some(session) if now - session.last_seen_at <= self.idle_timeout => {
                session.last_seen_at = now;
                true
            }
            Some(_) => {
                sessions.remove(id);
                tracing::info!(session = %id, "MCP session expired");
                false
            }
            None => false,
        }
    }

    /// End a session. Returns false if the id is unknown.
    pub async fn remove(&self, id: &str) -> bool {
        let removed = self.sessions.write().await.remove(id).is_some();
        if removed {
            tracing::info!(session = %id, "MCP session closed");
        }
        removed
    }

    /// Drop every session idle as of `now`. Returns how many were removed.
    pub async fn reap_idle(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.write().await;
        self.reap(&mut sessions, now)
    }

    fn reap(&self, sessions: &mut HashMap<String, Session>, now: DateTime<Utc>) -> usize {
        let before = sessions.len();
        sessions.retain(|_, s| now - s.last_seen_at <= self.idle_timeout);
        let reaped = before - sessions.len();
        if reaped > 0 {
            tracing::info!(reaped, "expired idle MCP sessions");
        }
        reaped
    }
}

/// Periodically drop idle sessions for as long as the manager is alive.
pub fn spawn_reaper(sessions: &Arc<SessionManager>, every: std::time::Duration) {
    let sessions = Arc::downgrade(sessions);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let Some(sessions) = sessions.upgrade() else {
                break;
            };
            sessions.reap_idle(Utc::now()).await;
        }
    });
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}
