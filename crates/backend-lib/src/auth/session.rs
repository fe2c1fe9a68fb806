// ============================
// crates/backend-lib/src/auth/session.rs
// ============================
//! Session token handling and management.
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use metrics::{counter, gauge};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::auth::token_generator::generate_secure_token;
use crate::auth::user::User;
use crate::metrics::{SESSION_ACTIVE, SESSION_CREATED, SESSION_EXPIRED};

/// Signed-in session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user_id: Uuid,
    pub email: String,
    pub roles: BTreeSet<String>,
    /// Issued with "remember me"
    pub persistent: bool,
    pub created_at: SystemTime,
    pub expires_at: SystemTime,
}

impl Session {
    pub fn is_in_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    pub fn is_expired(&self, now: SystemTime) -> bool {
        now >= self.expires_at
    }

    /// Remaining lifetime, zero once expired
    pub fn time_left(&self) -> Duration {
        self.expires_at
            .duration_since(SystemTime::now())
            .unwrap_or(Duration::ZERO)
    }
}

/// In-memory session store keyed by opaque token
#[derive(Clone)]
pub struct SessionManager {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    ttl: Duration,
    persistent_ttl: Duration,
}

impl SessionManager {
    /// Create a new session manager
    pub fn new(ttl: Duration, persistent_ttl: Duration) -> Self {
        SessionManager {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
            persistent_ttl,
        }
    }

    /// Create a session for a user
    pub async fn create_session(&self, user: &User, persistent: bool) -> Session {
        let now = SystemTime::now();
        let ttl = if persistent { self.persistent_ttl } else { self.ttl };
        let session = Session {
            token: generate_secure_token(),
            user_id: user.id,
            email: user.email.clone(),
            roles: user.roles.clone(),
            persistent,
            created_at: now,
            expires_at: now + ttl,
        };

        let mut sessions = self.sessions.write().await;
        sessions.insert(session.token.clone(), session.clone());

        counter!(SESSION_CREATED).increment(1);
        gauge!(SESSION_ACTIVE).set(sessions.len() as f64);

        session
    }

    /// Get a live session by token
    pub async fn get(&self, token: &str) -> Option<Session> {
        let sessions = self.sessions.read().await;
        sessions
            .get(token)
            .filter(|session| !session.is_expired(SystemTime::now()))
            .cloned()
    }

    /// Validate a session token
    pub async fn validate_session(&self, token: &str) -> bool {
        self.get(token).await.is_some()
    }

    /// Drop a session, returning it if it existed
    pub async fn remove(&self, token: &str) -> Option<Session> {
        let mut sessions = self.sessions.write().await;
        let removed = sessions.remove(token);
        gauge!(SESSION_ACTIVE).set(sessions.len() as f64);
        removed
    }

    /// Number of stored sessions, expired ones included until the next purge
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Remove expired sessions, returning how many were dropped
    pub async fn purge_expired(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let now = SystemTime::now();
        let before_count = sessions.len();

        sessions.retain(|_, session| !session.is_expired(now));

        let after_count = sessions.len();
        let removed = before_count - after_count;

        if removed > 0 {
            counter!(SESSION_EXPIRED).increment(removed as u64);
            gauge!(SESSION_ACTIVE).set(after_count as f64);
        }
        removed
    }

    /// Spawn the periodic cleanup task. Must be called inside a Tokio runtime.
    pub fn spawn_cleanup_task(&self, interval: Duration) -> JoinHandle<()> {
        let manager = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = manager.purge_expired().await;
                if removed > 0 {
                    tracing::debug!(removed, "purged expired sessions");
                }
            }
        })
    }
}
