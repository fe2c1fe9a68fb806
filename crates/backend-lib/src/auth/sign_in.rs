//! Sign-in management collaborator and its default implementation.
use std::sync::Arc;

use async_trait::async_trait;
use metrics::counter;
use scrypt::Params;
use tokio::sync::OnceCell;

use super::lockout::LockoutTracker;
use super::password::hash_password;
use super::session::{Session, SessionManager};
use super::token_generator::generate_secure_token;
use super::user::{normalize_email, User};
use super::user_manager::UserManager;
use crate::metrics::{LOGIN_FAILED, LOGIN_LOCKED_OUT, LOGIN_SUCCEEDED};

/// Outcome of a password sign-in
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignInResult {
    Succeeded(Session),
    Failed,
    LockedOut,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SignInManager: Send + Sync {
    /// Check credentials and open a session on success
    async fn password_sign_in(
        &self,
        email: &str,
        password: &str,
        persistent: bool,
        lockout_on_failure: bool,
    ) -> SignInResult;

    /// Open a session for an already-verified user
    async fn sign_in(&self, user: &User, persistent: bool) -> Session;

    /// Close the session, if any. Unknown tokens are ignored.
    async fn sign_out(&self, token: Option<String>);
}

/// Sign-in over a user manager, the session store, and a lockout tracker
pub struct DefaultSignInManager {
    users: Arc<dyn UserManager>,
    sessions: SessionManager,
    lockouts: LockoutTracker,
    params: Params,
    decoy: OnceCell<Option<User>>,
}

impl DefaultSignInManager {
    /// `params` must match the user manager's hashing cost
    pub fn new(
        users: Arc<dyn UserManager>,
        sessions: SessionManager,
        lockouts: LockoutTracker,
        params: Params,
    ) -> Self {
        Self {
            users,
            sessions,
            lockouts,
            params,
            decoy: OnceCell::new(),
        }
    }

    /// Account with an unguessable password, checked when the email is unknown
    /// so both failure paths pay for one hash verification
    async fn decoy_user(&self) -> Option<&User> {
        self.decoy
            .get_or_init(|| async {
                let params = self.params.clone();
                let hashed =
                    tokio::task::spawn_blocking(move || hash_password(&generate_secure_token(), params))
                        .await;
                match hashed {
                    Ok(Ok(hash)) => Some(User::new("", hash)),
                    Ok(Err(e)) => {
                        tracing::warn!(error = %e, "decoy password hash unavailable");
                        None
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "decoy password hash task failed");
                        None
                    }
                }
            })
            .await
            .as_ref()
    }
}

#[async_trait]
impl SignInManager for DefaultSignInManager {
    async fn password_sign_in(
        &self,
        email: &str,
        password: &str,
        persistent: bool,
        lockout_on_failure: bool,
    ) -> SignInResult {
        let account = normalize_email(email);

        if lockout_on_failure && self.lockouts.is_locked_out(&account) {
            counter!(LOGIN_LOCKED_OUT).increment(1);
            return SignInResult::LockedOut;
        }

        let Some(user) = self.users.find_by_email(email).await else {
            if let Some(decoy) = self.decoy_user().await {
                self.users.check_password(decoy, password).await;
            }
            counter!(LOGIN_FAILED).increment(1);
            return SignInResult::Failed;
        };

        if self.users.check_password(&user, password).await {
            self.lockouts.record_success(&account);
            counter!(LOGIN_SUCCEEDED).increment(1);
            return SignInResult::Succeeded(self.sessions.create_session(&user, persistent).await);
        }

        counter!(LOGIN_FAILED).increment(1);
        if lockout_on_failure && self.lockouts.record_failed_attempt(&account) {
            counter!(LOGIN_LOCKED_OUT).increment(1);
            return SignInResult::LockedOut;
        }
        SignInResult::Failed
    }

    async fn sign_in(&self, user: &User, persistent: bool) -> Session {
        self.sessions.create_session(user, persistent).await
    }

    async fn sign_out(&self, token: Option<String>) {
        if let Some(token) = token {
            if let Some(session) = self.sessions.remove(&token).await {
                tracing::debug!(user_id = %session.user_id, "session closed");
            }
        }
    }
}
