// ============================
// authchat-backend-lib/src/lib.rs
// ============================
//! Core backend-lib functionality for the `AuthChat` server: the account
//! flow, cookie-session authorization, and the chat broadcast hub.

pub mod auth;
pub mod authorization;
pub mod config;
pub mod controllers;
pub mod error;
pub mod handlers;
pub mod hub;
pub mod metrics;
pub mod validation;
pub mod ws_router;

use std::sync::Arc;
use std::time::Duration;

use crate::auth::password::scrypt_params;
use crate::auth::{
    DefaultSignInManager, InMemoryUserManager, LockoutTracker, SessionManager, SignInManager,
    UserManager,
};
use crate::config::Settings;
use crate::controllers::AccountController;
use crate::error::AppError;
use crate::hub::{ChatHub, ConnectionRegistry};

/// Application state shared across all handlers
pub struct AppState {
    /// Validated settings
    pub settings: Arc<Settings>,
    /// Account store
    pub users: Arc<dyn UserManager>,
    /// Sign-in collaborator
    pub sign_in: Arc<dyn SignInManager>,
    /// Session store, shared with `sign_in`
    pub sessions: SessionManager,
    /// Failed-login tracker, shared with `sign_in`
    pub lockouts: LockoutTracker,
    /// Live hub connections
    pub connections: Arc<ConnectionRegistry>,
}

impl AppState {
    /// Build the in-memory identity stack from settings
    pub fn new(settings: Settings) -> Result<Self, AppError> {
        settings.validate()?;

        let auth = &settings.auth;
        let sessions = SessionManager::new(
            Duration::from_secs(auth.session_ttl_secs),
            Duration::from_secs(auth.persistent_session_ttl_secs),
        );
        let users: Arc<dyn UserManager> = Arc::new(InMemoryUserManager::from_settings(auth)?);
        let lockouts = LockoutTracker::from_settings(&auth.lockout);
        let sign_in: Arc<dyn SignInManager> = Arc::new(DefaultSignInManager::new(
            users.clone(),
            sessions.clone(),
            lockouts.clone(),
            scrypt_params(&auth.hashing)?,
        ));

        Ok(Self {
            settings: Arc::new(settings),
            users,
            sign_in,
            sessions,
            lockouts,
            connections: Arc::new(ConnectionRegistry::new()),
        })
    }

    pub fn account_controller(&self) -> AccountController {
        AccountController::new(self.users.clone(), self.sign_in.clone())
            .with_lockout_on_failure(self.settings.auth.lockout_on_failure)
    }

    /// Hub broadcasting over the live connection registry
    pub fn chat_hub(&self) -> ChatHub {
        ChatHub::new(self.connections.clone())
    }
}
