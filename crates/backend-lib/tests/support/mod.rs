//! Shared setup for the integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use backend_lib::{config::Settings, ws_router::create_router, AppState};

pub const ADMIN_EMAIL: &str = "fortnite@fortnite.fortnite4";

/// Default settings with cheap password hashing and one admin account
pub fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.auth.hashing.log_n = 8;
    settings.auth.admin_emails = vec![ADMIN_EMAIL.to_string()];
    settings
}

pub fn test_state(settings: Settings) -> Arc<AppState> {
    Arc::new(AppState::new(settings).expect("test settings are valid"))
}

/// Start a server on an ephemeral port, returning its address
pub async fn setup_server(state: Arc<AppState>) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let app = create_router(state);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    addr
}
