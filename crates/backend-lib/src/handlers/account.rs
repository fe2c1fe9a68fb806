// ============================
// crates/backend-lib/src/handlers/account.rs
// ============================
//! `/Identity/Account/*` endpoints.
//!
//! Forms are decoded here, handed to the [`AccountController`], and the
//! outcome is turned into a `303 See Other` with the matching cookie change,
//! or a `400` carrying the error report.
//!
//! [`AccountController`]: crate::controllers::AccountController
use std::sync::Arc;

use authchat_common::{LoginRequest, RegistrationRequest};
use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::{IntoResponse, Redirect as HttpRedirect, Response},
    Form,
};
use serde::Deserialize;

use crate::authorization::{clear_session_cookie, session_cookie, session_token, with_cookie};
use crate::controllers::{Redirect, SessionChange};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ReturnUrlQuery {
    #[serde(rename = "ReturnUrl")]
    pub return_url: Option<String>,
}

/// Render a controller redirect as an HTTP response
pub fn redirect_response(redirect: Redirect, cookie_name: &str) -> Response {
    let response = HttpRedirect::to(&redirect.target.location()).into_response();
    match redirect.session {
        SessionChange::Established(session) => {
            with_cookie(response, &session_cookie(cookie_name, &session))
        },
        SessionChange::Cleared => with_cookie(response, &clear_session_cookie(cookie_name)),
    }
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Form(request): Form<RegistrationRequest>,
) -> Response {
    match state.account_controller().register(request).await {
        Ok(redirect) => redirect_response(redirect, &state.settings.auth.cookie_name),
        Err(report) => report.into_response(),
    }
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReturnUrlQuery>,
    Form(mut request): Form<LoginRequest>,
) -> Response {
    // The query string wins over a hidden form field
    let return_url = query.return_url.or_else(|| request.return_url.take());
    match state
        .account_controller()
        .login(request, return_url.as_deref())
        .await
    {
        Ok(redirect) => redirect_response(redirect, &state.settings.auth.cookie_name),
        Err(report) => report.into_response(),
    }
}

pub async fn logout(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let cookie_name = &state.settings.auth.cookie_name;
    let redirect = state
        .account_controller()
        .logout(session_token(&headers, cookie_name))
        .await;
    redirect_response(redirect, cookie_name)
}
