//! Cookie-session authorization for pages and the hub.
//!
//! The session token travels in a cookie named by `auth.cookie_name`.
//! [`MaybeUser`] resolves it when present, [`CurrentUser`] demands it and
//! sends anonymous visitors to the login page.
use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Redirect, Response},
};

use crate::auth::Session;
use crate::AppState;

/// Login page anonymous visitors are sent to
pub const LOGIN_PATH: &str = "/Identity/Account/Login";

/// Value of a named cookie in the request headers
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Session token carried by the request, if any
pub fn session_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    cookie_value(headers, cookie_name)
}

/// Resolve the request's cookie to a live session
pub async fn current_session(state: &AppState, headers: &HeaderMap) -> Option<Session> {
    let token = session_token(headers, &state.settings.auth.cookie_name)?;
    state.sessions.get(&token).await
}

/// `Set-Cookie` value that stores a session in the browser
pub fn session_cookie(cookie_name: &str, session: &Session) -> String {
    let mut cookie = format!(
        "{cookie_name}={}; Path=/; HttpOnly; SameSite=Lax",
        session.token
    );
    // Persistent sessions outlive the browser, the rest are session cookies
    if session.persistent {
        cookie.push_str(&format!("; Max-Age={}", session.time_left().as_secs()));
    }
    cookie
}

/// `Set-Cookie` value that removes the session cookie
pub fn clear_session_cookie(cookie_name: &str) -> String {
    format!("{cookie_name}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// The signed-in session, if there is one
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<Session>);

impl FromRequestParts<Arc<AppState>> for MaybeUser {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(current_session(state, &parts.headers).await))
    }
}

/// A signed-in session; anonymous requests are redirected to login
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Session);

impl CurrentUser {
    /// Refuse the request unless the user holds `role`
    pub fn require_role(&self, role: &str) -> Result<&Session, AuthRejection> {
        if self.0.is_in_role(role) {
            Ok(&self.0)
        } else {
            tracing::info!(user_id = %self.0.user_id, role, "access denied, missing role");
            Err(AuthRejection::AccessDenied)
        }
    }
}

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        match current_session(state, &parts.headers).await {
            Some(session) => Ok(CurrentUser(session)),
            None => Err(AuthRejection::LoginRequired {
                return_url: parts
                    .uri
                    .path_and_query()
                    .map_or_else(|| parts.uri.path().to_string(), |pq| pq.as_str().to_string()),
            }),
        }
    }
}

/// Why an authorized page was refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthRejection {
    /// No session; send the visitor to login and back again
    LoginRequired { return_url: String },
    /// Signed in, but lacking the required role
    AccessDenied,
}

impl AuthRejection {
    pub fn login_location(return_url: &str) -> String {
        format!("{LOGIN_PATH}?ReturnUrl={}", encode_query_value(return_url))
    }
}

// Percent-encode everything outside the RFC 3986 unreserved set
fn encode_query_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~') {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            AuthRejection::LoginRequired { return_url } => {
                Redirect::to(&Self::login_location(&return_url)).into_response()
            },
            AuthRejection::AccessDenied => (StatusCode::FORBIDDEN, "Access denied").into_response(),
        }
    }
}

/// Attach a `Set-Cookie` header to a response
pub fn with_cookie(mut response: Response, cookie: &str) -> Response {
    match HeaderValue::from_str(cookie) {
        Ok(value) => {
            response.headers_mut().append(header::SET_COOKIE, value);
        },
        Err(e) => tracing::error!(error = %e, "invalid Set-Cookie value"),
    }
    response
}
