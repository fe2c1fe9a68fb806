//! Home pages, used to exercise cookie-session authorization.
use crate::auth::ADMIN_ROLE;
use crate::authorization::{AuthRejection, CurrentUser, MaybeUser};

/// Open to everyone
pub async fn index(MaybeUser(session): MaybeUser) -> &'static str {
    if let Some(session) = session {
        tracing::debug!(user_id = %session.user_id, "home page");
    }
    "Home"
}

/// Any signed-in user
pub async fn chat(CurrentUser(session): CurrentUser) -> &'static str {
    tracing::debug!(user_id = %session.user_id, "chat page");
    "Chat"
}

/// Signed-in users in the `Admin` role
pub async fn admin(user: CurrentUser) -> Result<&'static str, AuthRejection> {
    user.require_role(ADMIN_ROLE)?;
    Ok("Admin")
}
