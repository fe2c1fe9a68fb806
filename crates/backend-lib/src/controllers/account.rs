//! Account flow: registration, login and logout.
//!
//! Each operation validates the form, makes one call into the identity
//! collaborators, and maps the outcome to either a [`Redirect`] or an
//! [`ErrorReport`]. The controller holds no state of its own.

use std::sync::Arc;

use authchat_common::{LoginRequest, RegistrationRequest};
use metrics::counter;
use tracing::instrument;

use crate::auth::{NewUser, Session, SignInManager, SignInResult, UserManager};
use crate::error::{ErrorReport, GENERIC_KEY};
use crate::metrics::{ACCOUNT_REGISTERED, ACCOUNT_REGISTER_REJECTED, LOGOUT};
use crate::validation;

pub const INVALID_LOGIN_ATTEMPT: &str = "Invalid login attempt.";
pub const ACCOUNT_LOCKED_OUT: &str = "User account locked out.";

/// Where the client is sent after a successful operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectTarget {
    /// A controller action, e.g. `Home/Index`
    Action {
        action: &'static str,
        controller: &'static str,
    },
    /// A validated on-site path
    Local(String),
}

impl RedirectTarget {
    /// The fixed post-account destination
    pub fn home_index() -> Self {
        RedirectTarget::Action {
            action: "Index",
            controller: "Home",
        }
    }

    pub fn action_name(&self) -> Option<&str> {
        match self {
            RedirectTarget::Action { action, .. } => Some(action),
            RedirectTarget::Local(_) => None,
        }
    }

    /// Path to put in the `Location` header
    pub fn location(&self) -> String {
        match self {
            RedirectTarget::Action {
                action: "Index",
                controller: "Home",
            } => "/".to_string(),
            RedirectTarget::Action { action, controller } => format!("/{controller}/{action}"),
            RedirectTarget::Local(path) => path.clone(),
        }
    }
}

/// What happened to the caller's session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionChange {
    Established(Session),
    Cleared,
}

/// Successful account operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub target: RedirectTarget,
    pub session: SessionChange,
}

impl Redirect {
    fn home(session: SessionChange) -> Self {
        Self {
            target: RedirectTarget::home_index(),
            session,
        }
    }
}

pub struct AccountController {
    users: Arc<dyn UserManager>,
    sign_in: Arc<dyn SignInManager>,
    lockout_on_failure: bool,
}

impl AccountController {
    pub fn new(users: Arc<dyn UserManager>, sign_in: Arc<dyn SignInManager>) -> Self {
        Self {
            users,
            sign_in,
            lockout_on_failure: false,
        }
    }

    /// Count failed logins towards a lockout
    pub fn with_lockout_on_failure(mut self, enabled: bool) -> Self {
        self.lockout_on_failure = enabled;
        self
    }

    /// Create an account and sign it in.
    #[instrument(skip_all, fields(email = %request.email))]
    pub async fn register(&self, request: RegistrationRequest) -> Result<Redirect, ErrorReport> {
        if let Err(report) = validation::validate_registration(&request) {
            counter!(ACCOUNT_REGISTER_REJECTED).increment(1);
            tracing::debug!(fields = report.len(), "registration form rejected");
            return Err(report);
        }

        let user = match self
            .users
            .create_user(NewUser::new(request.email.trim()), &request.password)
            .await
        {
            Ok(user) => user,
            Err(errors) => {
                counter!(ACCOUNT_REGISTER_REJECTED).increment(1);
                tracing::info!(errors = errors.len(), "user creation refused");
                let mut report = ErrorReport::new();
                for error in errors {
                    report.add(GENERIC_KEY, error.description);
                }
                return Err(report);
            },
        };

        let session = self.sign_in.sign_in(&user, false).await;
        counter!(ACCOUNT_REGISTERED).increment(1);
        tracing::info!(user_id = %user.id, "user registered and signed in");

        Ok(Redirect::home(SessionChange::Established(session)))
    }

    /// Sign in with email and password.
    #[instrument(skip_all, fields(email = %request.email))]
    pub async fn login(
        &self,
        request: LoginRequest,
        return_url: Option<&str>,
    ) -> Result<Redirect, ErrorReport> {
        validation::validate_login(&request)?;

        let result = self
            .sign_in
            .password_sign_in(
                request.email.trim(),
                &request.password,
                request.remember_me,
                self.lockout_on_failure,
            )
            .await;

        match result {
            SignInResult::Succeeded(session) => {
                tracing::info!(user_id = %session.user_id, "user logged in");
                let target = match return_url {
                    Some(url) if validation::is_local_url(url) => RedirectTarget::Local(url.to_string()),
                    Some(url) => {
                        tracing::warn!(return_url = url, "ignoring non-local return url");
                        RedirectTarget::home_index()
                    },
                    None => RedirectTarget::home_index(),
                };
                Ok(Redirect {
                    target,
                    session: SessionChange::Established(session),
                })
            },
            SignInResult::LockedOut => {
                tracing::warn!("login refused, account locked out");
                Err(ErrorReport::generic(ACCOUNT_LOCKED_OUT))
            },
            SignInResult::Failed => {
                tracing::info!("invalid login attempt");
                Err(ErrorReport::generic(INVALID_LOGIN_ATTEMPT))
            },
        }
    }

    /// Close the current session, if any.
    #[instrument(skip_all)]
    pub async fn logout(&self, session_token: Option<String>) -> Redirect {
        self.sign_in.sign_out(session_token).await;
        counter!(LOGOUT).increment(1);
        tracing::info!("user logged out");
        Redirect::home(SessionChange::Cleared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::sign_in::MockSignInManager;
    use crate::auth::user_manager::MockUserManager;
    use crate::auth::{IdentityError, User};
    use crate::validation::{CONFIRM_PASSWORD_FIELD, EMAIL_FIELD};
    use mockall::predicate::eq;
    use std::time::{Duration, SystemTime};

    fn session_for(user: &User) -> Session {
        let now = SystemTime::now();
        Session {
            token: "token".to_string(),
            user_id: user.id,
            email: user.email.clone(),
            roles: user.roles.clone(),
            persistent: false,
            created_at: now,
            expires_at: now + Duration::from_secs(60),
        }
    }

    /// Collaborators that succeed at everything
    fn happy_mocks() -> (MockUserManager, MockSignInManager) {
        let mut users = MockUserManager::new();
        users
            .expect_create_user()
            .returning(|new_user, _| Ok(User::new(new_user.email, "hash")));

        let mut sign_in = MockSignInManager::new();
        sign_in
            .expect_password_sign_in()
            .returning(|email, _, _, _| SignInResult::Succeeded(session_for(&User::new(email, "hash"))));
        sign_in
            .expect_sign_in()
            .returning(|user, _| session_for(user));
        sign_in.expect_sign_out().returning(|_| ());
        (users, sign_in)
    }

    fn controller(users: MockUserManager, sign_in: MockSignInManager) -> AccountController {
        AccountController::new(Arc::new(users), Arc::new(sign_in))
    }

    fn registration(email: &str, password: &str, confirm: &str) -> RegistrationRequest {
        RegistrationRequest {
            email: email.to_string(),
            password: password.to_string(),
            confirm_password: confirm.to_string(),
        }
    }

    fn login(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn register_valid_model_redirects_to_index() {
        let mut users = MockUserManager::new();
        users
            .expect_create_user()
            .withf(|new_user, password| new_user.email == "test@example.com" && password == "Test123!")
            .times(1)
            .returning(|new_user, _| Ok(User::new(new_user.email, "hash")));

        let mut sign_in = MockSignInManager::new();
        sign_in
            .expect_sign_in()
            .withf(|user, persistent| user.email == "test@example.com" && !persistent)
            .times(1)
            .returning(|user, _| session_for(user));

        let result = controller(users, sign_in)
            .register(registration("test@example.com", "Test123!", "Test123!"))
            .await
            .unwrap();

        assert_eq!(result.target.action_name(), Some("Index"));
        assert_eq!(result.target.location(), "/");
        assert!(matches!(result.session, SessionChange::Established(_)));
    }

    #[tokio::test]
    async fn register_invalid_model_returns_error_report() {
        let mut users = MockUserManager::new();
        users.expect_create_user().never();
        let mut sign_in = MockSignInManager::new();
        sign_in.expect_sign_in().never();

        let report = controller(users, sign_in)
            .register(registration("invalid-email", "Test123!", "Test123!"))
            .await
            .unwrap_err();

        assert!(report.contains_key(EMAIL_FIELD));
    }

    #[tokio::test]
    async fn register_mismatched_confirmation_makes_no_calls() {
        let mut users = MockUserManager::new();
        users.expect_create_user().never();
        let mut sign_in = MockSignInManager::new();
        sign_in.expect_sign_in().never();

        let report = controller(users, sign_in)
            .register(registration("test@example.com", "Test123!", "Test123?"))
            .await
            .unwrap_err();

        assert!(report.contains_key(CONFIRM_PASSWORD_FIELD));
    }

    #[tokio::test]
    async fn register_creation_failure_adds_generic_errors() {
        let mut users = MockUserManager::new();
        users.expect_create_user().times(1).returning(|new_user, _| {
            Err(vec![
                IdentityError::duplicate_user_name(&new_user.email),
                IdentityError::password_requires_non_alphanumeric(),
            ])
        });
        let mut sign_in = MockSignInManager::new();
        sign_in.expect_sign_in().never();

        let report = controller(users, sign_in)
            .register(registration("test@example.com", "Test1234", "Test1234"))
            .await
            .unwrap_err();

        assert_eq!(report.len(), 1);
        assert_eq!(
            report.get(GENERIC_KEY).unwrap(),
            [
                "Username 'test@example.com' is already taken.",
                "Passwords must have at least one non alphanumeric character.",
            ]
        );
    }

    #[tokio::test]
    async fn login_valid_credentials_redirects_to_index() {
        let (users, mut sign_in) = happy_mocks();
        sign_in.checkpoint();
        sign_in
            .expect_password_sign_in()
            .with(eq("test@example.com"), eq("Test123!"), eq(false), eq(false))
            .times(1)
            .returning(|email, _, _, _| SignInResult::Succeeded(session_for(&User::new(email, "hash"))));

        let result = controller(users, sign_in)
            .login(login("test@example.com", "Test123!"), None)
            .await
            .unwrap();

        assert_eq!(result.target.action_name(), Some("Index"));
        assert!(matches!(result.session, SessionChange::Established(_)));
    }

    #[tokio::test]
    async fn login_invalid_credentials_returns_generic_error() {
        let users = MockUserManager::new();
        let mut sign_in = MockSignInManager::new();
        sign_in
            .expect_password_sign_in()
            .times(1)
            .returning(|_, _, _, _| SignInResult::Failed);

        let report = controller(users, sign_in)
            .login(login("test@example.com", "InvalidPassword"), None)
            .await
            .unwrap_err();

        assert_eq!(report.len(), 1);
        assert_eq!(report.get(GENERIC_KEY).unwrap(), [INVALID_LOGIN_ATTEMPT]);
    }

    #[tokio::test]
    async fn login_locked_out_reports_lockout() {
        let users = MockUserManager::new();
        let mut sign_in = MockSignInManager::new();
        sign_in
            .expect_password_sign_in()
            .with(eq("test@example.com"), eq("Test123!"), eq(false), eq(true))
            .times(1)
            .returning(|_, _, _, _| SignInResult::LockedOut);

        let report = AccountController::new(Arc::new(users), Arc::new(sign_in))
            .with_lockout_on_failure(true)
            .login(login("test@example.com", "Test123!"), None)
            .await
            .unwrap_err();

        assert_eq!(report.get(GENERIC_KEY).unwrap(), [ACCOUNT_LOCKED_OUT]);
    }

    #[tokio::test]
    async fn login_invalid_model_skips_sign_in() {
        let users = MockUserManager::new();
        let mut sign_in = MockSignInManager::new();
        sign_in.expect_password_sign_in().never();

        let report = controller(users, sign_in)
            .login(login("invalid-email", ""), None)
            .await
            .unwrap_err();

        assert!(report.contains_key(EMAIL_FIELD));
        assert!(!report.contains_key(GENERIC_KEY));
    }

    #[tokio::test]
    async fn login_honours_local_return_url_only() {
        let (users, sign_in) = happy_mocks();
        let controller = controller(users, sign_in);

        let local = controller
            .login(login("test@example.com", "Test123!"), Some("/Home/Chat"))
            .await
            .unwrap();
        assert_eq!(local.target, RedirectTarget::Local("/Home/Chat".to_string()));
        assert_eq!(local.target.location(), "/Home/Chat");

        let external = controller
            .login(login("test@example.com", "Test123!"), Some("https://evil.example.com/"))
            .await
            .unwrap();
        assert_eq!(external.target, RedirectTarget::home_index());

        let header_breaking = controller
            .login(login("test@example.com", "Test123!"), Some("/x\ny"))
            .await
            .unwrap();
        assert_eq!(header_breaking.target, RedirectTarget::home_index());
    }

    #[tokio::test]
    async fn login_passes_remember_me_through() {
        let users = MockUserManager::new();
        let mut sign_in = MockSignInManager::new();
        sign_in
            .expect_password_sign_in()
            .withf(|_, _, persistent, _| *persistent)
            .times(1)
            .returning(|_, _, _, _| SignInResult::Failed);

        let request = LoginRequest {
            remember_me: true,
            ..login("test@example.com", "Test123!")
        };
        assert!(controller(users, sign_in).login(request, None).await.is_err());
    }

    #[tokio::test]
    async fn logout_redirects_to_index() {
        let users = MockUserManager::new();
        let mut sign_in = MockSignInManager::new();
        sign_in
            .expect_sign_out()
            .with(eq(Some("token".to_string())))
            .times(1)
            .returning(|_| ());

        let result = controller(users, sign_in)
            .logout(Some("token".to_string()))
            .await;

        assert_eq!(result.target.action_name(), Some("Index"));
        assert_eq!(result.session, SessionChange::Cleared);
    }

    #[tokio::test]
    async fn logout_without_session_still_signs_out_once() {
        let users = MockUserManager::new();
        let mut sign_in = MockSignInManager::new();
        sign_in
            .expect_sign_out()
            .with(eq(None::<String>))
            .times(1)
            .returning(|_| ());

        let result = controller(users, sign_in).logout(None).await;
        assert_eq!(result.target, RedirectTarget::home_index());
    }
}
