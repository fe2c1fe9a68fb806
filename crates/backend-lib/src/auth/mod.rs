// ============================
// crates/backend-lib/src/auth/mod.rs
// ============================
//! Authentication module: identity records, password handling, sessions,
//! and the user/sign-in management collaborators.

pub mod lockout;
pub mod password;
pub mod session;
pub mod sign_in;
pub mod token_generator;
pub mod user;
pub mod user_manager;

pub use lockout::LockoutTracker;
pub use password::{hash_password, validate_password_strength, verify_password};
pub use session::{Session, SessionManager};
pub use sign_in::{DefaultSignInManager, SignInManager, SignInResult};
pub use user::{IdentityError, NewUser, User, ADMIN_ROLE};
pub use user_manager::{InMemoryUserManager, UserManager};
