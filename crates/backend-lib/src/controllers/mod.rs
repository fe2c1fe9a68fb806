//! Request-flow controllers. They speak in domain terms and leave
//! HTTP framing to the handlers.
pub mod account;

pub use account::{AccountController, Redirect, RedirectTarget, SessionChange};
