//! `storefront-auth` — pure identity and access model.
//!
//! This crate is intentionally decoupled from HTTP and storage: it describes
//! who the caller is and what a protected view should do about it. Talking to
//! the identity backend and persisting the session live in `storefront-client`.

pub mod authorize;
pub mod credentials;
pub mod guard;
pub mod roles;
pub mod session;
pub mod user;

pub use authorize::{Decision, decide};
pub use credentials::{CredentialChange, MIN_PASSWORD_LEN, PasswordChangeError, PasswordChangeForm};
pub use guard::{GuardState, GuardTransitionError};
pub use roles::Role;
pub use session::{AuthToken, InvalidReason, Session, Verification};
pub use user::User;
