//! `storefront-client`
//!
//! **Responsibility:** everything in the identity core that touches IO.
//!
//! This crate provides:
//! - Durable session storage (file and in-memory)
//! - The identity client (register, login, logout, verify, change-password)
//! - The access guard and per-mount view controllers
//! - Bearer-authenticated calls to the content backend
//!
//! The backend remains the authority: the cached session is used for
//! optimistic display only, and every protected mount revalidates it.

pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod guard;
pub mod identity;
pub mod offline;
pub mod session_store;
pub mod transport;
pub mod views;

pub use api::{ApiError, AuthenticatedApi};
pub use app::AppState;
pub use config::{ClientConfig, ConfigError};
pub use error::IdentityError;
pub use guard::AccessGuard;
pub use identity::IdentityClient;
pub use offline::{ConnectivityState, OfflineMode};
pub use session_store::{FileSessionStore, MemorySessionStore, SessionStore, SessionStoreError};
pub use transport::{
    Action, BackendResponse, HttpEndpoint, HttpIdentityBackend, IdentityBackend, TransportError,
};
pub use views::{Navigation, ProtectedView, ViewController};
