// Authentication module
// Logs users in and out and relays the outcome as events

mod service;
mod types;

pub use service::AuthService;
pub use types::{CredentialData, TokenResponse};
