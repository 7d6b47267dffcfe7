// Application-wide event bus
// Login, logout and current-user changes are broadcast to every subscriber

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

use crate::config::EventNames;
use crate::error::AuthError;
use crate::http_client::HttpResponse;
use crate::user::User;

/// Default number of events buffered per subscriber
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Details of a failed authentication attempt
#[derive(Debug, Clone, PartialEq)]
pub struct FailurePayload {
    /// Status of the error response, `None` when no response arrived
    pub status: Option<u16>,
    /// Raw error response from the server
    pub response: Option<HttpResponse>,
    pub message: String,
}

impl From<&AuthError> for FailurePayload {
    fn from(err: &AuthError) -> Self {
        Self {
            status: err.status(),
            response: err.response().cloned(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthEvent {
    /// Credentials accepted and the current user fetched; carries the token response
    Authenticated(HttpResponse),
    /// Token endpoint rejected the credentials or could not be reached
    AuthenticationFailed(FailurePayload),
    /// Session destroyed on the server
    SessionEnded,
    /// Current user fetched (`Some`) or found to be missing (`None`)
    CurrentUser(Option<User>),
}

/// Event as seen by subscribers, stamped with its configured name
#[derive(Debug, Clone)]
pub struct BroadcastEvent {
    pub name: String,
    pub event: AuthEvent,
    pub at: DateTime<Utc>,
}

/// Broadcast channel shared by the auth and user services
#[derive(Clone)]
pub struct EventBus {
    names: EventNames,
    sender: broadcast::Sender<BroadcastEvent>,
}

impl EventBus {
    pub fn new(names: EventNames, capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { names, sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BroadcastEvent> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Configured name for an event
    pub fn name_of(&self, event: &AuthEvent) -> &str {
        match event {
            AuthEvent::Authenticated(_) => &self.names.authentication_success,
            AuthEvent::AuthenticationFailed(_) => &self.names.authentication_failure,
            AuthEvent::SessionEnded => &self.names.session_end,
            AuthEvent::CurrentUser(_) => &self.names.current_user,
        }
    }

    /// Deliver an event to every current subscriber
    ///
    /// Returns the number of subscribers reached; zero is not an error.
    pub fn broadcast(&self, event: AuthEvent) -> usize {
        let name = self.name_of(&event).to_string();
        tracing::debug!(event = %name, "Broadcasting event");

        let event = BroadcastEvent {
            name,
            event,
            at: Utc::now(),
        };

        match self.sender.send(event) {
            Ok(n) => n,
            Err(broadcast::error::SendError(event)) => {
                tracing::trace!(event = %event.name, "No subscribers for event");
                0
            }
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(EventNames::default(), DEFAULT_EVENT_CAPACITY)
    }
}
