use std::sync::Arc;
use tokio::sync::broadcast;

use super::types::CredentialData;
use crate::config::{Config, Endpoint};
use crate::error::Result;
use crate::events::{AuthEvent, BroadcastEvent, EventBus, FailurePayload, DEFAULT_EVENT_CAPACITY};
use crate::form;
use crate::http_client::{HttpClient, HttpResponse};
use crate::user::UserService;

/// Authentication service
/// Logs the user in and out and tells the rest of the application about it
pub struct AuthService {
    /// Endpoint URLs
    config: Arc<Config>,

    /// Cookie-carrying HTTP client shared with the user service
    http: HttpClient,

    /// Current user collaborator
    user: Arc<UserService>,

    /// Application-wide event bus
    events: EventBus,
}

impl AuthService {
    pub fn new(
        config: Arc<Config>,
        http: HttpClient,
        user: Arc<UserService>,
        events: EventBus,
    ) -> Self {
        Self {
            config,
            http,
            user,
            events,
        }
    }

    /// Wire up the HTTP client, event bus and user service from configuration
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let config = Arc::new(config);
        let http = HttpClient::new(&config)?;
        let events = EventBus::new(config.events.clone(), DEFAULT_EVENT_CAPACITY);
        let user = Arc::new(UserService::new(
            http.clone(),
            Arc::clone(&config),
            events.clone(),
        ));

        Ok(Self::new(config, http, user, events))
    }

    /// Log the user in
    ///
    /// Posts the form-encoded credentials with `grant_type=password`. On
    /// success the current user is fetched before the authenticated event is
    /// broadcast and the token endpoint's response returned. When the token
    /// endpoint fails, a failure event carrying the error is broadcast and the
    /// same error returned.
    pub async fn authenticate(&self, credentials: &CredentialData) -> Result<HttpResponse> {
        tracing::info!(credentials = credentials.kind(), "Authenticating");

        let response = match self.post_credentials(credentials).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "Authentication failed");
                self.events
                    .broadcast(AuthEvent::AuthenticationFailed(FailurePayload::from(&e)));
                return Err(e);
            }
        };

        // A user fetch failure is reported by the user service's own event
        let user = self.user.refresh().await?;

        tracing::info!(user = %user.display_name(), "Authentication successful");
        self.events.broadcast(AuthEvent::Authenticated(response.clone()));

        Ok(response)
    }

    async fn post_credentials(&self, credentials: &CredentialData) -> Result<HttpResponse> {
        let url = self.config.get_url(Endpoint::Authentication)?;

        let request = self.http.post(url).query(&[("grant_type", "password")]);
        let request = form::form_post(request, &credentials.to_form_value())?;

        self.http.execute(request).await
    }

    /// Log the user out
    ///
    /// Calls the destroy-session endpoint. Only a successful call clears the
    /// cached user and broadcasts the session-end event.
    pub async fn end_session(&self) -> Result<()> {
        let url = self.config.get_url(Endpoint::DestroySession)?;

        if let Err(e) = self.http.execute(self.http.get(url)).await {
            tracing::warn!(error = %e, "Failed to end session");
            return Err(e);
        }

        self.user.clear().await;
        self.events.broadcast(AuthEvent::SessionEnded);
        tracing::info!("Session ended");

        Ok(())
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BroadcastEvent> {
        self.events.subscribe()
    }

    pub fn user(&self) -> &Arc<UserService> {
        &self.user
    }
}
