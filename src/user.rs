// Current user service
// Fetches the account behind the session cookie and keeps it cached

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::{Config, Endpoint};
use crate::error::Result;
use crate::events::{AuthEvent, EventBus};
use crate::http_client::HttpClient;

/// Account returned by the current-user endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default)]
    pub href: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub surname: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub modified_at: Option<DateTime<Utc>>,

    /// Anything else the backend sends (custom data, links, ...)
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl User {
    /// Best human-readable name available
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .or(self.username.as_deref())
            .or(self.email.as_deref())
            .or(self.href.as_deref())
            .unwrap_or("unknown")
    }
}

/// Current user collaborator
pub struct UserService {
    http: HttpClient,
    config: Arc<Config>,
    events: EventBus,
    cached: RwLock<Option<User>>,
}

impl UserService {
    pub fn new(http: HttpClient, config: Arc<Config>, events: EventBus) -> Self {
        Self {
            http,
            config,
            events,
            cached: RwLock::new(None),
        }
    }

    /// Current user, fetched from the backend unless already cached
    pub async fn get(&self) -> Result<User> {
        if let Some(user) = self.cached.read().await.as_ref() {
            tracing::debug!("Returning cached current user");
            return Ok(user.clone());
        }
        self.refresh().await
    }

    /// Fetch the current user, bypassing the cache
    pub async fn refresh(&self) -> Result<User> {
        let url = self.config.get_url(Endpoint::CurrentUser)?;

        let result = match self.http.execute(self.http.get(url)).await {
            Ok(response) => response.json::<User>(),
            Err(e) => Err(e),
        };

        match result {
            Ok(user) => {
                tracing::info!(user = %user.display_name(), "Current user fetched");
                *self.cached.write().await = Some(user.clone());
                self.events.broadcast(AuthEvent::CurrentUser(Some(user.clone())));
                Ok(user)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch current user");
                *self.cached.write().await = None;
                self.events.broadcast(AuthEvent::CurrentUser(None));
                Err(e)
            }
        }
    }

    /// Cached user without any I/O
    pub async fn current(&self) -> Option<User> {
        self.cached.read().await.clone()
    }

    /// Forget the cached user
    pub async fn clear(&self) {
        if self.cached.write().await.take().is_some() {
            tracing::debug!("Cleared cached current user");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Url;
    use serde_json::json;

    async fn service(server: &mockito::Server) -> (UserService, EventBus) {
        let config = Arc::new(Config::for_base_url(Url::parse(&server.url()).unwrap()));
        let http = HttpClient::new(&config).unwrap();
        let events = EventBus::default();
        (UserService::new(http, config, events.clone()), events)
    }

    #[test]
    fn test_user_deserialize() {
        let user: User = serde_json::from_value(json!({
            "href": "https://api.example.com/v1/accounts/42",
            "username": "alice",
            "email": "alice@example.com",
            "givenName": "Alice",
            "surname": "Liddell",
            "fullName": "Alice Liddell",
            "status": "ENABLED",
            "createdAt": "2025-01-12T10:30:00.000Z",
            "customData": {"favoriteColor": "blue"}
        }))
        .unwrap();

        assert_eq!(user.given_name.as_deref(), Some("Alice"));
        assert_eq!(user.display_name(), "Alice Liddell");
        assert_eq!(
            user.created_at.unwrap().to_rfc3339(),
            "2025-01-12T10:30:00+00:00"
        );
        assert_eq!(user.extra["customData"]["favoriteColor"], "blue");
    }

    #[test]
    fn test_display_name_fallbacks() {
        let user: User = serde_json::from_value(json!({"email": "bob@example.com"})).unwrap();
        assert_eq!(user.display_name(), "bob@example.com");

        let user: User = serde_json::from_value(json!({})).unwrap();
        assert_eq!(user.display_name(), "unknown");
    }

    #[tokio::test]
    async fn test_get_caches_user() {
        let mut server = mockito::Server::new_async().await;
        let me = server
            .mock("GET", "/me")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"username":"alice"}"#)
            .expect(1)
            .create_async()
            .await;

        let (service, events) = service(&server).await;
        let mut rx = events.subscribe();

        assert_eq!(service.get().await.unwrap().username.as_deref(), Some("alice"));
        assert_eq!(service.get().await.unwrap().username.as_deref(), Some("alice"));
        me.assert_async().await;

        let event = rx.recv().await.unwrap();
        assert_eq!(event.name, "$currentUser");
        assert!(matches!(event.event, AuthEvent::CurrentUser(Some(_))));
    }

    #[tokio::test]
    async fn test_refresh_bypasses_cache() {
        let mut server = mockito::Server::new_async().await;
        let me = server
            .mock("GET", "/me")
            .with_status(200)
            .with_body(r#"{"username":"alice"}"#)
            .expect(2)
            .create_async()
            .await;

        let (service, _events) = service(&server).await;
        service.get().await.unwrap();
        service.refresh().await.unwrap();
        me.assert_async().await;
    }

    #[tokio::test]
    async fn test_unauthorized_clears_cache() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/me")
            .with_status(401)
            .create_async()
            .await;

        let (service, events) = service(&server).await;
        let mut rx = events.subscribe();

        let err = service.get().await.unwrap_err();
        assert_eq!(err.status(), Some(401));
        assert!(service.current().await.is_none());

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event, AuthEvent::CurrentUser(None));
    }

    #[tokio::test]
    async fn test_clear() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/me")
            .with_status(200)
            .with_body(r#"{"email":"alice@example.com"}"#)
            .create_async()
            .await;

        let (service, _events) = service(&server).await;
        service.get().await.unwrap();
        assert!(service.current().await.is_some());

        service.clear().await;
        assert!(service.current().await.is_none());
    }
}
