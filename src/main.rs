use anyhow::{Context, Result};
use dialoguer::{Input, Password};
use tokio::sync::broadcast;

use session_auth::config::{Command, Config};
use session_auth::{AuthEvent, AuthService, BroadcastEvent, CredentialData, TokenResponse};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (for log level)
    let (config, command) = Config::load()?;
    config.validate()?;

    // Initialize logging with a configured level
    let log_level = config.log_level.to_lowercase();
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(base_url = %config.base_url, "Configuration loaded");

    let auth = AuthService::from_config(config)?;
    let listener = tokio::spawn(log_events(auth.subscribe()));

    let outcome = run(&auth, command).await;

    // Closing the bus ends the listener once it has drained
    drop(auth);
    listener.await.ok();

    outcome
}

async fn run(auth: &AuthService, command: Command) -> Result<()> {
    match command {
        Command::Login {
            username,
            password,
            provider,
            token,
            logout,
        } => {
            let credentials = match (provider, token) {
                (Some(provider), Some(token)) => CredentialData::provider(provider, token),
                _ => CredentialData::password(
                    prompt_username(username)?,
                    prompt_password(password)?,
                ),
            };

            let response = auth
                .authenticate(&credentials)
                .await
                .context("Login failed")?;

            if let Ok(token) = response.json::<TokenResponse>() {
                match token.expires_at(chrono::Utc::now()) {
                    Some(expires_at) => println!("Access token expires at {}", expires_at.to_rfc3339()),
                    None => println!("Access token issued"),
                }
            }

            if let Some(user) = auth.user().current().await {
                println!("Logged in as {}", user.display_name());
                if let Some(email) = &user.email {
                    println!("  Email:  {}", email);
                }
                if let Some(status) = &user.status {
                    println!("  Status: {}", status);
                }
            }

            if logout {
                auth.end_session().await.context("Logout failed")?;
                println!("Logged out");
            }
        }

        Command::Logout => {
            auth.end_session().await.context("Logout failed")?;
            println!("Logged out");
        }
    }

    Ok(())
}

fn prompt_username(username: Option<String>) -> Result<String> {
    match username {
        Some(username) => Ok(username),
        None => Input::new()
            .with_prompt("Username or email")
            .interact_text()
            .context("Failed to read username"),
    }
}

fn prompt_password(password: Option<String>) -> Result<String> {
    match password {
        Some(password) => Ok(password),
        None => Password::new()
            .with_prompt("Password")
            .interact()
            .context("Failed to read password"),
    }
}

/// Log every broadcast event until the bus closes
async fn log_events(mut rx: broadcast::Receiver<BroadcastEvent>) {
    loop {
        match rx.recv().await {
            Ok(event) => match &event.event {
                AuthEvent::Authenticated(response) => {
                    tracing::info!(event = %event.name, status = response.status, "Event")
                }
                AuthEvent::AuthenticationFailed(failure) => {
                    tracing::warn!(event = %event.name, status = ?failure.status, message = %failure.message, "Event")
                }
                AuthEvent::SessionEnded => tracing::info!(event = %event.name, "Event"),
                AuthEvent::CurrentUser(user) => tracing::info!(
                    event = %event.name,
                    user = user.as_ref().map(|u| u.display_name()).unwrap_or("none"),
                    "Event"
                ),
            },
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Event listener lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
