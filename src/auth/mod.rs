// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! OAuth access tokens for the Drive API
//!
//! A user token is provisioned out of band into `token.json` (the
//! "authorized user" format). This module only loads it, refreshes it through
//! the token endpoint once it expires, and writes the refreshed token back.

use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::AuthConfig;
use crate::{GestureDriveError, Result};

/// Environment variable holding a ready-to-use access token
pub const ACCESS_TOKEN_ENV: &str = "GESTURE_DRIVE_ACCESS_TOKEN";

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Tokens this close to expiry are refreshed early
const EXPIRY_SKEW_SECS: i64 = 60;

/// OAuth client identity
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Deserialize)]
struct ClientSecretFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

impl ClientSecrets {
    /// Load a client secret file (either `installed` or `web` application)
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let file: ClientSecretFile = serde_json::from_str(&content)?;
        file.installed.or(file.web).ok_or_else(|| {
            GestureDriveError::Auth(format!(
                "{:?} has neither an 'installed' nor a 'web' client",
                path
            ))
        })
    }
}

/// Stored user token
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct StoredToken {
    #[serde(alias = "access_token")]
    pub token: Option<String>,
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
    pub expiry: Option<DateTime<Utc>>,
}

impl StoredToken {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// A token without an expiry never expires; a missing token always has.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        if self.token.is_none() {
            return true;
        }
        match self.expiry {
            Some(expiry) => now + Duration::seconds(EXPIRY_SKEW_SECS) >= expiry,
            None => false,
        }
    }
}

#[derive(Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

/// Hands out valid access tokens, refreshing when needed
pub struct TokenProvider {
    http: Client,
    state: Mutex<StoredToken>,
    secrets: Option<ClientSecrets>,
    token_path: Option<PathBuf>,
}

impl TokenProvider {
    /// A token that is used as-is and never refreshed
    pub fn fixed(token: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            state: Mutex::new(StoredToken {
                token: Some(token.into()),
                ..StoredToken::default()
            }),
            secrets: None,
            token_path: None,
        }
    }

    pub fn new(
        http: Client,
        token: StoredToken,
        secrets: Option<ClientSecrets>,
        token_path: Option<PathBuf>,
    ) -> Self {
        Self {
            http,
            state: Mutex::new(token),
            secrets,
            token_path,
        }
    }

    /// Build from the environment override or the configured token files
    pub fn from_config(auth: &AuthConfig, http: Client) -> Result<Self> {
        if let Ok(token) = std::env::var(ACCESS_TOKEN_ENV) {
            if !token.trim().is_empty() {
                debug!("Using access token from {}", ACCESS_TOKEN_ENV);
                return Ok(Self::fixed(token.trim()));
            }
        }

        if !auth.token_file.exists() {
            return Err(GestureDriveError::Auth(format!(
                "token file {:?} not found; authorize the application first or set {}",
                auth.token_file, ACCESS_TOKEN_ENV
            )));
        }
        let token = StoredToken::load(&auth.token_file)?;

        let secrets = if auth.credentials_file.exists() {
            Some(ClientSecrets::load(&auth.credentials_file)?)
        } else {
            debug!(
                "Credentials file {:?} not found, relying on client fields in the token",
                auth.credentials_file
            );
            None
        };

        Ok(Self::new(http, token, secrets, Some(auth.token_file.clone())))
    }

    /// Current token state
    pub async fn snapshot(&self) -> StoredToken {
        self.state.lock().await.clone()
    }

    /// A valid access token, refreshed first if it has expired
    pub async fn access_token(&self) -> Result<String> {
        let mut state = self.state.lock().await;
        if state.is_expired(Utc::now()) {
            self.refresh_locked(&mut state).await?;
        }
        state
            .token
            .clone()
            .ok_or_else(|| GestureDriveError::Auth("no access token available".to_string()))
    }

    /// Refresh unconditionally
    pub async fn refresh(&self) -> Result<StoredToken> {
        let mut state = self.state.lock().await;
        self.refresh_locked(&mut state).await?;
        Ok(state.clone())
    }

    async fn refresh_locked(&self, state: &mut StoredToken) -> Result<()> {
        let refresh_token = state.refresh_token.clone().ok_or_else(|| {
            GestureDriveError::Auth("access token expired and no refresh token is stored".to_string())
        })?;

        let (client_id, client_secret, token_uri) = match self.secrets {
            Some(ref s) => (s.client_id.clone(), s.client_secret.clone(), s.token_uri.clone()),
            None => (
                state.client_id.clone().ok_or_else(|| {
                    GestureDriveError::Auth("no OAuth client id configured".to_string())
                })?,
                state.client_secret.clone().ok_or_else(|| {
                    GestureDriveError::Auth("no OAuth client secret configured".to_string())
                })?,
                state.token_uri.clone().unwrap_or_else(default_token_uri),
            ),
        };

        debug!("Refreshing access token at {}", token_uri);

        let response = self
            .http
            .post(&token_uri)
            .form(&[
                ("grant_type", "refresh_token"),
                ("client_id", client_id.as_str()),
                ("client_secret", client_secret.as_str()),
                ("refresh_token", refresh_token.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(GestureDriveError::Auth(format!(
                "token refresh failed with status {}: {}",
                status, message
            )));
        }

        let refreshed: RefreshResponse = response.json().await?;
        state.token = Some(refreshed.access_token);
        state.expiry = refreshed
            .expires_in
            .map(|secs| Utc::now() + Duration::seconds(secs));
        if let Some(rt) = refreshed.refresh_token {
            state.refresh_token = Some(rt);
        }
        if let Some(scope) = refreshed.scope {
            state.scopes = scope.split_whitespace().map(String::from).collect();
        }

        info!("Access token refreshed");

        if let Some(ref path) = self.token_path {
            if let Err(e) = state.save(path) {
                warn!("Could not persist refreshed token to {:?}: {}", path, e);
            }
        }

        Ok(())
    }
}
