//! OAuth2 authorization-code flow for obtaining an open-API access token

use crate::config::Settings;
use crate::errors::{AppError, AppResult};
use rand::Rng;
use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::debug;
use url::Url;

const SCOPES: &str = "tasks:write tasks:read";

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// Client id and secret, or the names of whichever are missing
fn client_credentials(settings: &Settings) -> AppResult<(&str, &str)> {
    let c = &settings.credentials;
    match (c.client_id.as_deref(), c.client_secret.as_deref()) {
        (Some(id), Some(secret)) => Ok((id, secret)),
        (id, secret) => {
            let mut missing = Vec::new();
            if id.is_none() {
                missing.push("TICKTICK_CLIENT_ID");
            }
            if secret.is_none() {
                missing.push("TICKTICK_CLIENT_SECRET");
            }
            Err(AppError::missing_credentials(missing))
        }
    }
}

pub fn new_state() -> String {
    let mut rng = rand::thread_rng();
    (0..16).map(|_| format!("{:02x}", rng.gen::<u8>())).collect()
}

/// URL the user opens to grant access
pub fn authorization_url(settings: &Settings, state: &str) -> AppResult<Url> {
    let (client_id, _) = client_credentials(settings)?;
    let mut url = Url::parse(&settings.host.oauth_base())?.join("authorize")?;
    url.query_pairs_mut()
        .append_pair("scope", SCOPES)
        .append_pair("client_id", client_id)
        .append_pair("state", state)
        .append_pair("redirect_uri", &settings.credentials.redirect_uri)
        .append_pair("response_type", "code");
    Ok(url)
}

/// Extract the authorization code from a pasted redirect URL or a bare code
pub fn parse_callback(input: &str, expected_state: &str) -> AppResult<String> {
    let input = input.trim();
    if input.is_empty() {
        return Err(AppError::validation("No authorization code provided."));
    }
    let Ok(url) = Url::parse(input) else {
        return Ok(input.to_string());
    };

    let param = |name: &str| {
        url.query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.to_string())
    };
    if let Some(state) = param("state") {
        if state != expected_state {
            return Err(AppError::validation(
                "State mismatch in redirect URL. Restart the authorization.",
            ));
        }
    }
    param("code").ok_or_else(|| AppError::validation("Redirect URL has no 'code' parameter."))
}

/// Exchange an authorization code for an access token
pub fn exchange_code(settings: &Settings, code: &str) -> AppResult<TokenResponse> {
    let (client_id, client_secret) = client_credentials(settings)?;
    let url = Url::parse(&settings.host.oauth_base())?.join("token")?;
    debug!(path = url.path(), "exchanging authorization code");

    let client = Client::builder()
        .timeout(settings.timeout)
        .build()
        .map_err(|e| AppError::config_with_source("Failed to create HTTP client", e))?;
    let response = client
        .post(url.clone())
        .basic_auth(client_id, Some(client_secret))
        .form(&[
            ("code", code),
            ("grant_type", "authorization_code"),
            ("scope", SCOPES),
            ("redirect_uri", settings.credentials.redirect_uri.as_str()),
        ])
        .send()?;

    let status = response.status();
    if !status.is_success() {
        return Err(AppError::HttpStatus {
            status_code: status.as_u16(),
            reason: format!(
                "token exchange rejected: {}",
                status.canonical_reason().unwrap_or("unknown status")
            ),
        });
    }
    response
        .json::<TokenResponse>()
        .map_err(|e| AppError::api_response(format!("could not decode token response: {e}")))
}
