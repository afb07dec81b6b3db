//! OAuth2 access tokens for the Compute Engine API.
//!
//! Service-account keys go through the JWT bearer flow: a token request is
//! signed with the account's RSA key (RS256) and exchanged at the token
//! endpoint. `authorized_user` credentials (from `gcloud auth
//! application-default login`) use the refresh-token grant instead.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};

use crate::backend::types::{AccessToken, AuthorizedUser, Credentials, ServiceAccount};
use crate::error::ProviderError;

/// The Google OAuth2 token endpoint.
pub const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const COMPUTE_SCOPE: &str = "https://www.googleapis.com/auth/compute";

const TOKEN_LIFETIME_SECS: u64 = 3600;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    iss: String,
    scope: String,
    aud: String,
    exp: u64,
    iat: u64,
}

fn auth_error(stage: &str, err: impl std::fmt::Display) -> ProviderError {
    ProviderError::Auth {
        stage: stage.to_string(),
        message: err.to_string(),
    }
}

pub fn load_credentials(path: &Path) -> Result<Credentials, ProviderError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| auth_error(&format!("read credentials {}", path.display()), e))?;
    serde_json::from_str(&raw)
        .map_err(|e| auth_error(&format!("parse credentials {}", path.display()), e))
}

/// Exchange `credentials` for a bearer token scoped to Compute Engine.
pub async fn access_token(
    http: &reqwest::Client,
    credentials: &Credentials,
) -> Result<String, ProviderError> {
    match credentials {
        Credentials::ServiceAccount(sa) => {
            let jwt = signed_assertion(sa, unix_now()?)?;
            let params = [
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", jwt.as_str()),
            ];
            tracing::debug!(account = %sa.client_email, "requesting service account token");
            exchange(http, &sa.token_uri, &params).await
        }
        Credentials::AuthorizedUser(user) => {
            let AuthorizedUser {
                client_id,
                client_secret,
                refresh_token,
            } = user;
            let params = [
                ("grant_type", "refresh_token"),
                ("client_id", client_id.as_str()),
                ("client_secret", client_secret.as_str()),
                ("refresh_token", refresh_token.as_str()),
            ];
            tracing::debug!("refreshing user credentials");
            exchange(http, TOKEN_URL, &params).await
        }
    }
}

fn signed_assertion(sa: &ServiceAccount, now: u64) -> Result<String, ProviderError> {
    let claims = Claims {
        iss: sa.client_email.clone(),
        scope: COMPUTE_SCOPE.to_string(),
        aud: sa.token_uri.clone(),
        exp: now + TOKEN_LIFETIME_SECS,
        iat: now,
    };
    let mut header = Header::new(Algorithm::RS256);
    header.kid = sa.private_key_id.clone();
    let key = EncodingKey::from_rsa_pem(sa.private_key.as_bytes())
        .map_err(|e| auth_error("load service account key", e))?;
    encode(&header, &claims, &key).map_err(|e| auth_error("sign token request", e))
}

async fn exchange(
    http: &reqwest::Client,
    token_uri: &str,
    params: &[(&str, &str)],
) -> Result<String, ProviderError> {
    let response = http
        .post(token_uri)
        .form(params)
        .send()
        .await
        .map_err(|e| auth_error("request access token", e))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(auth_error(
            "request access token",
            format!("HTTP {status}: {body}"),
        ));
    }

    let token: AccessToken = response
        .json()
        .await
        .map_err(|e| auth_error("parse access token", e))?;
    Ok(token.access_token)
}

fn unix_now() -> Result<u64, ProviderError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|e| auth_error("read system clock", e))
}
