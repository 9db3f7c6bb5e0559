//! OAuth2 access tokens for the FCM v1 API.
//!
//! Production uses a Google service account: an RS256 JWT assertion is
//! exchanged at the account's `token_uri` and the resulting token is cached
//! until shortly before it expires.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::GatewayError;

const FCM_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Refresh this long before the cached token expires.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// The fields of a service-account JSON key file that the exchange needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    pub fn from_file(path: &str) -> Result<Self, GatewayError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| GatewayError::Auth(format!("cannot read {path}: {e}")))?;
        serde_json::from_str(&raw)
            .map_err(|e| GatewayError::Auth(format!("invalid service account file {path}: {e}")))
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

/// Source of bearer tokens for FCM requests.
pub struct AccessTokenProvider {
    source: TokenSource,
}

enum TokenSource {
    /// A pre-issued token, used as is (emulators, tests)
    Static(String),
    ServiceAccount {
        key: ServiceAccountKey,
        encoding_key: EncodingKey,
        client: reqwest::Client,
        cached: Mutex<Option<CachedToken>>,
    },
}

impl AccessTokenProvider {
    pub fn fixed(token: impl Into<String>) -> Self {
        Self {
            source: TokenSource::Static(token.into()),
        }
    }

    pub fn service_account(
        key: ServiceAccountKey,
        client: reqwest::Client,
    ) -> Result<Self, GatewayError> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| GatewayError::Auth(format!("invalid private key: {e}")))?;

        Ok(Self {
            source: TokenSource::ServiceAccount {
                key,
                encoding_key,
                client,
                cached: Mutex::new(None),
            },
        })
    }

    /// A bearer token valid for at least [`EXPIRY_MARGIN_SECS`].
    pub async fn access_token(&self) -> Result<String, GatewayError> {
        match &self.source {
            TokenSource::Static(token) => Ok(token.clone()),
            TokenSource::ServiceAccount {
                key,
                encoding_key,
                client,
                cached,
            } => {
                // Held across the exchange so concurrent callers share one refresh
                let mut cached = cached.lock().await;
                let now = Utc::now();

                if let Some(token) = cached.as_ref()
                    && token.expires_at - Duration::seconds(EXPIRY_MARGIN_SECS) > now
                {
                    return Ok(token.token.clone());
                }

                let fresh = exchange(key, encoding_key, client, now).await?;
                tracing::debug!(
                    client_email = %key.client_email,
                    expires_at = %fresh.expires_at,
                    "Obtained FCM access token"
                );
                let token = fresh.token.clone();
                *cached = Some(fresh);
                Ok(token)
            }
        }
    }
}

async fn exchange(
    key: &ServiceAccountKey,
    encoding_key: &EncodingKey,
    client: &reqwest::Client,
    now: DateTime<Utc>,
) -> Result<CachedToken, GatewayError> {
    let iat = now.timestamp();
    let claims = AssertionClaims {
        iss: &key.client_email,
        scope: FCM_SCOPE,
        aud: &key.token_uri,
        iat,
        exp: iat + ASSERTION_LIFETIME_SECS,
    };
    let assertion = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, encoding_key)
        .map_err(|e| GatewayError::Auth(format!("cannot sign assertion: {e}")))?;

    let response = client
        .post(&key.token_uri)
        .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(GatewayError::Auth(format!(
            "token exchange failed with {status}: {body}"
        )));
    }

    let token: TokenResponse = response
        .json()
        .await
        .map_err(|e| GatewayError::InvalidResponse(format!("token response: {e}")))?;

    Ok(CachedToken {
        token: token.access_token,
        expires_at: now + Duration::seconds(token.expires_in),
    })
}
