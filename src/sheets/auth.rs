//! Service-account authentication for the Sheets API.

use anyhow::{Context, Result, bail};
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/spreadsheets",
    "https://www.googleapis.com/auth/drive",
];

pub const REQUIRED_FIELDS: &[&str] = &[
    "type",
    "project_id",
    "private_key_id",
    "private_key",
    "client_email",
];

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const TOKEN_LIFETIME_SECS: i64 = 3600;

/// How the client gets its bearer token.
#[derive(Clone)]
pub enum SheetsAuth {
    ServiceAccount(PathBuf),
    Token(String),
}

impl fmt::Debug for SheetsAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetsAuth::ServiceAccount(path) => {
                f.debug_tuple("ServiceAccount").field(path).finish()
            }
            SheetsAuth::Token(_) => f.debug_tuple("Token").field(&"***").finish(),
        }
    }
}

impl SheetsAuth {
    pub async fn access_token(&self, http: &reqwest::Client) -> Result<String> {
        match self {
            SheetsAuth::Token(token) => {
                debug!("using the configured access token");
                Ok(token.clone())
            }
            SheetsAuth::ServiceAccount(path) => {
                let key = ServiceAccountKey::load(path)?;
                Ok(key.exchange(http).await?.access_token)
            }
        }
    }
}

#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(rename = "type")]
    pub key_type: String,
    pub project_id: String,
    pub private_key_id: String,
    pub private_key: String,
    pub client_email: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: String,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

impl ServiceAccountKey {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            bail!("Credentials file not found: {}", path.display());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Unable to read credentials file: {}", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("Invalid credentials file: {}", path.display()))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(content).context("not valid JSON")?;

        let missing = missing_fields(&value);
        if !missing.is_empty() {
            bail!("missing required field(s): {}", missing.join(", "));
        }

        Ok(serde_json::from_value(value)?)
    }

    /// Signed RS256 assertion for the JWT bearer grant, valid for an hour
    /// from `issued_at` (seconds since the epoch).
    pub fn assertion(&self, issued_at: i64) -> Result<String> {
        let claims = Claims {
            iss: &self.client_email,
            scope: SCOPES.join(" "),
            aud: &self.token_uri,
            iat: issued_at,
            exp: issued_at + TOKEN_LIFETIME_SECS,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.private_key_id.clone());

        let key = EncodingKey::from_rsa_pem(self.private_key.as_bytes())
            .context("private_key is not a valid RSA PEM key")?;
        jsonwebtoken::encode(&header, &claims, &key).context("failed to sign the token request")
    }

    pub async fn exchange(&self, http: &reqwest::Client) -> Result<AccessToken> {
        info!(client_email = %self.client_email, "requesting a Sheets access token");

        let assertion = self.assertion(Utc::now().timestamp())?;
        let response = http
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .with_context(|| format!("token request to {} failed", self.token_uri))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("token endpoint returned HTTP {status}: {body}");
        }

        let token: AccessToken = response
            .json()
            .await
            .context("Failed to parse the token response")?;
        debug!(expires_in = ?token.expires_in, "access token received");
        Ok(token)
    }
}

/// Required key fields absent from `value`.
pub fn missing_fields(value: &Value) -> Vec<&'static str> {
    REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|field| value.get(field).is_none())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TEST_KEY: &str = include_str!("../../tests/fixtures/test-key.pem");

    fn key_json(token_uri: &str) -> String {
        json!({
            "type": "service_account",
            "project_id": "ranking",
            "private_key_id": "kid-1",
            "private_key": TEST_KEY,
            "client_email": "sync@ranking.iam.gserviceaccount.com",
            "token_uri": token_uri,
        })
        .to_string()
    }

    #[test]
    fn reports_every_missing_field() {
        let err = ServiceAccountKey::from_json(r#"{"type": "service_account", "project_id": "p"}"#)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "missing required field(s): private_key_id, private_key, client_email"
        );
    }

    #[test]
    fn token_uri_defaults_to_google() {
        let mut value: Value = serde_json::from_str(&key_json("x")).unwrap();
        value.as_object_mut().unwrap().remove("token_uri");
        let key = ServiceAccountKey::from_json(&value.to_string()).unwrap();
        assert_eq!(key.token_uri, DEFAULT_TOKEN_URI);
    }

    #[test]
    fn assertion_is_an_rs256_jwt_with_the_key_id() {
        let key = ServiceAccountKey::from_json(&key_json(DEFAULT_TOKEN_URI)).unwrap();
        let jwt = key.assertion(1_700_000_000).unwrap();

        assert_eq!(jwt.split('.').count(), 3);
        let header = jsonwebtoken::decode_header(&jwt).unwrap();
        assert_eq!(header.alg, Algorithm::RS256);
        assert_eq!(header.kid.as_deref(), Some("kid-1"));
    }

    #[test]
    fn debug_output_hides_secrets() {
        let key = ServiceAccountKey::from_json(&key_json(DEFAULT_TOKEN_URI)).unwrap();
        assert!(!format!("{key:?}").contains("PRIVATE KEY"));
        assert!(!format!("{:?}", SheetsAuth::Token("ya29.secret".into())).contains("ya29"));
    }

    #[tokio::test]
    async fn exchanges_the_assertion_for_a_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "ya29.test",
                "expires_in": 3599,
                "token_type": "Bearer",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("key.json");
        std::fs::write(&path, key_json(&format!("{}/token", server.uri()))).unwrap();

        let token = SheetsAuth::ServiceAccount(path)
            .access_token(&reqwest::Client::new())
            .await
            .unwrap();
        assert_eq!(token, "ya29.test");
    }

    #[tokio::test]
    async fn rejected_exchange_carries_the_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_string("invalid_grant"))
            .mount(&server)
            .await;

        let key = ServiceAccountKey::from_json(&key_json(&format!("{}/token", server.uri()))).unwrap();
        let err = key.exchange(&reqwest::Client::new()).await.unwrap_err();
        assert!(err.to_string().contains("400"));
        assert!(err.to_string().contains("invalid_grant"));
    }

    #[test]
    fn missing_file_is_reported() {
        let err = ServiceAccountKey::load(Path::new("/nonexistent/key.json")).unwrap_err();
        assert!(err.to_string().contains("Credentials file not found"));
    }
}
