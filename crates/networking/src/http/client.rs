//! Bitfinex v2 REST client with HMAC-SHA384 request signing

use hmac::{Hmac, Mac};
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE},
    Client, Response, StatusCode,
};
use serde_json::Value;
use sha2::Sha384;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use swingbot_core::{Error, Result};
use tracing::{debug, error, instrument};

type HmacSha384 = Hmac<Sha384>;

/// Authenticated API host
pub const DEFAULT_BASE_URL: &str = "https://api.bitfinex.com";
/// Public (market data) API host
pub const DEFAULT_PUBLIC_URL: &str = "https://api-pub.bitfinex.com";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// API credentials for authenticated endpoints
#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
    pub api_secret: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

/// HTTP client for the Bitfinex v2 API
///
/// Signs every authenticated request with a strictly increasing
/// microsecond nonce.
pub struct BitfinexClient {
    http: Client,
    base_url: String,
    public_url: String,
    credentials: Credentials,
    last_nonce: AtomicI64,
}

impl BitfinexClient {
    /// Create a client against the production hosts
    pub fn new(credentials: Credentials) -> Result<Self> {
        Self::with_base_urls(credentials, DEFAULT_BASE_URL, DEFAULT_PUBLIC_URL)
    }

    /// Create a client against custom hosts (e.g. a proxy or a test server)
    pub fn with_base_urls(credentials: Credentials, base_url: &str, public_url: &str) -> Result<Self> {
        if credentials.api_key.is_empty() || credentials.api_secret.is_empty() {
            return Err(Error::AuthenticationError(
                "API key and secret are required".to_string(),
            ));
        }

        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::NetworkError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            public_url: public_url.trim_end_matches('/').to_string(),
            credentials,
            last_nonce: AtomicI64::new(0),
        })
    }

    /// Next nonce, never smaller than or equal to the previous one
    fn next_nonce(&self) -> i64 {
        let now = chrono::Utc::now().timestamp_micros();
        let mut last = self.last_nonce.load(Ordering::SeqCst);
        loop {
            let next = now.max(last + 1);
            match self
                .last_nonce
                .compare_exchange(last, next, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => return next,
                Err(current) => last = current,
            }
        }
    }

    /// Signed headers for an authenticated request on `path` (e.g. `v2/auth/r/wallets`)
    fn auth_headers(&self, path: &str, body: &str) -> Result<HeaderMap> {
        let nonce = self.next_nonce().to_string();
        let signature = sign(&self.credentials.api_secret, path, &nonce, body)?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert("bfx-nonce", header_value(&nonce)?);
        headers.insert("bfx-apikey", header_value(&self.credentials.api_key)?);
        headers.insert("bfx-signature", header_value(&signature)?);
        Ok(headers)
    }

    /// Check if response indicates authentication failure
    fn check_auth_error(response: &Response) -> Option<Error> {
        match response.status() {
            StatusCode::UNAUTHORIZED => Some(Error::AuthenticationError("API key rejected".to_string())),
            StatusCode::FORBIDDEN => Some(Error::AuthenticationError("Access forbidden".to_string())),
            _ => None,
        }
    }

    /// POST a signed request and return the decoded JSON body
    #[instrument(skip(self, body))]
    pub async fn post_auth(&self, path: &str, body: &Value) -> Result<Value> {
        let url = format!("{}/{}", self.base_url, path);
        let body = serde_json::to_string(body)?;

        debug!("POST {}", url);

        let response = self
            .http
            .post(&url)
            .headers(self.auth_headers(path, &body)?)
            .body(body)
            .send()
            .await?;

        Self::read_body(response, path).await
    }

    /// GET a public endpoint and return the decoded JSON body
    #[instrument(skip(self))]
    pub async fn get_public(&self, path: &str) -> Result<Value> {
        let url = format!("{}/{}", self.public_url, path);

        debug!("GET {}", url);

        let response = self
            .http
            .get(&url)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        Self::read_body(response, path).await
    }

    async fn read_body(response: Response, path: &str) -> Result<Value> {
        if let Some(err) = Self::check_auth_error(&response) {
            return Err(err);
        }

        let status = response.status();
        let text = response.text().await?;

        if status.is_client_error() || status.is_server_error() {
            error!("Request to {} failed: HTTP {} - {}", path, status, text);
            return Err(api_error_from_body(status, &text));
        }

        serde_json::from_str(&text).map_err(|e| {
            error!("Failed to parse response from {}: {}", path, e);
            Error::InvalidData(e.to_string())
        })
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| Error::InvalidData(format!("Invalid header value: {}", e)))
}

/// Hex HMAC-SHA384 over `/api/{path}{nonce}{body}`
pub(crate) fn sign(secret: &str, path: &str, nonce: &str, body: &str) -> Result<String> {
    let payload = format!("/api/{}{}{}", path, nonce, body);

    let mut mac = HmacSha384::new_from_slice(secret.as_bytes())
        .map_err(|e| Error::AuthenticationError(format!("Invalid API secret: {}", e)))?;
    mac.update(payload.as_bytes());

    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Map an error body (`["error", code, "message"]`) to our error type
pub(crate) fn api_error_from_body(status: StatusCode, body: &str) -> Error {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            let items = value.as_array()?;
            if items.first()?.as_str()? != "error" {
                return None;
            }
            items.get(2)?.as_str().map(str::to_string)
        })
        .unwrap_or_else(|| format!("HTTP {}: {}", status, body));

    if message.to_lowercase().contains("not found") {
        Error::OrderNotFound(message)
    } else {
        Error::ApiError(message)
    }
}
