//! Signed REST client shared by the spot and futures adapters.

use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::{Client, Method, RequestBuilder};
use runner_core::ExchangeError;
use serde::de::DeserializeOwned;
use sha2::Sha256;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

use super::wire::{ApiErrorBody, ServerTime};

type HmacSha256 = Hmac<Sha256>;

/// API key pair.
#[derive(Clone)]
pub struct BinanceCredentials {
    pub api_key: String,
    pub api_secret: String,
}

impl std::fmt::Debug for BinanceCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinanceCredentials")
            .field("api_key", &"***")
            .field("api_secret", &"***")
            .finish()
    }
}

impl BinanceCredentials {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    /// Read the key pair from the named environment variables.
    pub fn from_env(key_var: &str, secret_var: &str) -> Result<Self, ExchangeError> {
        let read = |name: &str| {
            std::env::var(name)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ExchangeError::Configuration(format!("{} not set", name)))
        };
        Ok(Self::new(read(key_var)?, read(secret_var)?))
    }
}

/// Connection settings common to both venues.
#[derive(Debug, Clone)]
pub struct BinanceSettings {
    pub testnet: bool,
    pub timeout: Duration,
    pub recv_window_ms: u64,
}

impl Default for BinanceSettings {
    fn default() -> Self {
        Self {
            testnet: false,
            timeout: Duration::from_secs(15),
            recv_window_ms: 5000,
        }
    }
}

/// HMAC-SHA256 hex signature of a query string.
pub(crate) fn sign(secret: &str, query: &str) -> Result<String, ExchangeError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| ExchangeError::Configuration(format!("invalid API secret: {}", e)))?;
    mac.update(query.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Join parameters into a query string. Values are symbols and decimal
/// numbers, which need no escaping.
pub(crate) fn query_string(params: &[(&str, String)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

pub(crate) struct BinanceClient {
    http: Client,
    base_url: String,
    credentials: Option<BinanceCredentials>,
    recv_window_ms: u64,
    /// Server time minus local time, in milliseconds
    time_offset_ms: AtomicI64,
}

impl BinanceClient {
    pub(crate) fn new(
        base_url: &str,
        credentials: Option<BinanceCredentials>,
        settings: &BinanceSettings,
    ) -> Result<Self, ExchangeError> {
        let http = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| ExchangeError::Configuration(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            recv_window_ms: settings.recv_window_ms,
            time_offset_ms: AtomicI64::new(0),
        })
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    fn timestamp_ms(&self) -> i64 {
        Utc::now().timestamp_millis() + self.time_offset_ms.load(Ordering::Relaxed)
    }

    /// Unsigned GET.
    pub(crate) async fn public_get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, ExchangeError> {
        let url = format!("{}{}", self.base_url, path);
        let request = self.http.get(&url).query(params);
        self.send(request, path).await
    }

    /// Signed request. Timestamp, receive window and signature are appended
    /// to `params`.
    pub(crate) async fn signed<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        mut params: Vec<(&str, String)>,
    ) -> Result<T, ExchangeError> {
        let credentials = self.credentials.as_ref().ok_or_else(|| {
            ExchangeError::Configuration("API credentials required for signed endpoints".into())
        })?;

        params.push(("recvWindow", self.recv_window_ms.to_string()));
        params.push(("timestamp", self.timestamp_ms().to_string()));
        let query = query_string(&params);
        let signature = sign(&credentials.api_secret, &query)?;

        let url = format!("{}{}?{}&signature={}", self.base_url, path, query, signature);
        let request = self
            .http
            .request(method, &url)
            .header("X-MBX-APIKEY", &credentials.api_key);
        self.send(request, path).await
    }

    /// Measure and store the server clock offset.
    pub(crate) async fn sync_time(&self, path: &str) -> Result<i64, ExchangeError> {
        let before = Utc::now().timestamp_millis();
        let server: ServerTime = self.public_get(path, &[]).await?;
        let offset = server.server_time - before;
        self.time_offset_ms.store(offset, Ordering::Relaxed);
        debug!(base = %self.base_url, offset_ms = offset, "Clock offset updated");
        Ok(offset)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        path: &str,
    ) -> Result<T, ExchangeError> {
        let resp = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ExchangeError::Timeout(format!("{}: {}", path, e))
            } else {
                ExchangeError::Connection(format!("{}: {}", path, e))
            }
        })?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| {
            if e.is_timeout() {
                ExchangeError::Timeout(format!("{}: {}", path, e))
            } else {
                ExchangeError::Connection(format!("{}: {}", path, e))
            }
        })?;

        if !status.is_success() {
            warn!(path, status = status.as_u16(), body = %body, "Binance request failed");
            return Err(api_error(status.as_u16(), &body));
        }

        serde_json::from_str(&body).map_err(|e| ExchangeError::Decode(format!("{}: {}", path, e)))
    }
}

/// Map an error response to the adapter error type.
pub(crate) fn api_error(status: u16, body: &str) -> ExchangeError {
    match serde_json::from_str::<ApiErrorBody>(body) {
        // -2014/-2015: bad key format, invalid key/IP/permissions
        Ok(err) if matches!(err.code, -2014 | -2015) || status == 401 => {
            ExchangeError::Authentication(err.msg)
        }
        Ok(err) => ExchangeError::Api {
            code: err.code,
            message: err.msg,
        },
        Err(_) => ExchangeError::Api {
            code: i64::from(status),
            message: body.chars().take(200).collect(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_matches_reference() {
        // Example request from the Binance API documentation
        let secret = "NhqPtmdSJYdKjVHjA7PZj4Mge3R5YNiP1e3UZjInClVN65XAbvqqM6A7H5fATj0j";
        let query = "symbol=LTCBTC&side=BUY&type=LIMIT&timeInForce=GTC&quantity=1&price=0.1&recvWindow=5000&timestamp=1499827319559";
        assert_eq!(
            sign(secret, query).unwrap(),
            "c8db56825ae71d6d79447849e617115f4a920fa2acdcab2b053c4b2838bd6b71"
        );
    }

    #[test]
    fn test_query_string() {
        let params = vec![("symbol", "BTCUSDT".to_string()), ("limit", "900".to_string())];
        assert_eq!(query_string(&params), "symbol=BTCUSDT&limit=900");
    }

    #[test]
    fn test_api_error_mapping() {
        let err = api_error(400, r#"{"code":-2010,"msg":"Account has insufficient balance"}"#);
        assert_eq!(
            err,
            ExchangeError::Api {
                code: -2010,
                message: "Account has insufficient balance".into()
            }
        );

        let auth = api_error(401, r#"{"code":-2015,"msg":"Invalid API-key"}"#);
        assert!(matches!(auth, ExchangeError::Authentication(_)));

        let html = api_error(502, "<html>bad gateway</html>");
        assert!(matches!(html, ExchangeError::Api { code: 502, .. }));
    }

    #[test]
    fn test_credentials_debug_redacted() {
        let creds = BinanceCredentials::new("key", "secret");
        let shown = format!("{:?}", creds);
        assert!(!shown.contains("\"secret\""));
        assert!(shown.contains("***"));
    }
}
