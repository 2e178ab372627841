// APIC session lifecycle
//
// Cookie-based login, elapsed-time re-authentication, and teardown.
// The login endpoint sets the `APIC-cookie` session cookie in the
// client's jar; every subsequent request carries it automatically.
// Tokens age out server-side, so the fetch layer calls `ensure_fresh`
// before every read.

use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tracing::{debug, warn};
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// Bound on the login exchange itself.
const LOGIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Session age at which the token is re-issued before the next read.
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(90);

/// One authenticated channel to one APIC.
///
/// Construct with [`login`](Self::login); the constructor performs the
/// authentication exchange, so a session either exists and is usable
/// or was never created — there is no half-connected state.
pub struct ApicSession {
    http: reqwest::Client,
    base_url: Url,
    username: String,
    password: SecretString,
    refresh_interval: Duration,
    /// When the token was last (re)issued.
    refresh_epoch: RwLock<Instant>,
    connected: AtomicBool,
}

impl ApicSession {
    /// Authenticate against the controller at `address` and return a
    /// live session. A bare address gets an `https://` scheme; an
    /// explicit scheme (or port) is honored as given.
    ///
    /// `POST /api/aaaLogin.json` with the `aaaUser` payload, bounded to
    /// 10 seconds. The returned token cookie lives in the client's
    /// cookie jar (one is created if the transport config lacks one).
    pub async fn login(
        address: &str,
        username: &str,
        password: SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let base_url = if address.contains("://") {
            Url::parse(address)?
        } else {
            Url::parse(&format!("https://{address}/"))?
        };

        let config = if transport.cookie_jar.is_some() {
            transport.clone()
        } else {
            transport.clone().with_cookie_jar()
        };
        let http = config.build_client()?;

        let session = Self {
            http,
            base_url,
            username: username.to_owned(),
            password,
            refresh_interval: REFRESH_INTERVAL,
            refresh_epoch: RwLock::new(Instant::now()),
            connected: AtomicBool::new(false),
        };
        session.authenticate().await?;
        Ok(session)
    }

    /// Override the re-authentication threshold (defaults to 90 s).
    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    /// The controller base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Whether the session is still usable for reads.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    /// Re-authenticate if the token's age has reached the refresh
    /// threshold. The fetch layer calls this before every read, which
    /// is what gives the happens-before guarantee — callers outside
    /// the fetch layer never need to.
    ///
    /// A refresh failure clears the connected marker: the rest of this
    /// poll cycle is invalid for this fabric and must not be retried
    /// mid-poll.
    pub async fn ensure_fresh(&self) -> Result<(), Error> {
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }

        let age = self
            .refresh_epoch
            .read()
            .expect("refresh epoch lock poisoned")
            .elapsed();
        if !needs_refresh(age, self.refresh_interval) {
            return Ok(());
        }

        debug!(age_secs = age.as_secs(), "session token aged out, re-authenticating");
        self.authenticate().await.map_err(|e| {
            self.connected.store(false, Ordering::Relaxed);
            Error::Refresh {
                message: e.to_string(),
            }
        })
    }

    /// Release the session. Best-effort `POST /api/aaaLogout.json`;
    /// idempotent and never errors.
    pub async fn close(&self) {
        if !self.connected.swap(false, Ordering::Relaxed) {
            return;
        }
        let Ok(url) = self.base_url.join("api/aaaLogout.json") else {
            return;
        };
        let body = json!({ "aaaUser": { "attributes": { "name": self.username } } });
        if let Err(err) = self.http.post(url).json(&body).send().await {
            debug!("logout failed (ignored): {err}");
        }
    }

    /// The underlying HTTP client (used by the fetch layer).
    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// One authentication exchange. On success the refresh epoch is
    /// reset and the connected marker set; on failure neither changes.
    async fn authenticate(&self) -> Result<(), Error> {
        let url = self.base_url.join("api/aaaLogin.json")?;
        debug!("logging in at {url}");

        let body = json!({
            "aaaUser": {
                "attributes": {
                    "name": self.username,
                    "pwd": self.password.expose_secret(),
                }
            }
        });

        let resp = self
            .http
            .post(url)
            .timeout(LOGIN_TIMEOUT)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Authentication {
                message: format!("login exchange failed: {e}"),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!("login rejected with HTTP {status}");
            return Err(Error::Authentication {
                message: format!("login failed (HTTP {status}): {body}"),
            });
        }

        *self
            .refresh_epoch
            .write()
            .expect("refresh epoch lock poisoned") = Instant::now();
        self.connected.store(true, Ordering::Relaxed);

        debug!("login successful");
        Ok(())
    }
}

/// Refresh decision: re-issue once the token's age reaches the
/// threshold, not before.
pub(crate) fn needs_refresh(age: Duration, interval: Duration) -> bool {
    age >= interval
}
