use thiserror::Error;

/// Top-level error type for the `fabricbeat-api` crate.
///
/// Covers every failure mode of the APIC client: the initial login
/// exchange, the timed re-authentication, transport, and response
/// decoding. `fabricbeat-core` decides which of these abort a fabric's
/// poll and which merely empty one class's index.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// The login exchange failed (wrong credentials, unreachable APIC,
    /// 10-second bound exceeded). Fatal for the current fabric attempt.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// The periodic re-authentication failed. The session is dead for
    /// the remainder of the poll cycle.
    #[error("Session refresh failed: {message}")]
    Refresh { message: String },

    /// A fetch was attempted on a session whose connected marker has
    /// been cleared.
    #[error("Not connected to the APIC")]
    NotConnected,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout).
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS configuration error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// Error reported by the controller itself (non-2xx status or an
    /// error record inside the `imdata` envelope).
    #[error("APIC error: {message}")]
    Api { message: String },
}

impl Error {
    /// Returns `true` if this error invalidates the session for the
    /// rest of the poll cycle (the fabric's collection must be
    /// abandoned, not retried mid-poll).
    pub fn is_session_fatal(&self) -> bool {
        matches!(
            self,
            Self::Authentication { .. } | Self::Refresh { .. } | Self::NotConnected
        )
    }

    /// Returns `true` if this is a transient transport error that a
    /// later poll cycle may not see again.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}
