//! Live endpoint addressing.

use crate::error::{ProtocolError, ProtocolResult};
use std::fmt;
use url::Url;

/// Path of the live update socket on the backend.
pub const DEFAULT_WS_PATH: &str = "/ws";

/// An opaque bearer token.
///
/// The token is never printed by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wraps a token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Wraps a token unless it is blank.
    pub fn non_empty(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            None
        } else {
            Some(Self(token))
        }
    }

    /// Returns the raw token.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Builds the socket URL for `credential`.
///
/// `http`/`https` bases are mapped to `ws`/`wss`. The token travels as the
/// `token` query parameter, so a new credential always means a new URL.
pub fn endpoint_url(base: &str, path: &str, credential: &Credential) -> ProtocolResult<Url> {
    let mut url = Url::parse(base)?;

    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(ProtocolError::InvalidEndpoint(format!(
                "unsupported scheme {:?}",
                other
            )))
        }
    };
    url.set_scheme(scheme)
        .map_err(|_| ProtocolError::InvalidEndpoint(format!("cannot use scheme {}", scheme)))?;

    let joined = format!(
        "{}/{}",
        url.path().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    url.set_path(&joined);
    url.query_pairs_mut()
        .clear()
        .append_pair("token", credential.expose());

    Ok(url)
}
