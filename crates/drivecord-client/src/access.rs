//! Account access: token validation and password login.
//!
//! These calls run before any drive is opened, so they carry no stored
//! credentials of their own. A token obtained here lives only as long as the
//! process; nothing is written to disk.
//!
//! | Endpoint                              | Success | Refusals               |
//! |---------------------------------------|---------|------------------------|
//! | `GET access/validateToken/<uid>/<tk>` | 200     | 404 account, 401 token |
//! | `GET access/validateUID/<uid>`        | 200     | 404 account            |
//! | `POST access/login`                   | 200     | 401/404 password       |
//! | `POST access/getToken`                | 200     | 401 password, 406 limit|

use drivecord_kernel::ApiError;
use reqwest::blocking::Client;
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use crate::constants::STATUS_TIMEOUT;
use crate::http::{Credentials, build_client, normalize_base};

/// Why the server refused to let the user in.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    #[error("there is no DriveCord account with user id {0}")]
    UnknownAccount(u64),

    #[error("invalid access token")]
    InvalidToken,

    #[error("invalid password")]
    InvalidPassword,

    #[error(
        "access token limit exceeded; log out from other clients or manage tokens via the Discord bot"
    )]
    TokenLimitExceeded,

    #[error(transparent)]
    Api(#[from] ApiError),
}

pub type AccessResult<T> = Result<T, AccessError>;

/// Unauthenticated client for the `access/` endpoints.
#[derive(Debug)]
pub struct AccessClient {
    client: Client,
    base: String,
}

impl AccessClient {
    pub fn new(base_url: &str) -> AccessResult<Self> {
        Ok(Self {
            client: build_client()?,
            base: normalize_base(base_url),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    /// Whether the API answers a plain GET on its base URL.
    pub fn is_reachable(&self) -> bool {
        self.client
            .get(&self.base)
            .timeout(STATUS_TIMEOUT)
            .send()
            .is_ok_and(|response| response.status().is_success())
    }

    /// Check a configured user id and token pair.
    pub fn validate_token(&self, credentials: &Credentials) -> AccessResult<()> {
        let endpoint = format!(
            "access/validateToken/{}/{}",
            credentials.user_id, credentials.token
        );
        let (status, body) = self.get(&endpoint, "access/validateToken")?;
        classify_access(status, body, credentials.user_id, AccessError::InvalidToken)?;
        Ok(())
    }

    /// Check that an account exists.
    pub fn validate_uid(&self, user_id: u64) -> AccessResult<()> {
        let endpoint = format!("access/validateUID/{user_id}");
        let (status, body) = self.get(&endpoint, &endpoint)?;
        classify_access(status, body, user_id, AccessError::UnknownAccount(user_id))?;
        Ok(())
    }

    /// Check a password without issuing a token.
    pub fn login(&self, user_id: u64, password: &str) -> AccessResult<()> {
        let (status, body) = self.post_password("access/login", user_id, password)?;
        match classify_access(status, body, user_id, AccessError::InvalidPassword) {
            Err(AccessError::UnknownAccount(_)) => Err(AccessError::InvalidPassword),
            other => other.map(drop),
        }
    }

    /// Issue a new access token for this process.
    pub fn get_token(&self, user_id: u64, password: &str) -> AccessResult<Credentials> {
        let (status, body) = self.post_password("access/getToken", user_id, password)?;
        let body = classify_access(status, body, user_id, AccessError::InvalidPassword)?;
        Ok(Credentials {
            user_id,
            token: token_from_body(body)?,
        })
    }

    // ========================================================================
    // Request plumbing
    // ========================================================================

    /// `label` is what gets logged, so tokens in the URL stay out of logs.
    fn get(&self, endpoint: &str, label: &str) -> AccessResult<(u16, String)> {
        debug!(endpoint = %label, "GET");
        let response = self
            .client
            .get(format!("{}{endpoint}", self.base))
            .send()
            .map_err(|e| ApiError::transport(e.to_string()))?;
        read(response)
    }

    fn post_password(
        &self,
        endpoint: &str,
        user_id: u64,
        password: &str,
    ) -> AccessResult<(u16, String)> {
        debug!(%endpoint, user_id, "POST");
        let response = self
            .client
            .post(format!("{}{endpoint}", self.base))
            .json(&json!({ "uid": user_id, "password": password }))
            .send()
            .map_err(|e| ApiError::transport(e.to_string()))?;
        read(response)
    }
}

fn read(response: reqwest::blocking::Response) -> AccessResult<(u16, String)> {
    let status = response.status().as_u16();
    let body = response
        .text()
        .map_err(|e| ApiError::transport(e.to_string()))?;
    Ok((status, body))
}

/// Map an access endpoint's status to its body or to an [`AccessError`].
///
/// A 401 means different things per endpoint, so the caller names it.
pub(crate) fn classify_access(
    status: u16,
    body: String,
    user_id: u64,
    unauthorized: AccessError,
) -> AccessResult<String> {
    match status {
        200..=299 => Ok(body),
        401 => Err(unauthorized),
        404 => Err(AccessError::UnknownAccount(user_id)),
        406 => Err(AccessError::TokenLimitExceeded),
        other => Err(ApiError::Status(other).into()),
    }
}

/// Tokens come back as plain text or as a JSON string.
pub(crate) fn token_from_body(body: String) -> AccessResult<String> {
    let token = serde_json::from_str::<String>(&body).unwrap_or(body);
    let token = token.trim();
    if token.is_empty() {
        return Err(ApiError::decode("empty access token").into());
    }
    Ok(token.to_string())
}
