use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};

/// Account credentials for the multiMATIC cloud.
///
/// The password never leaves the `SecretString`: it is exposed only while
/// building the token-exchange payload and is zeroized when dropped.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Smartphone/device identifier registered with the account.
    pub device_id: String,
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(
        device_id: impl Into<String>,
        username: impl Into<String>,
        password: SecretString,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            username: username.into(),
            password,
        }
    }

    /// Payload for `POST /account/authentication/v1/token/new`.
    pub(crate) fn token_request(&self) -> Value {
        json!({
            "smartphoneId": self.device_id,
            "username": self.username,
            "password": self.password.expose_secret(),
        })
    }
}

/// Identity cached after a successful token exchange.
///
/// Reused by every authorize call until a forced login discards it.
#[derive(Clone)]
pub struct AuthIdentity {
    pub device_id: String,
    pub username: String,
    pub token: SecretString,
}

impl AuthIdentity {
    /// Payload for `POST /account/authentication/v1/authenticate`.
    pub(crate) fn authorize_request(&self) -> Value {
        json!({
            "smartphoneId": self.device_id,
            "username": self.username,
            "authToken": self.token.expose_secret(),
        })
    }
}

impl std::fmt::Debug for AuthIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthIdentity")
            .field("device_id", &self.device_id)
            .field("username", &self.username)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// Session state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display)]
pub enum AuthState {
    #[default]
    Unauthenticated,
    Authenticating,
    Authenticated,
}
