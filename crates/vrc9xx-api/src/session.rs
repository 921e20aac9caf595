// Session manager
//
// Owns the transport and the authentication state machine. Performs the
// two-step login handshake (token exchange, then authorize), serializes
// concurrent logins and invalidates the session when an authenticated call
// comes back with 401.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwap;
use secrecy::SecretString;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::auth::{AuthIdentity, AuthState, Credentials};
use crate::error::Error;
use crate::query_log::QueryLog;
use crate::request::ApiRequest;
use crate::transport::{Transport, TransportConfig};

/// Authenticated access to the API.
///
/// Cheap to share behind an `Arc`; every method takes `&self`.
pub struct Session {
    credentials: Credentials,
    config: TransportConfig,
    query_log: Option<Arc<QueryLog>>,
    transport: ArcSwap<Transport>,
    identity: Mutex<Option<AuthIdentity>>,
    state: watch::Sender<AuthState>,
    login_lock: tokio::sync::Mutex<()>,
    /// Bumped on every successful login.
    generation: AtomicU64,
    /// Bumped on every login attempt; waiters compare it to detect that an
    /// attempt ran while they were queued.
    attempts: AtomicU64,
    last_failure: Mutex<Option<String>>,
}

impl Session {
    pub fn new(
        credentials: Credentials,
        config: TransportConfig,
        query_log: Option<Arc<QueryLog>>,
    ) -> Result<Self, Error> {
        let transport = Transport::new(&config)?.with_query_log(query_log.clone());
        let (state, _) = watch::channel(AuthState::Unauthenticated);
        Ok(Self {
            credentials,
            config,
            query_log,
            transport: ArcSwap::from_pointee(transport),
            identity: Mutex::new(None),
            state,
            login_lock: tokio::sync::Mutex::new(()),
            generation: AtomicU64::new(0),
            attempts: AtomicU64::new(0),
            last_failure: Mutex::new(None),
        })
    }

    pub fn state(&self) -> AuthState {
        *self.state.borrow()
    }

    /// Subscribe to state transitions.
    pub fn state_changes(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    /// The transport currently in use.
    pub fn transport(&self) -> Arc<Transport> {
        self.transport.load_full()
    }

    pub fn username(&self) -> &str {
        &self.credentials.username
    }

    /// Log in, optionally discarding the cached identity and cookies first.
    ///
    /// If another caller's login attempt completed while this one waited
    /// for the lock, its outcome is reused unless `force` is set.
    pub async fn log_in(&self, force: bool) -> Result<(), Error> {
        let seen = self.attempts.load(Ordering::Acquire);
        let _guard = self.login_lock.lock().await;
        if !force && self.attempts.load(Ordering::Acquire) != seen {
            self.reuse_failure()?;
            if self.state() == AuthState::Authenticated {
                return Ok(());
            }
        }
        self.log_in_locked(force).await
    }

    /// Make sure the session is authenticated, forcing a fresh login if not.
    pub async fn ensure_authenticated(&self) -> Result<(), Error> {
        if self.state() == AuthState::Authenticated {
            return Ok(());
        }
        let seen = self.attempts.load(Ordering::Acquire);
        let _guard = self.login_lock.lock().await;
        if self.attempts.load(Ordering::Acquire) != seen {
            self.reuse_failure()?;
        }
        if self.state() == AuthState::Authenticated {
            return Ok(());
        }
        self.log_in_locked(true).await
    }

    /// Execute a request on the authenticated session.
    ///
    /// A 401 marks the session unauthenticated (unless a newer login has
    /// happened since this call started) and is returned to the caller.
    pub async fn query(&self, request: &ApiRequest) -> Result<Value, Error> {
        if !request.unauthenticated {
            self.ensure_authenticated().await?;
        }
        let generation = self.generation.load(Ordering::Acquire);
        let transport = self.transport.load_full();

        match transport.execute(request).await {
            Err(e) if e.is_auth_expired() && !request.unauthenticated => {
                self.invalidate(generation);
                Err(e)
            }
            other => other,
        }
    }

    // ── Internals ───────────────────────────────────────────────────

    async fn log_in_locked(&self, force: bool) -> Result<(), Error> {
        self.attempts.fetch_add(1, Ordering::AcqRel);
        self.state.send_replace(AuthState::Authenticating);

        match self.handshake(force).await {
            Ok(()) => {
                self.generation.fetch_add(1, Ordering::AcqRel);
                *self
                    .last_failure
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner) = None;
                self.state.send_replace(AuthState::Authenticated);
                info!(username = %self.credentials.username, "logged in");
                Ok(())
            }
            Err(e) => {
                *self
                    .last_failure
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner) = Some(e.to_string());
                self.state.send_replace(AuthState::Unauthenticated);
                warn!(error = %e, "login failed");
                Err(e)
            }
        }
    }

    async fn handshake(&self, force: bool) -> Result<(), Error> {
        if force {
            debug!("discarding cached identity and cookies");
            self.identity
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();
            let transport = Transport::new(&self.config)?.with_query_log(self.query_log.clone());
            self.transport.store(Arc::new(transport));
        }
        let transport = self.transport.load_full();

        let cached = self
            .identity
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let identity = if let Some(identity) = cached {
            identity
        } else {
            let body = transport
                .execute(&ApiRequest::token_exchange(self.credentials.token_request()))
                .await
                .map_err(rejected)?;
            let token = body
                .pointer("/body/authToken")
                .and_then(Value::as_str)
                .ok_or_else(|| Error::Authentication {
                    message: "token exchange returned no authToken".into(),
                })?;
            let identity = AuthIdentity {
                device_id: self.credentials.device_id.clone(),
                username: self.credentials.username.clone(),
                token: SecretString::from(token.to_owned()),
            };
            *self.identity.lock().unwrap_or_else(PoisonError::into_inner) = Some(identity.clone());
            identity
        };

        transport
            .execute(&ApiRequest::authorize(identity.authorize_request()))
            .await
            .map_err(rejected)?;
        Ok(())
    }

    /// Fail with the error of the attempt that ran while this caller waited.
    fn reuse_failure(&self) -> Result<(), Error> {
        match self
            .last_failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
        {
            Some(message) => Err(Error::Authentication { message }),
            None => Ok(()),
        }
    }

    fn invalidate(&self, generation: u64) {
        if self.generation.load(Ordering::Acquire) != generation {
            return;
        }
        let changed = self.state.send_if_modified(|state| {
            if *state == AuthState::Authenticated {
                *state = AuthState::Unauthenticated;
                true
            } else {
                false
            }
        });
        if changed {
            warn!("session expired, next request logs in again");
        }
    }
}

/// A 401 during login means the credentials or token were refused.
fn rejected(e: Error) -> Error {
    match e {
        Error::SessionExpired { status_text, body } => Error::Authentication {
            message: format!("credentials rejected ({status_text}): {body}"),
        },
        other => other,
    }
}
