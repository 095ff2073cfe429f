use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::{ApiError, AuthApi};
use crate::models::UserProfile;

use super::TokenStore;

/// Message shown when a login is rejected without an explanation
const DEFAULT_LOGIN_FAILURE: &str = "Login failed";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    /// A persisted token is being validated
    Initializing,
    Unauthenticated,
    /// A login request is in flight
    Authenticating,
    Authenticated,
    Error(String),
}

impl SessionStatus {
    pub fn label(&self) -> &'static str {
        match self {
            SessionStatus::Initializing => "initializing",
            SessionStatus::Unauthenticated => "unauthenticated",
            SessionStatus::Authenticating => "authenticating",
            SessionStatus::Authenticated => "authenticated",
            SessionStatus::Error(_) => "error",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Error(msg) => write!(f, "error: {}", msg),
            other => f.write_str(other.label()),
        }
    }
}

/// Client-side view of the authentication state.
///
/// `user` is `Some` exactly when `status` is `Authenticated`.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: Option<String>,
    pub user: Option<UserProfile>,
    pub status: SessionStatus,
    /// Displayable message from the most recent failed login
    pub last_error: Option<String>,
}

impl Session {
    fn unauthenticated() -> Self {
        Self {
            token: None,
            user: None,
            status: SessionStatus::Unauthenticated,
            last_error: None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.status == SessionStatus::Authenticated
    }

    /// Sign the session out, keeping nothing but an optional message
    fn reset(&mut self, status: SessionStatus, last_error: Option<String>) {
        self.token = None;
        self.user = None;
        self.status = status;
        self.last_error = last_error;
    }
}

/// Owns the session and every transition of it.
///
/// Each mutating operation takes a new generation number. Async operations
/// only write back while their generation is still the newest one, so a
/// logout or a second login always wins over an older in-flight login.
pub struct SessionStore<A, S> {
    api: A,
    tokens: S,
    state: watch::Sender<Session>,
    /// Held while checking a generation and writing the result
    generation: Mutex<u64>,
}

impl<A: AuthApi, S: TokenStore> SessionStore<A, S> {
    /// Create the store from whatever token was persisted.
    ///
    /// With a token the session starts `Initializing`; call `initialize`
    /// to validate it.
    pub fn new(api: A, tokens: S) -> Self {
        let token = match tokens.load() {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Failed to read persisted token");
                None
            }
        };

        let session = match token {
            Some(token) => Session {
                token: Some(token),
                status: SessionStatus::Initializing,
                ..Session::unauthenticated()
            },
            None => Session::unauthenticated(),
        };
        debug!(status = session.status.label(), "Session store created");

        let (state, _) = watch::channel(session);
        Self {
            api,
            tokens,
            state,
            generation: Mutex::new(0),
        }
    }

    // =========================================================================
    // Observation
    // =========================================================================

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.state.borrow().status.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    pub fn token(&self) -> Option<String> {
        self.state.borrow().token.clone()
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.state.borrow().user.clone()
    }

    /// Receive every session change
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    /// Generation of the newest operation. Work tagged with an older
    /// generation belongs to a session that no longer exists.
    pub fn generation(&self) -> u64 {
        *self.lock_generation()
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Validate the persisted token and load the user's profile.
    ///
    /// Any failure is treated as an expired token: it is removed and the
    /// session drops to `Unauthenticated` without a message. Does nothing
    /// unless the session is `Initializing`.
    pub async fn initialize(&self) -> Result<(), ApiError> {
        let (generation, token) = {
            let mut current = self.lock_generation();
            let token = {
                let session = self.state.borrow();
                if session.status != SessionStatus::Initializing {
                    return Ok(());
                }
                session.token.clone()
            };
            let Some(token) = token else {
                return Ok(());
            };
            *current += 1;
            (*current, token)
        };

        match self.api.fetch_current_user(&token).await {
            Ok(user) => {
                let committed = self.commit(generation, |session| {
                    session.user = Some(user);
                    session.status = SessionStatus::Authenticated;
                });
                if !committed {
                    return Err(ApiError::Superseded);
                }
                info!("Persisted session is valid");
                Ok(())
            }
            Err(e) => {
                info!(error = %e, "Persisted token rejected, signing out");
                let committed = self.commit(generation, |session| {
                    self.clear_persisted();
                    session.reset(SessionStatus::Unauthenticated, None);
                });
                if !committed {
                    return Err(ApiError::Superseded);
                }
                Err(ApiError::InvalidSession)
            }
        }
    }

    /// Log in and load the user's profile.
    ///
    /// On success the token is persisted and the profile returned. A profile
    /// fetch failure after the token was issued undoes the login: the token
    /// is removed and the session ends in `Error`. Returns `Superseded` if a
    /// newer login or a logout happened while this one was in flight.
    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile, ApiError> {
        let generation = self.begin(|session| {
            session.token = None;
            session.user = None;
            session.status = SessionStatus::Authenticating;
            session.last_error = None;
        });
        debug!(email, generation, "Attempting login");

        let response = match self.api.login(email, password).await {
            Ok(response) => response,
            Err(e) => return self.fail_login(generation, e),
        };

        let Some(token) = response.issued_token().map(str::to_string) else {
            let message = response
                .message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_LOGIN_FAILURE.to_string());
            return self.fail_login(generation, ApiError::RequestFailed(message));
        };

        let committed = self.commit(generation, |session| {
            if let Err(e) = self.tokens.save(&token) {
                warn!(error = %e, "Failed to persist token");
            }
            session.token = Some(token.clone());
        });
        if !committed {
            debug!(generation, "Login superseded before token was stored");
            return Err(ApiError::Superseded);
        }

        match self.api.fetch_current_user(&token).await {
            Ok(user) => {
                let committed = self.commit(generation, |session| {
                    session.user = Some(user.clone());
                    session.status = SessionStatus::Authenticated;
                });
                if !committed {
                    debug!(generation, "Login superseded before profile was stored");
                    return Err(ApiError::Superseded);
                }
                info!("Login successful");
                Ok(user)
            }
            Err(e) => {
                warn!(error = %e, "Login succeeded but user profile fetch failed");
                let message = format!("Signed in, but the user profile could not be loaded: {}", e);
                let committed = self.commit(generation, |session| {
                    self.clear_persisted();
                    session.reset(SessionStatus::Error(message.clone()), Some(message.clone()));
                });
                if !committed {
                    return Err(ApiError::Superseded);
                }
                Err(e)
            }
        }
    }

    /// Sign out. Always succeeds; storage errors are only logged.
    pub fn logout(&self) {
        let mut current = self.lock_generation();
        *current += 1;
        self.clear_persisted();
        self.transition(|session| session.reset(SessionStatus::Unauthenticated, None));
        info!("Logged out");
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn fail_login(&self, generation: u64, err: ApiError) -> Result<UserProfile, ApiError> {
        warn!(error = %err, "Login failed");
        let message = err.to_string();
        let committed = self.commit(generation, |session| {
            self.clear_persisted();
            session.reset(SessionStatus::Unauthenticated, Some(message));
        });
        if committed {
            Err(err)
        } else {
            Err(ApiError::Superseded)
        }
    }

    fn lock_generation(&self) -> MutexGuard<'_, u64> {
        self.generation.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a new operation, applying its first transition
    fn begin(&self, update: impl FnOnce(&mut Session)) -> u64 {
        let mut current = self.lock_generation();
        *current += 1;
        self.transition(update);
        *current
    }

    /// Apply `update` if `generation` is still the newest operation.
    fn commit(&self, generation: u64, update: impl FnOnce(&mut Session)) -> bool {
        let current = self.lock_generation();
        if *current != generation {
            return false;
        }
        self.transition(update);
        true
    }

    fn transition(&self, update: impl FnOnce(&mut Session)) {
        self.state.send_modify(|session| {
            let from = session.status.label();
            update(session);
            debug!(from, to = session.status.label(), "Session transition");
        });
    }

    fn clear_persisted(&self) {
        if let Err(e) = self.tokens.clear() {
            warn!(error = %e, "Failed to clear persisted token");
        }
    }
}
