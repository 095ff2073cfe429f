//! Application state management for the Otto TUI.
//!
//! This module contains the `App` struct that owns the session store, the
//! login form, the dashboard data and the background task channel.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use otto_core::api::ApiError;
use otto_core::auth::TokenStore;
use otto_core::models::{DataInfo, RouteLogging, Turn, TurnData, UserProfile};
use otto_core::{ApiClient, Config, RouteDecision, RouteGuard, SessionStatus, SessionStore};
use tokio::sync::mpsc;
use tracing::{debug, warn};

// ============================================================================
// Constants
// ============================================================================

/// Buffer size for the background task message channel.
const CHANNEL_BUFFER_SIZE: usize = 32;

/// Maximum length for email input.
const MAX_EMAIL_LENGTH: usize = 254;

/// Maximum length for password input.
/// 128 chars accommodates password managers and passphrases.
const MAX_PASSWORD_LENGTH: usize = 128;

/// The session store as the TUI runs it
pub type Store = SessionStore<ApiClient, Box<dyn TokenStore>>;

// ============================================================================
// UI State Types
// ============================================================================

/// Overall application state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Normal,
    ShowingHelp,
    ConfirmingQuit,
    Quitting,
}

/// Login form focus state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginFocus {
    Email,
    Password,
    Button,
}

impl LoginFocus {
    pub fn next(&self) -> Self {
        match self {
            LoginFocus::Email => LoginFocus::Password,
            LoginFocus::Password => LoginFocus::Button,
            LoginFocus::Button => LoginFocus::Email,
        }
    }

    pub fn prev(&self) -> Self {
        match self {
            LoginFocus::Email => LoginFocus::Button,
            LoginFocus::Password => LoginFocus::Email,
            LoginFocus::Button => LoginFocus::Password,
        }
    }
}

// ============================================================================
// Background Task Results
// ============================================================================

/// Results sent from background tasks back to the event loop.
///
/// Data results carry the session generation they were fetched under so
/// that anything fetched before a logout can be thrown away.
pub enum TaskResult {
    /// Startup validation of the persisted token finished
    Initialized(Result<(), ApiError>),
    /// A login attempt finished
    LoginFinished {
        email: String,
        result: Result<UserProfile, ApiError>,
    },
    Data {
        generation: u64,
        result: Result<DataInfo, ApiError>,
    },
    TurnData {
        generation: u64,
        turn: Turn,
        result: Result<TurnData, ApiError>,
    },
    RouteLogging {
        generation: u64,
        result: Result<RouteLogging, ApiError>,
    },
}

// ============================================================================
// Main Application Struct
// ============================================================================

pub struct App {
    pub config: Config,
    /// Where `config` is written back; `None` keeps it in memory only
    config_path: Option<PathBuf>,
    pub session: Arc<Store>,

    pub state: AppState,

    // Login form state
    pub login_email: String,
    pub login_password: String,
    pub login_focus: LoginFocus,
    /// Form validation message; backend errors live in the session
    pub login_error: Option<String>,

    // Dashboard state
    pub turn: Turn,
    pub data: Option<DataInfo>,
    pub turn_data: Option<TurnData>,
    pub loading_data: bool,

    pub status_message: Option<String>,

    // Background task channel
    task_rx: mpsc::Receiver<TaskResult>,
    task_tx: mpsc::Sender<TaskResult>,
}

impl App {
    /// Create the application from the saved configuration
    pub fn new() -> Result<Self> {
        let config = match Config::load() {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "Failed to load config, using defaults");
                let mut config = Config::default();
                config.apply_env(|key| std::env::var(key).ok());
                config
            }
        };
        debug!(base_url = %config.base_url, storage = ?config.token_storage, "Config loaded");

        let api = ApiClient::new(&config.base_url, Some(config.request_timeout()))?;
        let session = SessionStore::new(api, config.token_store()?);

        let login_email = std::env::var(otto_core::config::ENV_EMAIL)
            .ok()
            .or_else(|| config.last_email.clone())
            .unwrap_or_default();
        let login_password = std::env::var(otto_core::config::ENV_PASSWORD).unwrap_or_default();

        let mut app = Self::with_session(config, session);
        app.config_path = Config::path().ok();
        app.login_email = login_email;
        app.login_password = login_password;
        app.reset_login_focus();
        Ok(app)
    }

    /// Create the application around an existing session store
    pub fn with_session(config: Config, session: Store) -> Self {
        let (task_tx, task_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        Self {
            config,
            config_path: None,
            session: Arc::new(session),
            state: AppState::Normal,
            login_email: String::new(),
            login_password: String::new(),
            login_focus: LoginFocus::Email,
            login_error: None,
            turn: Turn::current(),
            data: None,
            turn_data: None,
            loading_data: false,
            status_message: None,
            task_rx,
            task_tx,
        }
    }

    /// What the main area may show right now
    pub fn route(&self) -> RouteDecision {
        RouteGuard::evaluate(&self.session.snapshot())
    }

    pub fn current_user(&self) -> Option<UserProfile> {
        self.session.user()
    }

    /// Message to show under the login form
    pub fn login_message(&self) -> Option<String> {
        self.login_error
            .clone()
            .or_else(|| self.session.snapshot().last_error)
    }

    pub fn is_signing_in(&self) -> bool {
        self.session.status() == SessionStatus::Authenticating
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// Validate a persisted token in the background, if there is one
    pub fn start(&mut self) {
        if self.session.status() != SessionStatus::Initializing {
            self.reset_login_focus();
            return;
        }
        let session = Arc::clone(&self.session);
        let tx = self.task_tx.clone();
        tokio::spawn(async move {
            let result = session.initialize().await;
            Self::send_result(&tx, TaskResult::Initialized(result)).await;
        });
    }

    /// Attempt login with the credentials from the login form
    pub fn attempt_login(&mut self) {
        if self.is_signing_in() {
            return;
        }
        let email = self.login_email.trim().to_string();
        let password = self.login_password.clone();

        if email.is_empty() || password.is_empty() {
            self.login_error = Some("Email and password required".to_string());
            return;
        }
        self.login_error = None;

        let session = Arc::clone(&self.session);
        let tx = self.task_tx.clone();
        tokio::spawn(async move {
            let result = session.login(&email, &password).await;
            Self::send_result(&tx, TaskResult::LoginFinished { email, result }).await;
        });
    }

    pub fn logout(&mut self) {
        self.session.logout();
        self.clear_dashboard();
        self.status_message = Some("Signed out".to_string());
        self.reset_login_focus();
    }

    /// Put the login cursor on the first empty field
    pub fn reset_login_focus(&mut self) {
        self.login_focus = if self.login_email.is_empty() {
            LoginFocus::Email
        } else {
            LoginFocus::Password
        };
        self.login_error = None;
    }

    // =========================================================================
    // Dashboard data
    // =========================================================================

    /// Reload the data descriptor and the selected turn
    pub fn refresh_dashboard(&mut self) {
        let Some(token) = self.authenticated_token() else {
            return;
        };
        let generation = self.session.generation();
        let api = self.session.api().clone();
        let tx = self.task_tx.clone();
        let turn = self.turn;
        self.loading_data = true;

        tokio::spawn(async move {
            let (data, turn_data) = futures::join!(api.fetch_data(&token), api.fetch_turn_data(&token, turn));
            Self::send_result(&tx, TaskResult::Data { generation, result: data }).await;
            Self::send_result(&tx, TaskResult::TurnData { generation, turn, result: turn_data }).await;
        });
    }

    /// Move to another turn and fetch it
    pub fn select_turn(&mut self, turn: Turn) {
        if turn == self.turn {
            return;
        }
        self.turn = turn;
        self.turn_data = None;

        let Some(token) = self.authenticated_token() else {
            return;
        };
        let generation = self.session.generation();
        let api = self.session.api().clone();
        let tx = self.task_tx.clone();
        tokio::spawn(async move {
            let result = api.fetch_turn_data(&token, turn).await;
            Self::send_result(&tx, TaskResult::TurnData { generation, turn, result }).await;
        });
    }

    pub fn toggle_route_logging(&mut self) {
        let Some(token) = self.authenticated_token() else {
            return;
        };
        let generation = self.session.generation();
        let api = self.session.api().clone();
        let tx = self.task_tx.clone();
        self.status_message = Some("Toggling route logging...".to_string());
        tokio::spawn(async move {
            let result = api.toggle_route_logging(&token).await;
            Self::send_result(&tx, TaskResult::RouteLogging { generation, result }).await;
        });
    }

    fn authenticated_token(&self) -> Option<String> {
        if self.session.is_authenticated() {
            self.session.token()
        } else {
            None
        }
    }

    fn clear_dashboard(&mut self) {
        self.data = None;
        self.turn_data = None;
        self.loading_data = false;
    }

    // =========================================================================
    // Background task results
    // =========================================================================

    async fn send_result(tx: &mpsc::Sender<TaskResult>, result: TaskResult) {
        if tx.send(result).await.is_err() {
            debug!("Event loop gone, dropping task result");
        }
    }

    /// Apply every result that has arrived since the last call
    pub fn check_background_tasks(&mut self) {
        while let Ok(result) = self.task_rx.try_recv() {
            self.process_task_result(result);
        }
    }

    pub fn process_task_result(&mut self, result: TaskResult) {
        match result {
            TaskResult::Initialized(result) => match result {
                Ok(()) if self.session.is_authenticated() => self.refresh_dashboard(),
                Ok(()) | Err(ApiError::Superseded) => {}
                // A stale token drops back to the login view without a message
                Err(e) => {
                    debug!(error = %e, "Startup validation failed");
                    self.reset_login_focus();
                }
            },
            TaskResult::LoginFinished { email, result } => match result {
                Ok(_) => {
                    self.login_password.clear();
                    self.status_message = None;
                    self.config.last_email = Some(email);
                    self.save_config();
                    self.refresh_dashboard();
                }
                Err(ApiError::Superseded) => debug!("Login result discarded"),
                Err(e) => debug!(error = %e, "Login failed"),
            },
            TaskResult::Data { generation, result } => {
                if !self.is_current(generation) {
                    return;
                }
                self.loading_data = false;
                match result {
                    Ok(data) => self.data = Some(data),
                    Err(e) => self.report_error("Failed to load data", e),
                }
            }
            TaskResult::TurnData { generation, turn, result } => {
                if !self.is_current(generation) || turn != self.turn {
                    return;
                }
                match result {
                    Ok(data) => self.turn_data = Some(data),
                    Err(e) => self.report_error("Failed to load turn", e),
                }
            }
            TaskResult::RouteLogging { generation, result } => {
                if !self.is_current(generation) {
                    return;
                }
                self.status_message = Some(match result {
                    Ok(status) if status.is_enabled() => "Route logging enabled".to_string(),
                    Ok(_) => "Route logging disabled".to_string(),
                    Err(e) => e.to_string(),
                });
            }
        }
    }

    fn save_config(&self) {
        let Some(ref path) = self.config_path else {
            return;
        };
        if let Err(e) = self.config.save_to(path) {
            warn!(error = %e, "Failed to save config");
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        let current = generation == self.session.generation();
        if !current {
            debug!(generation, "Dropping result from an earlier session");
        }
        current
    }

    fn report_error(&mut self, what: &str, err: ApiError) {
        warn!(error = %err, "{}", what);
        self.status_message = Some(format!("{}: {}", what, err));
    }
}

// ============================================================================
// Input validation helpers (exported for use in input.rs)
// ============================================================================

/// Check if a character is valid for input (no control characters)
fn is_valid_input_char(c: char) -> bool {
    !c.is_control()
}

/// Check if an email character should be accepted
pub fn can_add_email_char(current_len: usize, c: char) -> bool {
    current_len < MAX_EMAIL_LENGTH && is_valid_input_char(c) && !c.is_whitespace()
}

/// Check if a password character should be accepted
pub fn can_add_password_char(current_len: usize, c: char) -> bool {
    current_len < MAX_PASSWORD_LENGTH && is_valid_input_char(c)
}

// ============================================================================
// Tests
// ============================================================================
