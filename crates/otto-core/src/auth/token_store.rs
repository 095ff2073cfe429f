use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use keyring::Entry;
use tracing::debug;

use crate::api::ApiError;

/// Token file name in cache directory
const TOKEN_FILE: &str = "token";

/// Keychain service name
const SERVICE_NAME: &str = "otto";

/// Keychain account the token is stored under
const TOKEN_ACCOUNT: &str = "token";

/// Persistent storage for the session token.
///
/// A missing token is `Ok(None)`, never an error.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Result<Option<String>, ApiError>;
    fn save(&self, token: &str) -> Result<(), ApiError>;
    fn clear(&self) -> Result<(), ApiError>;
}

impl<T: TokenStore + ?Sized> TokenStore for Box<T> {
    fn load(&self) -> Result<Option<String>, ApiError> {
        (**self).load()
    }

    fn save(&self, token: &str) -> Result<(), ApiError> {
        (**self).save(token)
    }

    fn clear(&self) -> Result<(), ApiError> {
        (**self).clear()
    }
}

fn storage_error(context: &str, err: impl std::fmt::Display) -> ApiError {
    ApiError::Storage(format!("{}: {}", context, err))
}

// ============================================================================
// File
// ============================================================================

/// Stores the token in a file in the cache directory.
pub struct FileTokenStore {
    cache_dir: PathBuf,
}

impl FileTokenStore {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    pub fn path(&self) -> PathBuf {
        self.cache_dir.join(TOKEN_FILE)
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<String>, ApiError> {
        let path = self.path();
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path)
            .map_err(|e| storage_error("Failed to read token file", e))?;
        let token = contents.trim();
        Ok((!token.is_empty()).then(|| token.to_string()))
    }

    fn save(&self, token: &str) -> Result<(), ApiError> {
        let path = self.path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| storage_error("Failed to create cache directory", e))?;
        }

        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        use std::io::Write;
        let mut file = options
            .open(&path)
            .map_err(|e| storage_error("Failed to open token file", e))?;
        file.write_all(token.as_bytes())
            .map_err(|e| storage_error("Failed to write token file", e))?;
        debug!(?path, "Token saved");
        Ok(())
    }

    fn clear(&self) -> Result<(), ApiError> {
        let path = self.path();
        if path.exists() {
            std::fs::remove_file(&path)
                .map_err(|e| storage_error("Failed to remove token file", e))?;
            debug!(?path, "Token removed");
        }
        Ok(())
    }
}

// ============================================================================
// Keychain
// ============================================================================

/// Stores the token in the OS keychain.
pub struct KeyringTokenStore;

impl KeyringTokenStore {
    fn entry() -> Result<Entry, ApiError> {
        Entry::new(SERVICE_NAME, TOKEN_ACCOUNT)
            .map_err(|e| storage_error("Failed to create keyring entry", e))
    }
}

impl TokenStore for KeyringTokenStore {
    fn load(&self) -> Result<Option<String>, ApiError> {
        match Self::entry()?.get_password() {
            Ok(token) => Ok(Some(token)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(storage_error("Failed to read token from keychain", e)),
        }
    }

    fn save(&self, token: &str) -> Result<(), ApiError> {
        Self::entry()?
            .set_password(token)
            .map_err(|e| storage_error("Failed to store token in keychain", e))
    }

    fn clear(&self) -> Result<(), ApiError> {
        match Self::entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(storage_error("Failed to delete token from keychain", e)),
        }
    }
}

// ============================================================================
// Memory
// ============================================================================

/// Keeps the token in memory. Clones share the same slot.
#[derive(Clone, Default)]
pub struct MemoryTokenStore {
    slot: Arc<Mutex<Option<String>>>,
    fail_writes: bool,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: &str) -> Self {
        let store = Self::default();
        *store.lock() = Some(token.to_string());
        store
    }

    /// A store whose `save` and `clear` always fail
    pub fn failing_writes() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    /// Current contents, for inspection
    pub fn get(&self) -> Option<String> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<String>, ApiError> {
        Ok(self.get())
    }

    fn save(&self, token: &str) -> Result<(), ApiError> {
        if self.fail_writes {
            return Err(ApiError::Storage("read-only store".to_string()));
        }
        *self.lock() = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), ApiError> {
        if self.fail_writes {
            return Err(ApiError::Storage("read-only store".to_string()));
        }
        *self.lock() = None;
        Ok(())
    }
}
