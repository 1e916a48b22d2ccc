//! The admin session: an optional admin token, shared by every view and client that needs it
//!
//! An [`AdminSession`] is cheap to clone, and every clone sees the same token.
//! Changing the token persists it in a [`TokenStore`], changes the header that [`Client`](crate::client::Client)s attach to their next requests,
//! and notifies every [`SessionWatcher`] so that views can show or hide privileged controls right away.

use std::fmt::{Debug, Formatter};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::error::ConsoleError;
use crate::traits::EventSource;

bitflags! {
    /// Actions that are only available to admins
    pub struct Privileges: u8 {
        /// Delete a single event
        const DELETE = 1;
        /// Dispatch the notification of an existing event right now
        const SEND_NOW = 2;
        /// Delete every event of a day or a month
        const BULK_DELETE = 4;
        /// Edit or transfer an event
        const EDIT = 8;
    }
}


/// An opaque admin credential
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdminToken {
    secret: String,
}

impl AdminToken {
    /// Returns `None` for blank tokens
    pub fn new<S: AsRef<str>>(secret: S) -> Option<Self> {
        let secret = secret.as_ref().trim();
        if secret.is_empty() {
            return None;
        }
        Some(Self { secret: secret.to_string() })
    }

    pub fn as_str(&self) -> &str {
        &self.secret
    }
}

/// Never print the actual secret
impl Debug for AdminToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "AdminToken(***)")
    }
}


/// Where the admin token is persisted between runs
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Result<Option<AdminToken>, ConsoleError>;
    /// Persist a token, or forget it when `token` is `None`
    fn save(&self, token: Option<&AdminToken>) -> Result<(), ConsoleError>;
}

/// A token store that forgets everything when dropped
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<AdminToken>>,
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<AdminToken>, ConsoleError> {
        Ok(self.token.lock().unwrap().clone())
    }

    fn save(&self, token: Option<&AdminToken>) -> Result<(), ConsoleError> {
        *self.token.lock().unwrap() = token.cloned();
        Ok(())
    }
}

#[derive(Default, Debug, Serialize, Deserialize)]
struct StoredToken {
    admin_token: Option<AdminToken>,
}

/// A token store backed by a JSON file, one file per profile
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    backing_file: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: &Path) -> Self {
        Self { backing_file: PathBuf::from(path) }
    }

    /// The store of a named profile inside `folder`. The profile name is sanitized to a valid file name
    pub fn for_profile(folder: &Path, profile: &str) -> Self {
        let file_name = format!("{}.json", sanitize_filename::sanitize(profile));
        Self::new(&folder.join(file_name))
    }

    pub fn path(&self) -> &Path {
        &self.backing_file
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<AdminToken>, ConsoleError> {
        let file = match std::fs::File::open(&self.backing_file) {
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
            Ok(file) => file,
        };
        let stored: StoredToken = serde_json::from_reader(file)?;
        Ok(stored.admin_token)
    }

    fn save(&self, token: Option<&AdminToken>) -> Result<(), ConsoleError> {
        let token = match token {
            Some(t) => t,
            None => {
                return match std::fs::remove_file(&self.backing_file) {
                    Err(err) if err.kind() != std::io::ErrorKind::NotFound => Err(err.into()),
                    _ => Ok(()),
                };
            },
        };

        if let Some(parent) = self.backing_file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::File::create(&self.backing_file)?;
        serde_json::to_writer(file, &StoredToken { admin_token: Some(token.clone()) })?;
        Ok(())
    }
}


/// Receives the new token every time it changes. See [`AdminSession::subscribe`]
pub type SessionWatcher = watch::Receiver<Option<AdminToken>>;

struct SessionInner {
    store: Box<dyn TokenStore>,
    sender: watch::Sender<Option<AdminToken>>,
}

/// The admin session, to be passed to every view and client that needs it
#[derive(Clone)]
pub struct AdminSession {
    inner: Arc<SessionInner>,
}

impl AdminSession {
    /// Create a session, restoring the token previously persisted in `store` (if any)
    pub fn new<T: TokenStore + 'static>(store: T) -> Result<Self, ConsoleError> {
        let token = store.load()?;
        log::debug!("Admin session restored ({})", if token.is_some() { "with a token" } else { "anonymous" });
        let (sender, _) = watch::channel(token);
        Ok(Self {
            inner: Arc::new(SessionInner { store: Box::new(store), sender }),
        })
    }

    /// A session that is not persisted, and starts without a token
    pub fn in_memory() -> Self {
        let (sender, _) = watch::channel(None);
        Self {
            inner: Arc::new(SessionInner { store: Box::new(MemoryTokenStore::default()), sender }),
        }
    }

    /// The current token
    pub fn token(&self) -> Option<AdminToken> {
        self.inner.sender.borrow().clone()
    }

    pub fn is_admin(&self) -> bool {
        self.inner.sender.borrow().is_some()
    }

    /// What the current session is allowed to do
    pub fn privileges(&self) -> Privileges {
        if self.is_admin() { Privileges::all() } else { Privileges::empty() }
    }

    /// Fails with [`ConsoleError::Forbidden`] unless the session has every privilege in `needed`
    pub fn require(&self, needed: Privileges) -> Result<(), ConsoleError> {
        if self.privileges().contains(needed) {
            Ok(())
        } else {
            Err(ConsoleError::Forbidden(needed))
        }
    }

    /// Get notified every time the token changes
    pub fn subscribe(&self) -> SessionWatcher {
        self.inner.sender.subscribe()
    }

    /// Persist a new token and broadcast it. This does not check the token, see [`AdminSession::login`]
    pub fn set_token(&self, token: AdminToken) -> Result<(), ConsoleError> {
        self.inner.store.save(Some(&token))?;
        self.inner.sender.send_replace(Some(token));
        log::info!("Admin token set");
        Ok(())
    }

    /// Forget the token and broadcast it
    pub fn clear(&self) -> Result<(), ConsoleError> {
        self.inner.store.save(None)?;
        self.inner.sender.send_replace(None);
        log::info!("Admin token cleared");
        Ok(())
    }

    /// Check `candidate` against the backend, and keep it only if the backend accepts it.
    ///
    /// Any failure (rejected token, unreachable backend...) clears the session.
    pub async fn login<S>(&self, candidate: &str, source: &S) -> Result<(), ConsoleError>
    where
        S: EventSource + ?Sized,
    {
        let token = AdminToken::new(candidate).ok_or_else(|| ConsoleError::validation("the admin token is empty"))?;

        match source.validate_token(&token).await {
            Ok(()) => self.set_token(token),
            Err(err) => {
                log::warn!("Admin token rejected: {}", err);
                if let Err(clear_err) = self.clear() {
                    log::warn!("Unable to clear the admin token: {}", clear_err);
                }
                Err(err)
            },
        }
    }
}

impl Debug for AdminSession {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminSession")
            .field("token", &self.token())
            .finish()
    }
}
