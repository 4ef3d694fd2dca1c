//! Token Storage
//!
//! Persistence backends for the session token. Every store holds at most one
//! token; `load` returns `None` when nothing has been saved or after `clear`.

use async_trait::async_trait;
use futures::future::BoxFuture;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{MinimaxError, MinimaxResult};
use crate::types::Token;

/// Default environment variable used by [`EnvTokenStore`].
pub const DEFAULT_TOKEN_ENV_VAR: &str = "MINIMAX_TOKEN";

/// Token storage interface.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Persist the token, replacing any previous one.
    async fn save(&self, token: &Token) -> MinimaxResult<()>;

    /// Load the persisted token, if any.
    async fn load(&self) -> MinimaxResult<Option<Token>>;

    /// Remove the persisted token. Succeeds when nothing is stored.
    async fn clear(&self) -> MinimaxResult<()>;
}

/// Token store selection used by configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum TokenStoreConfig {
    /// Process memory; lost on exit.
    #[default]
    Memory,
    /// Single JSON file.
    File {
        path: PathBuf,
        /// Create missing parent directories on save.
        create_dir: bool,
    },
    /// JSON in an environment variable of the current process.
    Env { var: String },
}

impl TokenStoreConfig {
    /// Instantiate the selected store.
    pub fn build(&self) -> Arc<dyn TokenStore> {
        match self {
            Self::Memory => Arc::new(InMemoryTokenStore::new()),
            Self::File { path, create_dir } => {
                Arc::new(FileTokenStore::new(path.clone()).with_create_dir(*create_dir))
            }
            Self::Env { var } => Arc::new(EnvTokenStore::new(var.clone())),
        }
    }
}

fn to_json(token: &Token) -> MinimaxResult<String> {
    serde_json::to_string(token)
        .map_err(|e| MinimaxError::storage("failed to serialize token").with_source(e))
}

fn from_json(raw: &str, origin: &str) -> MinimaxResult<Token> {
    serde_json::from_str(raw).map_err(|e| {
        MinimaxError::storage(format!("corrupt token data in {}", origin)).with_source(e)
    })
}

/// In-memory token storage implementation.
#[derive(Default)]
pub struct InMemoryTokenStore {
    token: Mutex<Option<Token>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<Token>> {
        self.token.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn save(&self, token: &Token) -> MinimaxResult<()> {
        *self.slot() = Some(token.clone());
        Ok(())
    }

    async fn load(&self) -> MinimaxResult<Option<Token>> {
        Ok(self.slot().clone())
    }

    async fn clear(&self) -> MinimaxResult<()> {
        *self.slot() = None;
        Ok(())
    }
}

/// File-backed token storage.
///
/// The file is written with owner-only permissions on Unix.
pub struct FileTokenStore {
    path: PathBuf,
    create_dir: bool,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            create_dir: true,
        }
    }

    /// Whether missing parent directories are created on save (default: true).
    pub fn with_create_dir(mut self, create_dir: bool) -> Self {
        self.create_dir = create_dir;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling file written first and renamed over the token file.
    fn staging_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(&self, action: &str, error: std::io::Error) -> MinimaxError {
        MinimaxError::storage(format!(
            "failed to {} token file {}",
            action,
            self.path.display()
        ))
        .with_source(error)
    }
}

/// Create `path` fresh with mode 0600 on Unix and write `contents` to it.
async fn write_owner_only(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }

    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(path).await?;
    file.write_all(contents).await?;
    file.sync_all().await
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn save(&self, token: &Token) -> MinimaxResult<()> {
        if self.create_dir {
            if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| self.io_error("create directory for", e))?;
            }
        }

        let json = to_json(token)?;
        let staging = self.staging_path();
        if let Err(e) = write_owner_only(&staging, json.as_bytes()).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(self.io_error("write", e));
        }

        if let Err(e) = tokio::fs::rename(&staging, &self.path).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(self.io_error("replace", e));
        }

        debug!(path = %self.path.display(), "Token saved to file");
        Ok(())
    }

    async fn load(&self) -> MinimaxResult<Option<Token>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => from_json(&raw, &self.path.display().to_string()).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.io_error("read", e)),
        }
    }

    async fn clear(&self) -> MinimaxResult<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error("remove", e)),
        }
    }
}

/// Environment-variable token storage.
///
/// Only affects the current process environment.
pub struct EnvTokenStore {
    var: String,
}

impl EnvTokenStore {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }

    pub fn var(&self) -> &str {
        &self.var
    }
}

impl Default for EnvTokenStore {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_ENV_VAR)
    }
}

#[async_trait]
impl TokenStore for EnvTokenStore {
    async fn save(&self, token: &Token) -> MinimaxResult<()> {
        std::env::set_var(&self.var, to_json(token)?);
        Ok(())
    }

    async fn load(&self) -> MinimaxResult<Option<Token>> {
        match std::env::var(&self.var) {
            Ok(raw) if !raw.trim().is_empty() => from_json(&raw, &self.var).map(Some),
            _ => Ok(None),
        }
    }

    async fn clear(&self) -> MinimaxResult<()> {
        std::env::remove_var(&self.var);
        Ok(())
    }
}

type SaveFn = Arc<dyn Fn(Token) -> BoxFuture<'static, MinimaxResult<()>> + Send + Sync>;
type LoadFn = Arc<dyn Fn() -> BoxFuture<'static, MinimaxResult<Option<Token>>> + Send + Sync>;
type ClearFn = Arc<dyn Fn() -> BoxFuture<'static, MinimaxResult<()>> + Send + Sync>;

/// Token storage delegating to user-supplied async callbacks.
#[derive(Clone)]
pub struct CallbackTokenStore {
    save: SaveFn,
    load: LoadFn,
    clear: ClearFn,
}

impl CallbackTokenStore {
    pub fn new<S, SFut, L, LFut, C, CFut>(save: S, load: L, clear: C) -> Self
    where
        S: Fn(Token) -> SFut + Send + Sync + 'static,
        SFut: Future<Output = MinimaxResult<()>> + Send + 'static,
        L: Fn() -> LFut + Send + Sync + 'static,
        LFut: Future<Output = MinimaxResult<Option<Token>>> + Send + 'static,
        C: Fn() -> CFut + Send + Sync + 'static,
        CFut: Future<Output = MinimaxResult<()>> + Send + 'static,
    {
        Self {
            save: Arc::new(move |token| Box::pin(save(token))),
            load: Arc::new(move || Box::pin(load())),
            clear: Arc::new(move || Box::pin(clear())),
        }
    }
}

#[async_trait]
impl TokenStore for CallbackTokenStore {
    async fn save(&self, token: &Token) -> MinimaxResult<()> {
        (self.save)(token.clone()).await
    }

    async fn load(&self) -> MinimaxResult<Option<Token>> {
        (self.load)().await
    }

    async fn clear(&self) -> MinimaxResult<()> {
        (self.clear)().await
    }
}
