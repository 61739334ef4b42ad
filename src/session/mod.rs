//! Ingestion pipeline and the session handle readers hold
//!
//! ```text
//! file ──► LineReader ──► parse_line ──► Ingestor ──(write guard, batched)──► Registry
//!                                            │                                  ▲
//!                                            └── watch::Sender<u64> ──► readers ┘ (read guard)
//! ```
//!
//! One ingestion task per session is the only writer. Readers take the
//! shared side of the lock after the batch counter moves, or after the
//! channel closes, which means the loop is gone for good.

mod ingest;
pub mod reader;
pub mod scope;

pub use reader::{LineReader, ReadOutcome};
pub use scope::{Admission, Scope, TimeWindow};

use {
    crate::{
        collector::{Collector, Collectors},
        settings::SettingsProvider,
    },
    ingest::Ingestor,
    serde::Serialize,
    std::{
        path::{Path, PathBuf},
        sync::{
            atomic::{AtomicBool, AtomicU64, Ordering},
            Arc,
        },
        time::Duration,
    },
    tokio::{
        sync::{watch, RwLock, RwLockReadGuard},
        task::JoinHandle,
    },
};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);
pub const DEFAULT_IDLE_RESET: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ingestion task ended abnormally")]
    Closed,
}

/// Everything behind the session lock
#[derive(Debug, Serialize)]
pub struct Registry {
    username: String,
    collectors: Collectors,
    /// Events forwarded to the collectors since open or the last reset
    events: u64,
}

/// Serializable view of a registry
#[derive(Debug, Serialize)]
pub struct Summary<'a> {
    pub username: &'a str,
    pub events: u64,
    pub tabs: Vec<&'static str>,
    pub collectors: &'a Collectors,
}

impl Registry {
    pub fn new(idle_reset: Duration) -> Self {
        Self {
            username: String::new(),
            collectors: Collectors::new(idle_reset),
            events: 0,
        }
    }

    /// Empty until a login line has been read
    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn collectors(&self) -> &Collectors {
        &self.collectors
    }

    pub fn events(&self) -> u64 {
        self.events
    }

    pub fn tab_names(&self) -> Vec<&'static str> {
        self.collectors.iter().into_iter().map(|c| c.tab_name()).collect()
    }

    pub fn summary(&self) -> Summary<'_> {
        Summary {
            username: &self.username,
            events: self.events,
            tabs: self.tab_names(),
            collectors: &self.collectors,
        }
    }

    /// Clears aggregate state; the username survives
    fn reset(&mut self) {
        self.collectors.reset();
        self.events = 0;
    }
}

#[derive(Debug, Clone)]
pub struct OpenOptions {
    /// Keep polling past EOF instead of stopping
    pub tail: bool,
    /// Byte offset to start reading from
    pub resume_offset: u64,
    pub scope: Scope,
    pub poll_interval: Duration,
    /// Idle gap after which rolling rates start over
    pub idle_reset: Duration,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            tail: true,
            resume_offset: 0,
            scope: Scope::unbounded(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            idle_reset: DEFAULT_IDLE_RESET,
        }
    }
}

impl OpenOptions {
    /// Read to EOF once, then stop
    pub fn bounded() -> Self {
        Self {
            tail: false,
            ..Self::default()
        }
    }

    pub fn tailing() -> Self {
        Self::default()
    }
}

/// Flags shared between the handle and the ingestion task
#[derive(Debug)]
pub(crate) struct Control {
    stop: AtomicBool,
    alive: AtomicBool,
    eof_polls: AtomicU64,
    offset: AtomicU64,
}

impl Control {
    fn new(offset: u64) -> Self {
        Self {
            stop: AtomicBool::new(false),
            alive: AtomicBool::new(true),
            eof_polls: AtomicU64::new(0),
            offset: AtomicU64::new(offset),
        }
    }
}

/// Handle to one open log file and its registry of aggregators
pub struct Session {
    path: PathBuf,
    options: OpenOptions,
    settings: Arc<dyn SettingsProvider>,
    registry: Arc<RwLock<Registry>>,
    updates: watch::Receiver<u64>,
    control: Arc<Control>,
    task: Option<JoinHandle<Result<(), SessionError>>>,
}

impl Session {
    /// Open `path` and spawn the ingestion task.
    ///
    /// Fails only if the file cannot be opened or positioned; later I/O
    /// errors end the task and clear [`Session::is_alive`].
    pub async fn open(
        path: impl AsRef<Path>,
        options: OpenOptions,
        settings: Arc<dyn SettingsProvider>,
    ) -> Result<Self, SessionError> {
        Self::open_as(path.as_ref().to_path_buf(), options, settings, String::new()).await
    }

    /// Like [`Session::open`], with the registry already logged in as `username`
    async fn open_as(
        path: PathBuf,
        options: OpenOptions,
        settings: Arc<dyn SettingsProvider>,
        username: String,
    ) -> Result<Self, SessionError> {
        let reader = LineReader::open(&path, options.resume_offset, options.tail).await?;

        log::info!(
            "Opened {} ({} mode, offset {}, {} windows)",
            path.display(),
            if options.tail { "tail" } else { "bounded" },
            options.resume_offset,
            options.scope.windows().len()
        );

        let mut registry = Registry::new(options.idle_reset);
        registry.username = username;
        let registry = Arc::new(RwLock::new(registry));
        let (tx, rx) = watch::channel(0u64);
        let control = Arc::new(Control::new(options.resume_offset));

        let ingestor = Ingestor {
            reader,
            registry: Arc::clone(&registry),
            settings: Arc::clone(&settings),
            scope: options.scope.clone(),
            tail: options.tail,
            poll_interval: options.poll_interval,
            updates: tx,
            control: Arc::clone(&control),
            batch: None,
            batches: 0,
        };
        let task = tokio::spawn(ingestor.run());

        Ok(Self {
            path,
            options,
            settings,
            registry,
            updates: rx,
            control,
            task: Some(task),
        })
    }

    /// Shared side of the session lock
    pub async fn read(&self) -> RwLockReadGuard<'_, Registry> {
        self.registry.read().await
    }

    pub fn registry(&self) -> Arc<RwLock<Registry>> {
        Arc::clone(&self.registry)
    }

    /// Batch counter bumped each time a batch settles. `changed()` erroring
    /// means the loop has exited and no further updates will come.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.updates.clone()
    }

    pub fn is_alive(&self) -> bool {
        self.control.alive.load(Ordering::Acquire)
    }

    /// How many times the loop has waited at EOF
    pub fn eof_polls(&self) -> u64 {
        self.control.eof_polls.load(Ordering::Relaxed)
    }

    /// Byte offset just past the last line consumed
    pub fn offset(&self) -> u64 {
        self.control.offset.load(Ordering::Relaxed)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn options(&self) -> &OpenOptions {
        &self.options
    }

    pub fn settings(&self) -> &dyn SettingsProvider {
        &*self.settings
    }

    /// Reset every aggregator. Waits for the current batch to settle.
    pub async fn reset(&self) {
        let mut registry = self.registry.write().await;
        registry.reset();
        log::info!("Session reset ({})", self.path.display());
    }

    /// Ask the loop to stop at its next line or EOF check
    pub fn close(&self) {
        self.control.stop.store(true, Ordering::Release);
    }

    /// Wait for the loop to exit and return how it ended
    pub async fn wait(&mut self) -> Result<(), SessionError> {
        let Some(task) = self.task.take() else {
            return Ok(());
        };
        match task.await {
            Ok(result) => result,
            Err(e) => {
                log::error!("Ingestion task for {} failed: {}", self.path.display(), e);
                self.control.alive.store(false, Ordering::Release);
                Err(SessionError::Closed)
            }
        }
    }

    pub async fn shutdown(&mut self) -> Result<(), SessionError> {
        self.close();
        self.wait().await
    }

    /// Stop this session and re-open the same file with `windows` applied,
    /// reading from `resume_offset`. The new session starts with empty
    /// aggregators but keeps the username learned so far, so `You` lines
    /// past the login still resolve to the player.
    pub async fn rescope(
        mut self,
        windows: Vec<TimeWindow>,
        resume_offset: u64,
    ) -> Result<Session, SessionError> {
        if let Err(e) = self.shutdown().await {
            log::warn!("Previous ingestion ended with an error: {}", e);
        }
        let username = self.registry.read().await.username.clone();

        let options = OpenOptions {
            resume_offset,
            scope: Scope::new(windows),
            ..self.options.clone()
        };
        Session::open_as(self.path.clone(), options, Arc::clone(&self.settings), username).await
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}
