use {
    super::{
        reader::{LineReader, ReadOutcome},
        scope::{Admission, Scope},
        Control, Registry, SessionError,
    },
    crate::{
        collector::SessionInfo,
        event::{Event, EventKind},
        parser::parse_line,
        settings::SettingsProvider,
    },
    std::{
        sync::{atomic::Ordering, Arc},
        time::Duration,
    },
    tokio::sync::{watch, OwnedRwLockWriteGuard, RwLock},
};

/// The single writer of a session's registry.
///
/// The write guard is taken lazily on the first event of a batch and held
/// while lines keep arriving without blocking. It is released right before
/// the loop would wait (EOF) or exit, and every release bumps the batch
/// counter on the watch channel.
///
/// Dropping the ingestor, on return or while unwinding, clears liveness
/// before the channel closes.
pub(super) struct Ingestor {
    pub(super) reader: LineReader,
    pub(super) registry: Arc<RwLock<Registry>>,
    pub(super) settings: Arc<dyn SettingsProvider>,
    pub(super) scope: Scope,
    pub(super) tail: bool,
    pub(super) poll_interval: Duration,
    pub(super) updates: watch::Sender<u64>,
    pub(super) control: Arc<Control>,
    pub(super) batch: Option<OwnedRwLockWriteGuard<Registry>>,
    pub(super) batches: u64,
}

impl Ingestor {
    pub(super) async fn run(mut self) -> Result<(), SessionError> {
        let result = self.ingest().await;

        self.release();
        match &result {
            Ok(()) => log::info!(
                "Ingestion stopped at offset {} after {} batches",
                self.reader.consumed(),
                self.batches
            ),
            Err(e) => log::error!("Ingestion failed at offset {}: {}", self.reader.consumed(), e),
        }
        result
    }

    async fn ingest(&mut self) -> Result<(), SessionError> {
        loop {
            if self.control.stop.load(Ordering::Acquire) {
                return Ok(());
            }

            match self.reader.next_line().await? {
                ReadOutcome::Line(line) => {
                    self.handle_line(&line).await;
                    self.control
                        .offset
                        .store(self.reader.consumed(), Ordering::Relaxed);
                }
                ReadOutcome::Eof => {
                    self.release();
                    if !self.tail {
                        return Ok(());
                    }
                    self.control.eof_polls.fetch_add(1, Ordering::Relaxed);
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }
    }

    async fn handle_line(&mut self, line: &str) {
        let event = match parse_line(line) {
            Ok(Some(event)) => event,
            Ok(None) => return,
            Err(e) => {
                log::warn!("Skipping line: {} ({:?})", e, line);
                return;
            }
        };

        if let EventKind::Login { name } = &event.kind {
            self.acquire().await;
            if let Some(registry) = self.batch.as_deref_mut() {
                log::info!("Logged in as {}", name);
                registry.username = name.clone();
            }
            return;
        }

        let window_user = match self.scope.admit(event.timestamp) {
            Admission::Outside => {
                log::debug!("Outside scope: {} at {}", event.label(), event.timestamp);
                return;
            }
            Admission::Inside { username } => username.map(str::to_owned),
        };

        self.acquire().await;
        let Some(registry) = self.batch.as_deref_mut() else {
            return;
        };
        dispatch(registry, window_user.as_deref(), &*self.settings, &event);
    }

    /// Start a batch unless one is already open
    async fn acquire(&mut self) {
        if self.batch.is_none() {
            let guard = Arc::clone(&self.registry).write_owned().await;
            self.batch = Some(guard);
        }
    }

    /// End the current batch, if any, and tell readers it settled
    fn release(&mut self) {
        if let Some(guard) = self.batch.take() {
            drop(guard);
            self.batches += 1;
            self.updates.send_replace(self.batches);
        }
    }
}

impl Drop for Ingestor {
    // Runs before the fields drop, so `alive` is false by the time the
    // watch sender goes and readers see the channel close.
    fn drop(&mut self) {
        self.release();
        self.control.alive.store(false, Ordering::Release);
    }
}

fn dispatch(
    registry: &mut Registry,
    window_user: Option<&str>,
    settings: &dyn SettingsProvider,
    event: &Event,
) {
    let Registry {
        username,
        collectors,
        events,
    } = registry;

    let info = SessionInfo::new(window_user.unwrap_or(username.as_str()), settings);
    for (tab, e) in collectors.dispatch(&info, event) {
        log::warn!("{} collector rejected {:?}: {}", tab, event, e);
    }
    *events += 1;
}
