//! Window sessions.
//!
//! A [`Workspace`] owns what all windows of a process share: the store, the broadcast hub, the
//! clock and the notification sink. Each [`Window`] it opens gets its own repository mirror,
//! broadcast subscription and reminder scheduler.

use std::sync::Arc;

use tokio::{
    sync::watch,
    time::{MissedTickBehavior, interval},
};
use tracing::{debug, info, warn};

use crate::{
    Note, NoteId, Repository, Result,
    broadcast::{LocalBroadcaster, Subscription, WindowId},
    clock::{Clock, SystemClock},
    lock::LockGuard,
    repository::{
        config::Cfg,
        store::{self, StoreHandle},
    },
    scheduler::{NotificationSink, Scheduler},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowKind {
    /// The main board listing every note
    Board,
    /// A pop-out editor scoped to one note
    Note(NoteId),
}

#[derive(Debug)]
pub struct Workspace {
    cfg: Cfg,
    store: StoreHandle,
    hub: LocalBroadcaster,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn NotificationSink>,
}

impl Workspace {
    pub fn new(cfg: Cfg, store: StoreHandle, sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            cfg,
            store,
            hub: LocalBroadcaster::default(),
            clock: Arc::new(SystemClock),
            sink,
        }
    }

    /// Open the store the configuration points at.
    pub fn open(cfg: Cfg, sink: Arc<dyn NotificationSink>) -> Result<Self> {
        let store = store::open(&cfg.read())?;
        Ok(Self::new(cfg, store, sink))
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn cfg(&self) -> &Cfg {
        &self.cfg
    }

    pub fn lock_guard(&self) -> Result<LockGuard> {
        LockGuard::new(&self.cfg.read().lock)
    }

    pub fn open_board(&self) -> Result<Window> {
        self.window(WindowKind::Board)
    }

    /// Open a pop-out for `id`. If no note has that id yet, a blank one is created under it
    /// first. An empty id opens nothing.
    pub fn open_note(&self, id: &NoteId) -> Result<Option<Window>> {
        if id.trim().is_empty() {
            debug!("Ignored request to open a note without id");
            return Ok(None);
        }

        let mut window = self.window(WindowKind::Note(id.clone()))?;
        window.repo.open_or_create(id)?;

        Ok(Some(window))
    }

    fn window(&self, kind: WindowKind) -> Result<Window> {
        let id = WindowId::next();
        // Subscribe before loading so no change can slip in between
        let subscription = self.hub.subscribe(id);
        let repo = Repository::open(
            id,
            self.store.clone(),
            Arc::new(self.hub.clone()),
            self.clock.clone(),
        )?;
        let scheduler = Scheduler::new(&self.cfg.read().scheduler, self.sink.clone());

        info!("Opened {id} ({kind:?}) with {} notes", repo.notes().len());

        Ok(Window {
            id,
            kind,
            repo,
            subscription,
            scheduler,
            poll_store: false,
        })
    }
}

/// One open window.
#[derive(Debug)]
pub struct Window {
    id: WindowId,
    kind: WindowKind,
    repo: Repository,
    subscription: Subscription,
    scheduler: Scheduler,
    poll_store: bool,
}

impl Window {
    pub fn id(&self) -> WindowId {
        self.id
    }

    pub fn kind(&self) -> &WindowKind {
        &self.kind
    }

    pub fn repo(&self) -> &Repository {
        &self.repo
    }

    pub fn repo_mut(&mut self) -> &mut Repository {
        &mut self.repo
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// The note a pop-out is scoped to. `None` for the board or once the note was deleted.
    pub fn note(&self) -> Option<&Note> {
        match &self.kind {
            WindowKind::Board => None,
            WindowKind::Note(id) => self.repo.get(id),
        }
    }

    /// Reload on every tick as well. Needed when other processes write the store, since their
    /// signals never reach this one.
    pub fn set_poll_store(&mut self, poll_store: bool) {
        self.poll_store = poll_store;
    }

    /// Reload the mirror if another window signalled a change. Returns whether it reloaded.
    pub fn sync(&mut self) -> Result<bool> {
        if !self.subscription.take_changed() {
            return Ok(false);
        }

        self.repo.refresh_from_store()?;
        Ok(true)
    }

    /// One scheduler interval: bring the mirror up to date, then check reminders.
    pub fn tick(&mut self) -> Result<usize> {
        if self.poll_store {
            self.subscription.take_changed();
            self.repo.refresh_from_store()?;
        } else {
            self.sync()?;
        }

        self.scheduler.tick(&mut self.repo)
    }

    /// Drive the window until `shutdown` turns `true` or its sender goes away.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.scheduler.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut listening = true;

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    if let Err(err) = self.tick() {
                        warn!("{} failed to check reminders: {err}", self.id);
                    }
                }
                alive = self.subscription.changed(), if listening => {
                    if !alive {
                        listening = false;
                    } else if let Err(err) = self.repo.refresh_from_store() {
                        warn!("{} failed to reload notes: {err}", self.id);
                    }
                }
            }
        }

        info!("Closed {}", self.id);
    }
}
