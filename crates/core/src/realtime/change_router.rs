//! Debounced change routing from the data store to a mounted view.
//!
//! One forwarder task per watched table pumps its `ChangeStream` into a
//! single worker. The worker filters events by state and visible ids,
//! coalesces them per `ChangeKind` with a trailing-edge debounce, and
//! schedules the forced refresh that follows a resume. Until that refresh
//! fires, incoming events are absorbed into it.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};

use log::{debug, error, info};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Duration, Instant};

use super::realtime_model::{ChangeKind, ChangeListener, RefreshTrigger, RouterOptions, RouterState};
use crate::store::{ChangeEvent, ChangeEventType, DataStore};

enum Control {
    Event(ChangeEvent),
    Pause,
    Resume,
    Close,
}

struct RouterShared {
    state: Mutex<RouterState>,
    visible_ids: RwLock<HashSet<String>>,
    listener: Arc<dyn ChangeListener>,
}

impl RouterShared {
    fn accepts(&self, event: &ChangeEvent) -> bool {
        if *self.state.lock().unwrap() != RouterState::Active {
            return false;
        }
        match event.subject_id() {
            Some(id) => self.visible_ids.read().unwrap().contains(&id),
            None => false,
        }
    }

    /// Invokes the listener unless the router was closed meanwhile. The
    /// state lock is held for the call so `close` cannot interleave.
    fn notify(&self, trigger: RefreshTrigger) {
        let state = self.state.lock().unwrap();
        if *state == RouterState::Closed {
            return;
        }
        debug!("Change router firing {:?}", trigger);
        self.listener.on_change(trigger);
    }
}

/// Subscription of one mounted view to the watched tables.
///
/// Dropping the router closes it.
pub struct ChangeNotificationRouter {
    shared: Arc<RouterShared>,
    control_tx: mpsc::UnboundedSender<Control>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    subscribed_tables: Vec<String>,
}

impl ChangeNotificationRouter {
    /// Subscribes to every table in `options` and starts routing.
    ///
    /// Must be called from within a Tokio runtime. Tables that fail to
    /// subscribe are logged and skipped.
    pub fn subscribe(
        store: &dyn DataStore,
        options: RouterOptions,
        listener: Arc<dyn ChangeListener>,
    ) -> Self {
        let shared = Arc::new(RouterShared {
            state: Mutex::new(RouterState::Active),
            visible_ids: RwLock::new(HashSet::new()),
            listener,
        });
        let (control_tx, control_rx) = mpsc::unbounded_channel();

        let mut tasks = Vec::with_capacity(options.tables.len() + 1);
        let mut subscribed_tables = Vec::with_capacity(options.tables.len());
        for table in &options.tables {
            let mut stream = match store.subscribe(table, &ChangeEventType::ALL) {
                Ok(stream) => stream,
                Err(e) => {
                    error!("Failed to subscribe to changes on '{}': {}", table, e);
                    continue;
                }
            };
            subscribed_tables.push(table.clone());
            let tx = control_tx.clone();
            tasks.push(tokio::spawn(async move {
                while let Some(event) = stream.recv().await {
                    if tx.send(Control::Event(event)).is_err() {
                        break;
                    }
                }
            }));
        }

        tasks.push(tokio::spawn(route_changes(
            control_rx,
            shared.clone(),
            options.debounce,
            options.resume_delay,
        )));
        info!(
            "Change router subscribed to {} table(s)",
            subscribed_tables.len()
        );

        Self {
            shared,
            control_tx,
            tasks: Mutex::new(tasks),
            subscribed_tables,
        }
    }

    pub fn state(&self) -> RouterState {
        *self.shared.state.lock().unwrap()
    }

    pub fn subscribed_tables(&self) -> &[String] {
        &self.subscribed_tables
    }

    /// Replaces the set of application ids whose changes are forwarded.
    pub fn set_visible_ids(&self, ids: HashSet<String>) {
        *self.shared.visible_ids.write().unwrap() = ids;
    }

    pub fn visible_ids(&self) -> HashSet<String> {
        self.shared.visible_ids.read().unwrap().clone()
    }

    /// Stops forwarding and discards pending debounced work.
    pub fn pause(&self) {
        let mut state = self.shared.state.lock().unwrap();
        if *state == RouterState::Active {
            *state = RouterState::Paused;
            let _ = self.control_tx.send(Control::Pause);
            debug!("Change router paused");
        }
    }

    /// Resumes forwarding and schedules one `RefreshTrigger::Resync`.
    pub fn resume(&self) {
        let mut state = self.shared.state.lock().unwrap();
        if *state == RouterState::Paused {
            *state = RouterState::Active;
            let _ = self.control_tx.send(Control::Resume);
            debug!("Change router resumed");
        }
    }

    pub fn set_visibility(&self, visible: bool) {
        if visible {
            self.resume();
        } else {
            self.pause();
        }
    }

    /// Unsubscribes from every table and stops all timers. Idempotent.
    pub fn close(&self) {
        {
            let mut state = self.shared.state.lock().unwrap();
            if *state == RouterState::Closed {
                return;
            }
            *state = RouterState::Closed;
        }
        let _ = self.control_tx.send(Control::Close);
        for task in self.tasks.lock().unwrap().drain(..) {
            task.abort();
        }
        info!("Change router closed");
    }
}

impl Drop for ChangeNotificationRouter {
    fn drop(&mut self) {
        self.close();
    }
}

async fn route_changes(
    mut rx: mpsc::UnboundedReceiver<Control>,
    shared: Arc<RouterShared>,
    debounce: Duration,
    resume_delay: Duration,
) {
    let mut deadlines: HashMap<ChangeKind, Instant> = HashMap::new();
    let mut resync_at: Option<Instant> = None;

    loop {
        let next_deadline = deadlines.values().chain(resync_at.iter()).min().copied();

        tokio::select! {
            message = rx.recv() => {
                match message {
                    Some(Control::Event(event)) => {
                        let Some(kind) = ChangeKind::for_table(&event.table) else {
                            continue;
                        };
                        if resync_at.is_some() {
                            // The pending resync re-fetches everything, including
                            // changes still queued from before the resume.
                            continue;
                        }
                        if shared.accepts(&event) {
                            // Trailing edge: every accepted event pushes the deadline out.
                            deadlines.insert(kind, Instant::now() + debounce);
                        }
                    }
                    Some(Control::Pause) => {
                        deadlines.clear();
                        resync_at = None;
                    }
                    Some(Control::Resume) => {
                        deadlines.clear();
                        resync_at = Some(Instant::now() + resume_delay);
                    }
                    Some(Control::Close) | None => break,
                }
            }
            _ = sleep_until(next_deadline.unwrap_or_else(Instant::now)), if next_deadline.is_some() => {
                let now = Instant::now();
                let mut due: Vec<ChangeKind> = deadlines
                    .iter()
                    .filter(|(_, deadline)| **deadline <= now)
                    .map(|(kind, _)| *kind)
                    .collect();
                due.sort();
                for kind in due {
                    deadlines.remove(&kind);
                    shared.notify(RefreshTrigger::Changed(kind));
                }
                if resync_at.is_some_and(|at| at <= now) {
                    resync_at = None;
                    shared.notify(RefreshTrigger::Resync);
                }
            }
        }
    }
    debug!("Change router worker stopped");
}
