//! The collections board for one demand period.
//!
//! Owns the services, the status deduplicator and a change router. Changes
//! to visible applications schedule a refresh; a refresh rebuilds the whole
//! snapshot and is applied only if no newer refresh has landed first.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};

use chrono::{NaiveDate, Utc};
use log::{debug, info, warn};
use tokio::task::JoinHandle;

use super::board_model::{ApplicationRow, BoardSnapshot};
use crate::applications::{Application, ApplicationService};
use crate::audit::AuditLogService;
use crate::calling::{CallingStatusService, CallingSummary};
use crate::comments::{CommentService, CommentView};
use crate::dedup::RequestDeduplicator;
use crate::filters::{FilterCriteria, FilterEngine, FilterOutcome};
use crate::profiles::ProfileCache;
use crate::ptp::{PtpBucket, PtpService};
use crate::realtime::{
    ChangeListener, ChangeNotificationRouter, RefreshTrigger, RouterOptions, RouterState,
};
use crate::settings::CollectionsSettings;
use crate::status::{resolve_status, EnhancedStatusManager, FieldStatusService, MergedStatus};
use crate::store::DataStore;
use crate::utils::Period;

/// Schedules a board refresh for every trigger.
struct BoardRefresher {
    board: Weak<ApplicationBoard>,
}

impl ChangeListener for BoardRefresher {
    fn on_change(&self, trigger: RefreshTrigger) {
        let Some(board) = self.board.upgrade() else {
            return;
        };
        debug!("Board refresh scheduled by {:?}", trigger);
        // The handle moves into the task so the board is never dropped on the router worker.
        tokio::spawn(async move {
            board.refresh().await;
        });
    }
}

pub struct ApplicationBoard {
    period: Period,
    today: NaiveDate,
    recent_comment_limit: usize,
    applications: ApplicationService,
    statuses: EnhancedStatusManager,
    status_updates: FieldStatusService,
    ptp: PtpService,
    calling: CallingStatusService,
    comments: CommentService,
    audit: Arc<AuditLogService>,
    router: ChangeNotificationRouter,
    sweeper: Mutex<Option<JoinHandle<()>>>,
    snapshot: RwLock<Arc<BoardSnapshot>>,
    criteria: RwLock<FilterCriteria>,
    next_generation: AtomicU64,
    alive: AtomicBool,
}

impl ApplicationBoard {
    /// Builds the board and subscribes it to changes. Nothing is fetched
    /// until the first `refresh`. Must be called from within a Tokio runtime.
    pub fn mount(
        store: Arc<dyn DataStore>,
        settings: CollectionsSettings,
        period: Period,
        today: NaiveDate,
    ) -> Arc<Self> {
        let profiles = Arc::new(ProfileCache::new(store.clone()));
        let audit = Arc::new(AuditLogService::new(store.clone(), profiles.clone()));
        let requests = Arc::new(RequestDeduplicator::new(settings.dedup_ttl()));
        let sweeper = requests.spawn_sweeper(settings.dedup_sweep_interval());

        let board = Arc::new_cyclic(|weak: &Weak<ApplicationBoard>| {
            let router = ChangeNotificationRouter::subscribe(
                store.as_ref(),
                RouterOptions::from_settings(&settings),
                Arc::new(BoardRefresher {
                    board: weak.clone(),
                }),
            );
            ApplicationBoard {
                period,
                today,
                recent_comment_limit: settings.recent_comment_limit,
                applications: ApplicationService::new(store.clone()),
                statuses: EnhancedStatusManager::from_store(store.clone(), requests),
                status_updates: FieldStatusService::new(store.clone(), audit.clone()),
                ptp: PtpService::new(store.clone(), audit.clone()),
                calling: CallingStatusService::new(store.clone(), audit.clone()),
                comments: CommentService::new(store.clone(), profiles, audit.clone()),
                audit,
                router,
                sweeper: Mutex::new(Some(sweeper)),
                snapshot: RwLock::new(Arc::new(BoardSnapshot::empty(period))),
                criteria: RwLock::new(FilterCriteria::new()),
                next_generation: AtomicU64::new(1),
                alive: AtomicBool::new(true),
            }
        });
        info!("Mounted collections board for {}", period);
        board
    }

    pub fn period(&self) -> Period {
        self.period
    }

    pub fn is_mounted(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    pub fn router_state(&self) -> RouterState {
        self.router.state()
    }

    pub fn status_updates(&self) -> &FieldStatusService {
        &self.status_updates
    }

    pub fn ptp(&self) -> &PtpService {
        &self.ptp
    }

    pub fn calling(&self) -> &CallingStatusService {
        &self.calling
    }

    pub fn comments(&self) -> &CommentService {
        &self.comments
    }

    pub fn audit(&self) -> &AuditLogService {
        &self.audit
    }

    pub fn snapshot(&self) -> Arc<BoardSnapshot> {
        self.snapshot.read().unwrap().clone()
    }

    /// Rebuilds the snapshot. Returns false when nothing was applied: the
    /// application list failed (the previous snapshot is kept), the board
    /// was unmounted meanwhile, or a newer refresh already landed.
    pub async fn refresh(&self) -> bool {
        if !self.is_mounted() {
            return false;
        }
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);

        let applications = match self.applications.list(self.period).await {
            Ok(applications) => applications,
            Err(e) => {
                warn!(
                    "Keeping last board snapshot; failed to list applications for {}: {}",
                    self.period, e
                );
                return false;
            }
        };

        let ids: HashSet<String> = applications
            .iter()
            .map(|app| app.applicant_id.clone())
            .collect();
        let period = Some(self.period);
        let (mut statuses, mut ptp_dates, mut calling, mut comments) = futures::join!(
            self.statuses.merge_detailed(&ids, period),
            self.ptp.latest_many(&ids, period),
            self.calling.latest_many(&ids, period),
            self.comments.recent_many(&ids, self.recent_comment_limit),
        );

        if !self.is_mounted() {
            debug!("Discarding refresh for unmounted board");
            return false;
        }

        let rows: Vec<ApplicationRow> = applications
            .into_iter()
            .map(|application| {
                build_row(
                    application,
                    self.today,
                    &mut statuses,
                    &mut ptp_dates,
                    &mut calling,
                    &mut comments,
                )
            })
            .collect();

        {
            let mut current = self.snapshot.write().unwrap();
            if current.generation > generation {
                debug!("Discarding stale refresh {}", generation);
                return false;
            }
            *current = Arc::new(BoardSnapshot {
                period: self.period,
                rows,
                generation,
                refreshed_at: Some(Utc::now()),
            });
        }
        self.publish_visible_ids();
        true
    }

    /// Filters the current snapshot and makes the result the visible set.
    pub fn view(&self, criteria: FilterCriteria) -> FilterOutcome<ApplicationRow> {
        let snapshot = self.snapshot();
        let outcome = FilterEngine::apply(&snapshot.rows, &criteria);
        *self.criteria.write().unwrap() = criteria;
        self.router.set_visible_ids(
            outcome
                .filtered
                .iter()
                .map(|row| row.applicant_id().to_string())
                .collect(),
        );
        outcome
    }

    /// Re-applies the last criteria after a refresh.
    fn publish_visible_ids(&self) {
        let criteria = self.criteria.read().unwrap().clone();
        let snapshot = self.snapshot();
        let visible: HashSet<String> = snapshot
            .rows
            .iter()
            .filter(|row| criteria.matches(*row, None))
            .map(|row| row.applicant_id().to_string())
            .collect();
        self.router.set_visible_ids(visible);
    }

    /// Pauses change routing while hidden; showing again forces a resync.
    pub fn set_visible(&self, visible: bool) {
        self.router.set_visibility(visible);
    }

    /// Tears the board down. Refreshes in flight are discarded. Idempotent.
    pub fn unmount(&self) {
        if !self.alive.swap(false, Ordering::SeqCst) {
            return;
        }
        self.router.close();
        if let Some(sweeper) = self.sweeper.lock().unwrap().take() {
            sweeper.abort();
        }
        info!("Unmounted collections board for {}", self.period);
    }
}

impl Drop for ApplicationBoard {
    fn drop(&mut self) {
        self.unmount();
    }
}

fn build_row(
    application: Application,
    today: NaiveDate,
    statuses: &mut HashMap<String, MergedStatus>,
    ptp_dates: &mut HashMap<String, Option<NaiveDate>>,
    calling: &mut HashMap<String, CallingSummary>,
    comments: &mut HashMap<String, Vec<CommentView>>,
) -> ApplicationRow {
    let id = application.applicant_id.as_str();
    let status = statuses.remove(id).unwrap_or_else(|| {
        let (status, origin) = resolve_status(None, None);
        MergedStatus {
            status,
            origin,
            field_status: None,
            collection_status: None,
        }
    });
    let ptp_date = ptp_dates.remove(id).flatten();
    ApplicationRow {
        status,
        ptp_date,
        ptp_bucket: PtpBucket::classify(ptp_date, today),
        calling: calling.remove(id).unwrap_or_default(),
        recent_comments: comments.remove(id).unwrap_or_default(),
        application,
    }
}
