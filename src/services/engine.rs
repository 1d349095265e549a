//! Scanner mode engine
//!
//! The central state machine. Owns the current mode and its session
//! payload, dispatches every resolved scan to the active mode's policy,
//! and publishes a read-only snapshot after every mutation.
//!
//! All mutations go through one `tokio::sync::Mutex`, which gives the
//! single-writer discipline the session invariants rely on. The lock is
//! never held across network I/O; instead every suspension captures the
//! current `epoch` and re-checks it afterwards, so a resolution that
//! lands after a mode switch or reset is dropped instead of being applied
//! to a session it no longer belongs to. Timers (search cooldown, return
//! display window) follow the same rule.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::{watch, Mutex};
use utoipa::ToSchema;

use crate::{
    config::ScannerConfig,
    error::{AppError, AppResult},
    models::{
        BatchResult, EngineSnapshot, InventoryEntry, InventoryReport, InventorySession,
        LoanSession, Mode, ModeState, ResolvedItem,
    },
    normalize::{normalize, NormalizedKey},
    services::{
        circulation::CirculationClient,
        feedback::{Feedback, FeedbackPort},
        resolver::CatalogResolver,
        submitter::BatchSubmitter,
    },
};

/// Result of one scan or manual entry
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "outcome", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScanOutcome {
    /// Scanning was paused or the session moved on; the event was dropped,
    /// not queued
    Dropped,
    /// SEARCH hit; `match_count > 1` means the first-in-page tie-break
    /// applied
    Found {
        item: ResolvedItem,
        match_count: usize,
    },
    Returned {
        item: ResolvedItem,
    },
    ReturnFailed {
        item: ResolvedItem,
        message: String,
    },
    InventoryAdded {
        item: ResolvedItem,
        position: usize,
    },
    DuplicateEntry {
        item: ResolvedItem,
    },
    SubjectSelected {
        subject_id: i32,
    },
    InvalidSubjectCode {
        message: String,
    },
    CartAdded {
        item: ResolvedItem,
        position: usize,
    },
    /// Resolution failed; `not_found` distinguishes a miss from a backend
    /// failure
    LookupError {
        message: String,
        not_found: bool,
    },
}

/// One scan's outcome, the feedback that was emitted for it, and the
/// state snapshot after the mutation
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ScanReport {
    pub outcome: ScanOutcome,
    pub feedback: Option<Feedback>,
    pub snapshot: EngineSnapshot,
}

/// Response to a completed loan batch
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LoanCompletion {
    pub subject_id: i32,
    pub submitted: usize,
    pub result: BatchResult,
    pub snapshot: EngineSnapshot,
}

/// Response to a finished inventory session
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct InventoryCompletion {
    pub report: InventoryReport,
    pub exported_to: String,
    pub snapshot: EngineSnapshot,
}

struct EngineState {
    mode_state: ModeState,
    is_scanning: bool,
    last_code: Option<String>,
    /// Request token: bumped on every reset-like transition; suspended
    /// work re-checks it before touching state
    epoch: u64,
}

impl EngineState {
    fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            mode: self.mode_state.mode(),
            is_scanning: self.is_scanning,
            last_code: self.last_code.clone(),
            session: self.mode_state.clone(),
        }
    }
}

struct EngineInner {
    resolver: CatalogResolver,
    circulation: Arc<dyn CirculationClient>,
    submitter: BatchSubmitter,
    feedback: Arc<dyn FeedbackPort>,
    search_cooldown: Duration,
    return_display: Duration,
    id_upper_bound: i64,
    state: Mutex<EngineState>,
    snapshot_tx: watch::Sender<EngineSnapshot>,
}

/// Cheap-to-clone handle to the engine; timer tasks hold their own clone
#[derive(Clone)]
pub struct ScannerEngine {
    inner: Arc<EngineInner>,
}

impl ScannerEngine {
    pub fn new(
        resolver: CatalogResolver,
        circulation: Arc<dyn CirculationClient>,
        submitter: BatchSubmitter,
        feedback: Arc<dyn FeedbackPort>,
        config: &ScannerConfig,
    ) -> Self {
        let state = EngineState {
            mode_state: ModeState::init(Mode::Search, Utc::now()),
            is_scanning: true,
            last_code: None,
            epoch: 0,
        };
        let (snapshot_tx, _) = watch::channel(state.snapshot());
        let id_upper_bound = resolver.id_upper_bound();

        Self {
            inner: Arc::new(EngineInner {
                resolver,
                circulation,
                submitter,
                feedback,
                search_cooldown: Duration::from_secs(config.search_cooldown_seconds),
                return_display: Duration::from_secs(config.return_display_seconds),
                id_upper_bound,
                state: Mutex::new(state),
                snapshot_tx,
            }),
        }
    }

    /// Watch the snapshot stream; a new value arrives after every mutation
    pub fn subscribe(&self) -> watch::Receiver<EngineSnapshot> {
        self.inner.snapshot_tx.subscribe()
    }

    pub async fn snapshot(&self) -> EngineSnapshot {
        self.inner.state.lock().await.snapshot()
    }

    fn publish(&self, state: &EngineState) {
        let _ = self.inner.snapshot_tx.send_replace(state.snapshot());
    }

    fn emit(&self, feedback: Feedback) {
        self.inner.feedback.emit(feedback);
    }

    /// Process one decode event from the scan source.
    ///
    /// While `is_scanning == false` the event is dropped, never buffered:
    /// a single physical scan can produce several camera frames and a
    /// backlog of stale lookups must not fire after the operator moved on.
    pub async fn scan(&self, raw: &str) -> AppResult<ScanReport> {
        let code = raw.trim().to_string();

        let epoch = {
            let mut guard = self.inner.state.lock().await;
            let state = &mut *guard;
            if !state.is_scanning || code.is_empty() {
                return Ok(self.report(state, ScanOutcome::Dropped, None));
            }
            state.last_code = Some(code.clone());

            match &state.mode_state {
                // LOAN phase 1 needs no catalog lookup
                ModeState::Loan(LoanSession::AwaitingUser) => {
                    return Ok(self.select_subject(state, &code));
                }
                // SEARCH pauses scanning for the duration of the lookup
                ModeState::Search { .. } => {
                    state.is_scanning = false;
                }
                _ => {}
            }
            self.publish(state);
            state.epoch
        };

        let resolution = self.inner.resolver.resolve(&code).await;

        let mut guard = self.inner.state.lock().await;
        if guard.epoch != epoch {
            // The session this scan belonged to is gone
            tracing::debug!("Dropping stale resolution for '{}'", code);
            return Ok(self.report(&guard, ScanOutcome::Dropped, None));
        }

        let resolution = match resolution {
            Ok(resolution) => resolution,
            Err(err) => {
                let not_found = matches!(err, AppError::NotFound(_));
                self.emit(Feedback::Error);

                match &guard.mode_state {
                    // SEARCH stays paused but resumes by itself after the
                    // cooldown; success requires an explicit reset instead
                    ModeState::Search { .. } => self.spawn_search_resume(epoch),
                    ModeState::QuickReturn => self.spawn_display_clear(epoch),
                    _ => {}
                }

                let report = self.report(
                    &guard,
                    ScanOutcome::LookupError {
                        message: err.to_string(),
                        not_found,
                    },
                    Some(Feedback::Error),
                );
                self.publish(&guard);
                return Ok(report);
            }
        };

        // Quick return commits against the backend; release the lock first
        if matches!(guard.mode_state, ModeState::QuickReturn) {
            drop(guard);
            return self.quick_return(epoch, resolution.item).await;
        }

        let state = &mut *guard;
        let item = resolution.item;
        let (outcome, feedback) = match &mut state.mode_state {
            ModeState::Search { found } => {
                *found = Some(item.clone());
                (
                    ScanOutcome::Found {
                        item,
                        match_count: resolution.match_count,
                    },
                    Feedback::Success,
                )
            }
            ModeState::Inventory(session) => {
                if session.contains(item.id) {
                    // Not re-timestamped, not re-counted
                    (ScanOutcome::DuplicateEntry { item }, Feedback::Duplicate)
                } else {
                    session.entries.push(InventoryEntry {
                        item_id: item.id,
                        name: item.name.clone(),
                        isbn: item.isbn.clone(),
                        scanned_at: Utc::now(),
                    });
                    let position = session.entries.len();
                    state.last_code = None;
                    (ScanOutcome::InventoryAdded { item, position }, Feedback::Success)
                }
            }
            ModeState::Loan(LoanSession::BuildingCart { cart, .. }) => {
                if cart.iter().any(|c| c.id == item.id) {
                    (ScanOutcome::DuplicateEntry { item }, Feedback::Duplicate)
                } else {
                    cart.push(item.clone());
                    let position = cart.len();
                    state.last_code = None;
                    (ScanOutcome::CartAdded { item, position }, Feedback::Success)
                }
            }
            // Phase changed while the lookup was in flight
            ModeState::Loan(LoanSession::AwaitingUser) => {
                return Ok(self.report(state, ScanOutcome::Dropped, None));
            }
            ModeState::QuickReturn => unreachable!("handled above"),
        };

        self.emit(feedback);
        let report = self.report(state, outcome, Some(feedback));
        self.publish(state);
        Ok(report)
    }

    /// Manual code entry: the fully-functional parallel input path for
    /// when no camera is available. Same dispatch as `scan`, but an empty
    /// submission is a user error rather than a silently dropped frame.
    pub async fn manual_submit(&self, text: &str) -> AppResult<ScanReport> {
        if text.trim().is_empty() {
            return Err(AppError::EmptyCode);
        }
        self.scan(text).await
    }

    /// Switch workflow mode. A no-op when unchanged; otherwise all
    /// mode-local state of both sides is discarded, which is why unsaved
    /// progress requires an explicit confirmation first.
    pub async fn change_mode(&self, mode: Mode, confirm: bool) -> AppResult<EngineSnapshot> {
        let mut state = self.inner.state.lock().await;
        if state.mode_state.mode() == mode {
            return Ok(state.snapshot());
        }
        if state.mode_state.has_unsaved_progress() && !confirm {
            return Err(AppError::ConfirmationRequired(format!(
                "Switching from {:?} discards the current session; confirm to proceed",
                state.mode_state.mode()
            )));
        }

        tracing::info!("Mode change: {:?} -> {:?}", state.mode_state.mode(), mode);
        state.epoch += 1;
        state.is_scanning = true;
        state.last_code = None;
        state.mode_state = ModeState::init(mode, Utc::now());
        self.publish(&state);
        Ok(state.snapshot())
    }

    /// SEARCH reset: clear the displayed result and resume scanning
    pub async fn reset_scan(&self) -> AppResult<EngineSnapshot> {
        let mut state = self.inner.state.lock().await;
        state.epoch += 1;
        state.is_scanning = true;
        state.last_code = None;
        if let ModeState::Search { found } = &mut state.mode_state {
            *found = None;
        }
        self.publish(&state);
        Ok(state.snapshot())
    }

    /// Finish the inventory session: export the report, then clear
    pub async fn finish_inventory(&self) -> AppResult<InventoryCompletion> {
        let report = {
            let mut guard = self.inner.state.lock().await;
            let state = &mut *guard;
            let session = match &mut state.mode_state {
                ModeState::Inventory(session) => session,
                _ => return Err(AppError::Validation("Not in inventory mode".to_string())),
            };
            if session.entries.is_empty() {
                return Err(AppError::Validation("No items scanned yet".to_string()));
            }

            let now = Utc::now();
            let finished = std::mem::replace(session, InventorySession::new(now));
            state.epoch += 1;
            state.last_code = None;
            self.publish(state);
            finished.into_report(now)
        };

        let path = self.inner.submitter.export_inventory(&report)?;
        self.emit(Feedback::Success);

        let snapshot = self.snapshot().await;
        Ok(InventoryCompletion {
            report,
            exported_to: path.display().to_string(),
            snapshot,
        })
    }

    /// Wipe the inventory session without exporting
    pub async fn clear_inventory(&self, confirm: bool) -> AppResult<EngineSnapshot> {
        let mut guard = self.inner.state.lock().await;
        let state = &mut *guard;
        let session = match &mut state.mode_state {
            ModeState::Inventory(session) => session,
            _ => return Err(AppError::Validation("Not in inventory mode".to_string())),
        };
        if !confirm {
            return Err(AppError::ConfirmationRequired(format!(
                "Clearing discards {} scanned item(s); confirm to proceed",
                session.entries.len()
            )));
        }

        *session = InventorySession::new(Utc::now());
        state.epoch += 1;
        state.last_code = None;
        self.publish(state);
        Ok(state.snapshot())
    }

    /// Submit the loan cart as one batch and reset to the subject phase.
    ///
    /// The reset happens regardless of the batch outcome: a partially
    /// applied batch is reported verbatim for manual follow-up, never
    /// retried from here.
    pub async fn complete_loan(&self) -> AppResult<LoanCompletion> {
        let (subject_id, item_ids) = {
            let mut state = self.inner.state.lock().await;
            let (subject_id, item_ids) = match &state.mode_state {
                ModeState::Loan(LoanSession::BuildingCart { subject_id, cart }) => {
                    if cart.is_empty() {
                        return Err(AppError::Validation("Loan cart is empty".to_string()));
                    }
                    (*subject_id, cart.iter().map(|i| i.id).collect::<Vec<_>>())
                }
                ModeState::Loan(LoanSession::AwaitingUser) => {
                    return Err(AppError::Validation("No subject selected".to_string()))
                }
                _ => return Err(AppError::Validation("Not in loan mode".to_string())),
            };

            state.mode_state = ModeState::Loan(LoanSession::AwaitingUser);
            state.epoch += 1;
            state.last_code = None;
            self.publish(&state);
            (subject_id, item_ids)
        };

        let submitted = item_ids.len();
        match self.inner.submitter.submit_loans(subject_id, &item_ids).await {
            Ok(result) => {
                if result.failure_count == 0 {
                    self.emit(Feedback::Success);
                } else {
                    self.emit(Feedback::Error);
                }
                let snapshot = self.snapshot().await;
                Ok(LoanCompletion {
                    subject_id,
                    submitted,
                    result,
                    snapshot,
                })
            }
            Err(err) => {
                self.emit(Feedback::Error);
                Err(err)
            }
        }
    }

    /// Abandon the current loan subject and cart
    pub async fn reset_loan_subject(&self) -> AppResult<EngineSnapshot> {
        let mut state = self.inner.state.lock().await;
        match &state.mode_state {
            ModeState::Loan(_) => {}
            _ => return Err(AppError::Validation("Not in loan mode".to_string())),
        }
        state.mode_state = ModeState::Loan(LoanSession::AwaitingUser);
        state.epoch += 1;
        state.last_code = None;
        self.publish(&state);
        Ok(state.snapshot())
    }

    /// Remove one item from the loan cart
    pub async fn remove_loan_item(&self, item_id: i32) -> AppResult<EngineSnapshot> {
        let mut guard = self.inner.state.lock().await;
        let state = &mut *guard;
        let cart = match &mut state.mode_state {
            ModeState::Loan(LoanSession::BuildingCart { cart, .. }) => cart,
            _ => return Err(AppError::Validation("No loan cart".to_string())),
        };
        let before = cart.len();
        cart.retain(|i| i.id != item_id);
        if cart.len() == before {
            return Err(AppError::NotFound(format!(
                "Item {} is not in the cart",
                item_id
            )));
        }
        self.publish(state);
        Ok(state.snapshot())
    }

    // LOAN phase 1: the code must be a plain positive numeric subject id
    fn select_subject(&self, state: &mut EngineState, code: &str) -> ScanReport {
        match normalize(code, self.inner.id_upper_bound) {
            Ok(NormalizedKey::NumericId(id)) => {
                state.mode_state = ModeState::Loan(LoanSession::BuildingCart {
                    subject_id: id as i32,
                    cart: Vec::new(),
                });
                state.last_code = None;
                self.emit(Feedback::Success);
                let report = self.report(
                    state,
                    ScanOutcome::SubjectSelected {
                        subject_id: id as i32,
                    },
                    Some(Feedback::Success),
                );
                self.publish(state);
                report
            }
            _ => {
                self.emit(Feedback::Error);
                let report = self.report(
                    state,
                    ScanOutcome::InvalidSubjectCode {
                        message: format!(
                            "'{}' is not a valid subject code; scan a user card (numeric id)",
                            code
                        ),
                    },
                    Some(Feedback::Error),
                );
                self.publish(state);
                report
            }
        }
    }

    // QUICK_RETURN commit: one independent, immediately-committed
    // transaction per scan. A double scan of the same physical book fails
    // server-side and is reported, not swallowed.
    async fn quick_return(&self, epoch: u64, item: ResolvedItem) -> AppResult<ScanReport> {
        let returned = self.inner.circulation.create_return(item.id).await;

        let mut state = self.inner.state.lock().await;
        if state.epoch != epoch {
            return Ok(self.report(&state, ScanOutcome::Dropped, None));
        }

        self.spawn_display_clear(epoch);
        let (outcome, feedback) = match returned {
            Ok(()) => (ScanOutcome::Returned { item }, Feedback::Success),
            Err(err) => (
                ScanOutcome::ReturnFailed {
                    item,
                    message: err.to_string(),
                },
                Feedback::Error,
            ),
        };
        self.emit(feedback);
        let report = self.report(&state, outcome, Some(feedback));
        self.publish(&state);
        Ok(report)
    }

    fn report(
        &self,
        state: &EngineState,
        outcome: ScanOutcome,
        feedback: Option<Feedback>,
    ) -> ScanReport {
        ScanReport {
            outcome,
            feedback,
            snapshot: state.snapshot(),
        }
    }

    // SEARCH resumes scanning by itself after a failed lookup
    fn spawn_search_resume(&self, epoch: u64) {
        let engine = self.clone();
        let delay = self.inner.search_cooldown;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut state = engine.inner.state.lock().await;
            if state.epoch == epoch
                && !state.is_scanning
                && matches!(state.mode_state, ModeState::Search { .. })
            {
                state.is_scanning = true;
                state.last_code = None;
                engine.publish(&state);
            }
        });
    }

    // QUICK_RETURN keeps scanning; only the displayed code is cleared
    fn spawn_display_clear(&self, epoch: u64) {
        let engine = self.clone();
        let delay = self.inner.return_display;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut state = engine.inner.state.lock().await;
            if state.epoch == epoch && state.last_code.is_some() {
                state.last_code = None;
                engine.publish(&state);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Page;
    use crate::services::catalog::CatalogClient;
    use crate::services::circulation::MockCirculationClient;
    use crate::services::feedback::NoopFeedback;
    use async_trait::async_trait;
    use std::collections::HashMap;

    /// Catalog stub mapping codes to items, with an optional response
    /// delay to exercise in-flight behavior under paused time
    struct TableCatalog {
        items: HashMap<String, ResolvedItem>,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl CatalogClient for TableCatalog {
        async fn search(
            &self,
            keyword: &str,
            _available_only: bool,
            _page: u32,
            _page_size: u32,
        ) -> AppResult<Page<ResolvedItem>> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            match self.items.get(keyword) {
                Some(item) => Ok(Page {
                    content: vec![item.clone()],
                    total: 1,
                }),
                None => Ok(Page::empty()),
            }
        }

        async fn get_by_id(&self, id: i64) -> AppResult<ResolvedItem> {
            Err(AppError::NotFound(format!("No item with id {}", id)))
        }
    }

    fn item(id: i32, name: &str) -> ResolvedItem {
        ResolvedItem {
            id,
            name: name.to_string(),
            isbn: None,
            available_copies: 1,
        }
    }

    fn catalog(entries: &[(&str, i32)]) -> TableCatalog {
        TableCatalog {
            items: entries
                .iter()
                .map(|(code, id)| (code.to_string(), item(*id, code)))
                .collect(),
            delay: None,
        }
    }

    fn engine_with(catalog: TableCatalog, circulation: MockCirculationClient) -> ScannerEngine {
        let circulation: Arc<dyn CirculationClient> = Arc::new(circulation);
        let resolver = CatalogResolver::new(Arc::new(catalog), 5, 1_000_000);
        let submitter = BatchSubmitter::new(
            Arc::clone(&circulation),
            std::env::temp_dir().join(format!(
                "bibscan-engine-tests-{}",
                Utc::now().timestamp_nanos_opt().unwrap_or_default()
            )),
        );
        ScannerEngine::new(
            resolver,
            circulation,
            submitter,
            Arc::new(NoopFeedback),
            &ScannerConfig::default(),
        )
    }

    fn inventory_len(snapshot: &EngineSnapshot) -> usize {
        match &snapshot.session {
            ModeState::Inventory(session) => session.entries.len(),
            other => panic!("expected inventory session, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_initial_state() {
        let engine = engine_with(catalog(&[]), MockCirculationClient::new());
        let snapshot = engine.snapshot().await;
        assert_eq!(snapshot.mode, Mode::Search);
        assert!(snapshot.is_scanning);
    }

    #[tokio::test]
    async fn test_search_pauses_until_explicit_reset() {
        let engine = engine_with(catalog(&[("dune", 1)]), MockCirculationClient::new());

        let report = engine.scan("dune").await.unwrap();
        assert!(matches!(report.outcome, ScanOutcome::Found { ref item, .. } if item.id == 1));
        assert!(!report.snapshot.is_scanning);

        // Success does not auto-resume; the next frame is dropped
        let report = engine.scan("dune").await.unwrap();
        assert!(matches!(report.outcome, ScanOutcome::Dropped));

        let snapshot = engine.reset_scan().await.unwrap();
        assert!(snapshot.is_scanning);
        assert!(matches!(snapshot.session, ModeState::Search { found: None }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_failure_auto_resumes_after_cooldown() {
        let engine = engine_with(catalog(&[]), MockCirculationClient::new());

        let report = engine.scan("unknown code").await.unwrap();
        assert!(matches!(
            report.outcome,
            ScanOutcome::LookupError { not_found: true, .. }
        ));
        assert!(!report.snapshot.is_scanning);

        // Cooldown is 3 s; no user action in between
        tokio::time::sleep(Duration::from_secs(4)).await;
        assert!(engine.snapshot().await.is_scanning);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scan_dropped_while_resolve_in_flight() {
        let mut slow = catalog(&[("dune", 1)]);
        slow.delay = Some(Duration::from_secs(5));
        let engine = engine_with(slow, MockCirculationClient::new());

        let background = engine.clone();
        let pending = tokio::spawn(async move { background.scan("dune").await });
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;

        // A new frame while the lookup is in flight is dropped, not queued
        let report = engine.scan("dune").await.unwrap();
        assert!(matches!(report.outcome, ScanOutcome::Dropped));

        tokio::time::sleep(Duration::from_secs(6)).await;
        let first = pending.await.unwrap().unwrap();
        assert!(matches!(first.outcome, ScanOutcome::Found { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_resolution_not_applied_to_new_session() {
        let mut slow = catalog(&[("dune", 1)]);
        slow.delay = Some(Duration::from_secs(5));
        let engine = engine_with(slow, MockCirculationClient::new());

        let background = engine.clone();
        let pending = tokio::spawn(async move { background.scan("dune").await });
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;

        engine.change_mode(Mode::Inventory, false).await.unwrap();
        tokio::time::sleep(Duration::from_secs(6)).await;

        let report = pending.await.unwrap().unwrap();
        assert!(matches!(report.outcome, ScanOutcome::Dropped));
        assert_eq!(inventory_len(&engine.snapshot().await), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_quick_return_reports_each_scan() {
        let mut circulation = MockCirculationClient::new();
        circulation
            .expect_create_return()
            .times(1)
            .returning(|_| Ok(()));
        circulation
            .expect_create_return()
            .times(1)
            .returning(|_| Err(AppError::BadRequest("Already returned".to_string())));

        let engine = engine_with(catalog(&[("dune", 1)]), circulation);
        engine.change_mode(Mode::QuickReturn, false).await.unwrap();

        let report = engine.scan("dune").await.unwrap();
        assert!(matches!(report.outcome, ScanOutcome::Returned { .. }));
        assert!(report.snapshot.is_scanning);

        // Second scan of the same book fails server-side and is reported
        let report = engine.scan("dune").await.unwrap();
        assert!(matches!(report.outcome, ScanOutcome::ReturnFailed { .. }));
        assert!(report.snapshot.is_scanning);

        // Display window elapses; code display cleared without user action
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(engine.snapshot().await.last_code.is_none());
    }

    #[tokio::test]
    async fn test_inventory_duplicates_are_rejected() {
        let engine = engine_with(
            catalog(&[("dune", 1), ("hobbit", 2)]),
            MockCirculationClient::new(),
        );
        engine.change_mode(Mode::Inventory, false).await.unwrap();

        let report = engine.scan("dune").await.unwrap();
        assert!(matches!(
            report.outcome,
            ScanOutcome::InventoryAdded { position: 1, .. }
        ));
        assert_eq!(report.feedback, Some(Feedback::Success));

        let report = engine.scan("dune").await.unwrap();
        assert!(matches!(report.outcome, ScanOutcome::DuplicateEntry { .. }));
        assert_eq!(report.feedback, Some(Feedback::Duplicate));
        assert_eq!(inventory_len(&report.snapshot), 1);

        let report = engine.scan("hobbit").await.unwrap();
        assert!(matches!(
            report.outcome,
            ScanOutcome::InventoryAdded { position: 2, .. }
        ));
    }

    #[tokio::test]
    async fn test_finish_inventory_exports_then_clears() {
        let engine = engine_with(
            catalog(&[("a", 1), ("b", 2), ("c", 3)]),
            MockCirculationClient::new(),
        );
        engine.change_mode(Mode::Inventory, false).await.unwrap();
        for code in ["a", "b", "c"] {
            engine.scan(code).await.unwrap();
        }

        let completion = engine.finish_inventory().await.unwrap();
        assert_eq!(completion.report.total_scanned, 3);
        let ids: Vec<i32> = completion.report.entries.iter().map(|e| e.item_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(completion.report.duration_seconds >= 0);

        let exported = std::path::Path::new(&completion.exported_to);
        assert!(exported.exists());
        std::fs::remove_dir_all(exported.parent().unwrap()).unwrap();

        // Session cleared, still in inventory mode
        assert_eq!(inventory_len(&completion.snapshot), 0);
        let err = engine.finish_inventory().await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_clear_inventory_requires_confirmation() {
        let engine = engine_with(catalog(&[("dune", 1)]), MockCirculationClient::new());
        engine.change_mode(Mode::Inventory, false).await.unwrap();
        engine.scan("dune").await.unwrap();

        let err = engine.clear_inventory(false).await.unwrap_err();
        assert!(matches!(err, AppError::ConfirmationRequired(_)));

        let snapshot = engine.clear_inventory(true).await.unwrap();
        assert_eq!(inventory_len(&snapshot), 0);
    }

    #[tokio::test]
    async fn test_loan_subject_phase() {
        let engine = engine_with(catalog(&[]), MockCirculationClient::new());
        engine.change_mode(Mode::Loan, false).await.unwrap();

        for bad in ["abc", "-3", "0"] {
            let report = engine.scan(bad).await.unwrap();
            assert!(
                matches!(report.outcome, ScanOutcome::InvalidSubjectCode { .. }),
                "'{}' must be rejected",
                bad
            );
            assert!(matches!(
                report.snapshot.session,
                ModeState::Loan(LoanSession::AwaitingUser)
            ));
        }

        let report = engine.scan("42").await.unwrap();
        assert!(matches!(
            report.outcome,
            ScanOutcome::SubjectSelected { subject_id: 42 }
        ));
        assert!(matches!(
            report.snapshot.session,
            ModeState::Loan(LoanSession::BuildingCart { subject_id: 42, .. })
        ));
    }

    #[tokio::test]
    async fn test_loan_cart_duplicates_and_removal() {
        let engine = engine_with(
            catalog(&[("dune", 10), ("hobbit", 11)]),
            MockCirculationClient::new(),
        );
        engine.change_mode(Mode::Loan, false).await.unwrap();
        engine.scan("7").await.unwrap();

        let report = engine.scan("dune").await.unwrap();
        assert!(matches!(report.outcome, ScanOutcome::CartAdded { position: 1, .. }));

        let report = engine.scan("dune").await.unwrap();
        assert!(matches!(report.outcome, ScanOutcome::DuplicateEntry { .. }));

        engine.scan("hobbit").await.unwrap();
        let snapshot = engine.remove_loan_item(10).await.unwrap();
        match snapshot.session {
            ModeState::Loan(LoanSession::BuildingCart { ref cart, .. }) => {
                assert_eq!(cart.len(), 1);
                assert_eq!(cart[0].id, 11);
            }
            other => panic!("expected loan cart, got {:?}", other),
        }

        let err = engine.remove_loan_item(10).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_complete_loan_partial_failure_resets_without_retry() {
        let mut circulation = MockCirculationClient::new();
        circulation
            .expect_create_loan_batch()
            .times(1)
            .withf(|subject_id, item_ids| *subject_id == 7 && item_ids == [10, 11])
            .returning(|_, _| {
                Ok(BatchResult {
                    success_count: 1,
                    failure_count: 1,
                })
            });

        let engine = engine_with(catalog(&[("dune", 10), ("hobbit", 11)]), circulation);
        engine.change_mode(Mode::Loan, false).await.unwrap();
        engine.scan("7").await.unwrap();
        engine.scan("dune").await.unwrap();
        engine.scan("hobbit").await.unwrap();

        let completion = engine.complete_loan().await.unwrap();
        assert_eq!(completion.subject_id, 7);
        assert_eq!(completion.submitted, 2);
        assert_eq!(completion.result.success_count, 1);
        assert_eq!(completion.result.failure_count, 1);
        assert!(matches!(
            completion.snapshot.session,
            ModeState::Loan(LoanSession::AwaitingUser)
        ));

        // Cart is gone; completing again is a user error, not a retry
        let err = engine.complete_loan().await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_complete_loan_requires_cart() {
        let engine = engine_with(catalog(&[]), MockCirculationClient::new());
        engine.change_mode(Mode::Loan, false).await.unwrap();
        engine.scan("7").await.unwrap();

        let err = engine.complete_loan().await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_mode_switch_discards_state_with_confirmation() {
        let engine = engine_with(catalog(&[("dune", 1)]), MockCirculationClient::new());
        engine.change_mode(Mode::Inventory, false).await.unwrap();
        engine.scan("dune").await.unwrap();

        let err = engine.change_mode(Mode::Search, false).await.unwrap_err();
        assert!(matches!(err, AppError::ConfirmationRequired(_)));

        let snapshot = engine.change_mode(Mode::Search, true).await.unwrap();
        assert_eq!(snapshot.mode, Mode::Search);
        assert!(snapshot.is_scanning);

        // Coming back starts a fresh session on both sides
        let snapshot = engine.change_mode(Mode::Inventory, false).await.unwrap();
        assert_eq!(inventory_len(&snapshot), 0);
    }

    #[tokio::test]
    async fn test_change_mode_same_mode_is_noop() {
        let engine = engine_with(catalog(&[("dune", 1)]), MockCirculationClient::new());
        engine.change_mode(Mode::Inventory, false).await.unwrap();
        engine.scan("dune").await.unwrap();

        // No confirmation needed and nothing lost
        let snapshot = engine.change_mode(Mode::Inventory, false).await.unwrap();
        assert_eq!(inventory_len(&snapshot), 1);
    }

    #[tokio::test]
    async fn test_manual_submit_empty_is_an_error() {
        let engine = engine_with(catalog(&[]), MockCirculationClient::new());
        let err = engine.manual_submit("   ").await.unwrap_err();
        assert!(matches!(err, AppError::EmptyCode));
    }

    #[tokio::test]
    async fn test_snapshot_published_after_mutation() {
        let engine = engine_with(catalog(&[("dune", 1)]), MockCirculationClient::new());
        let mut rx = engine.subscribe();
        assert!(!rx.has_changed().unwrap());

        engine.change_mode(Mode::Inventory, false).await.unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().mode, Mode::Inventory);
    }
}
