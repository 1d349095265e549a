//! Mode-local session state
//!
//! The session payloads are carried inside the `ModeState` tagged union so
//! that "no state carry-over between modes" is a type-level guarantee:
//! switching modes replaces the whole variant, there are no always-present
//! optional fields to forget to clear.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::item::ResolvedItem;

/// One of the four mutually exclusive scanning workflows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mode {
    Search,
    QuickReturn,
    Inventory,
    Loan,
}

/// Current mode together with its session payload
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "mode", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModeState {
    Search {
        /// Displayed result awaiting an explicit reset
        found: Option<ResolvedItem>,
    },
    QuickReturn,
    Inventory(InventorySession),
    Loan(LoanSession),
}

impl ModeState {
    pub fn mode(&self) -> Mode {
        match self {
            ModeState::Search { .. } => Mode::Search,
            ModeState::QuickReturn => Mode::QuickReturn,
            ModeState::Inventory(_) => Mode::Inventory,
            ModeState::Loan(_) => Mode::Loan,
        }
    }

    /// Fresh state for entering a mode
    pub fn init(mode: Mode, now: DateTime<Utc>) -> Self {
        match mode {
            Mode::Search => ModeState::Search { found: None },
            Mode::QuickReturn => ModeState::QuickReturn,
            Mode::Inventory => ModeState::Inventory(InventorySession::new(now)),
            Mode::Loan => ModeState::Loan(LoanSession::AwaitingUser),
        }
    }

    /// Whether switching away would lose accumulated work
    pub fn has_unsaved_progress(&self) -> bool {
        match self {
            ModeState::Search { .. } | ModeState::QuickReturn => false,
            ModeState::Inventory(session) => !session.entries.is_empty(),
            ModeState::Loan(LoanSession::AwaitingUser) => false,
            ModeState::Loan(LoanSession::BuildingCart { cart, .. }) => !cart.is_empty(),
        }
    }
}

/// One scanned shelf item during an inventory session
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InventoryEntry {
    pub item_id: i32,
    pub name: String,
    pub isbn: Option<String>,
    pub scanned_at: DateTime<Utc>,
}

/// Accumulated inventory scan session.
///
/// Invariant: no two entries share `item_id`; duplicates are rejected with
/// distinct feedback, never merged or re-timestamped.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct InventorySession {
    pub started_at: DateTime<Utc>,
    pub entries: Vec<InventoryEntry>,
}

impl InventorySession {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            started_at: now,
            entries: Vec::new(),
        }
    }

    pub fn contains(&self, item_id: i32) -> bool {
        self.entries.iter().any(|e| e.item_id == item_id)
    }

    /// Freeze the session into its structured report
    pub fn into_report(self, ended_at: DateTime<Utc>) -> InventoryReport {
        InventoryReport {
            started_at: self.started_at,
            ended_at,
            duration_seconds: (ended_at - self.started_at).num_seconds(),
            total_scanned: self.entries.len(),
            entries: self.entries,
        }
    }
}

/// Structured report produced when an inventory session finishes
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InventoryReport {
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_seconds: i64,
    pub total_scanned: usize,
    pub entries: Vec<InventoryEntry>,
}

/// Two-phase loan session.
///
/// Phase 1 waits for a subject (borrower) card; phase 2 accumulates the
/// cart, unique by item id. The only way back to `AwaitingUser` is an
/// explicit reset or a completed batch submit.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "phase", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanSession {
    AwaitingUser,
    BuildingCart {
        subject_id: i32,
        cart: Vec<ResolvedItem>,
    },
}

/// Outcome of a batch loan submission, surfaced verbatim
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
pub struct BatchResult {
    pub success_count: u32,
    pub failure_count: u32,
}

/// Read-only engine state handed to the presentation layer after every
/// mutation
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EngineSnapshot {
    pub mode: Mode,
    pub is_scanning: bool,
    /// Last accepted raw code, cleared by resets and display timers
    pub last_code: Option<String>,
    pub session: ModeState,
}
