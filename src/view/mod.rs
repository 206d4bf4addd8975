/// The metrics view: latest snapshot, derived hit rate, refresh trigger.
///
/// A view is an explicit two-state machine:
///
/// | from     | fetch outcome | to       |
/// |----------|---------------|----------|
/// | `Empty`  | usable        | `Loaded` |
/// | `Loaded` | usable        | `Loaded` |
/// | any      | unusable      | `Empty`  |
///
/// Every completed fetch replaces the state. An unusable fetch (transport
/// error, bad status, malformed body, missing `data`) is swallowed and drops
/// the view back to `Empty`; nothing is raised to the caller and no retry is
/// scheduled.
///
/// # Overlapping refreshes
///
/// [`MetricsView::refresh_detached`] runs the fetch on its own thread and
/// applies the outcome when it arrives. Overlapping refreshes are not
/// deduplicated or ordered: the outcome that completes last is the one left
/// in the view, regardless of which refresh was issued first.
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::client::{FetchError, MetricsSource};
use crate::metrics::MetricsSnapshot;
use crate::render::{RenderModel, Renderer};

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Current state of a [`MetricsView`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ViewState {
    /// No usable snapshot: nothing fetched yet, or the last fetch failed.
    #[default]
    Empty,
    /// Snapshot from the most recently applied successful fetch.
    Loaded {
        snapshot: MetricsSnapshot,
        fetched_at: DateTime<Utc>,
    },
}

impl ViewState {
    /// The held snapshot, or the all-zero default when empty.
    pub fn snapshot(&self) -> MetricsSnapshot {
        match self {
            Self::Empty => MetricsSnapshot::default(),
            Self::Loaded { snapshot, .. } => *snapshot,
        }
    }

    /// Whether a successful fetch is currently held.
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded { .. })
    }

    /// Transition taken when a fetch completes.
    fn next(outcome: Result<MetricsSnapshot, FetchError>) -> Self {
        match outcome {
            Ok(snapshot) => Self::Loaded {
                snapshot,
                fetched_at: Utc::now(),
            },
            Err(err) => {
                warn!(error = %err, "metrics fetch unusable, showing empty snapshot");
                Self::Empty
            }
        }
    }
}

/// State shared between a view and its in-flight detached refreshes.
#[derive(Debug, Default)]
struct Shared {
    state: Mutex<ViewState>,
    applied: AtomicU64,
}

impl Shared {
    fn apply(&self, outcome: Result<MetricsSnapshot, FetchError>) {
        let next = ViewState::next(outcome);
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        *state = next;
        self.applied.fetch_add(1, Ordering::SeqCst);
    }

    fn current(&self) -> ViewState {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

// ---------------------------------------------------------------------------
// View
// ---------------------------------------------------------------------------

/// One metrics panel, independent of how it is laid out.
///
/// Layout is supplied at render time through a [`Renderer`], so the
/// overview grid and the stats list share this single implementation.
pub struct MetricsView {
    source: Arc<dyn MetricsSource>,
    shared: Arc<Shared>,
}

impl MetricsView {
    /// Create a view in the `Empty` state without fetching.
    pub fn new(source: Arc<dyn MetricsSource>) -> Self {
        Self {
            source,
            shared: Arc::new(Shared::default()),
        }
    }

    /// Create a view and perform its first fetch immediately.
    pub fn initialize(source: Arc<dyn MetricsSource>) -> Self {
        let view = Self::new(source);
        view.refresh();
        view
    }

    /// Fetch on the calling thread and apply the outcome.
    pub fn refresh(&self) {
        debug!(source = %self.source.describe(), "refresh");
        self.shared.apply(self.source.fetch());
    }

    /// Fetch on a background thread; the outcome is applied whenever that
    /// fetch completes. Join the handle to wait for it.
    pub fn refresh_detached(&self) -> JoinHandle<()> {
        let source = Arc::clone(&self.source);
        let shared = Arc::clone(&self.shared);
        debug!(source = %source.describe(), "detached refresh");
        thread::spawn(move || shared.apply(source.fetch()))
    }

    /// Current snapshot (all zeros when empty).
    pub fn snapshot(&self) -> MetricsSnapshot {
        self.shared.current().snapshot()
    }

    /// Cache hit rate of the current snapshot.
    pub fn hit_rate(&self) -> u8 {
        self.snapshot().hit_rate()
    }

    /// Copy of the current state.
    pub fn state(&self) -> ViewState {
        self.shared.current()
    }

    /// Number of fetch outcomes applied so far, successful or not.
    pub fn applied_count(&self) -> u64 {
        self.shared.applied.load(Ordering::SeqCst)
    }

    /// Lay out the current state with `renderer`.
    pub fn render(&self, renderer: &dyn Renderer) -> String {
        renderer.render(&RenderModel::from_state(&self.state()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
