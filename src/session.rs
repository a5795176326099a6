use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;

use crate::answer_client::AnswerService;
use crate::citations::{split_narrative, Segment};
use crate::history::QueryHistory;
use crate::location::QueryLocation;
use crate::models::{AnswerResult, Match};
use crate::storage::KeyValueStore;

pub const QUERY_PARAM: &str = "q";
pub const REQUEST_FAILED_MESSAGE: &str = "Failed to fetch response";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Loading,
    Success,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Empty or whitespace-only input; nothing changed.
    Rejected,
    Completed,
    Failed,
    /// A newer query started before this response arrived; it was dropped.
    Superseded,
}

/// Result of a citation toggle: the new active citation, and the 1-based
/// match position to bring into view when that match exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CitationFocus {
    pub active: Option<usize>,
    pub scroll_to: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub current_query: String,
    pub history: QueryHistory,
    pub phase: Phase,
    pub result: Option<AnswerResult>,
    pub error: Option<String>,
    pub active_citation: Option<usize>,
}

struct SessionState {
    current_query: String,
    history: QueryHistory,
    phase: Phase,
    result: Option<AnswerResult>,
    error: Option<String>,
    active_citation: Option<usize>,
    latest_request: u64,
}

/// Drives one user's query lifecycle: URL sync, history, the answer request,
/// and the link between narrative markers and match records.
#[derive(Clone)]
pub struct QuerySession {
    service: Arc<dyn AnswerService>,
    store: Arc<dyn KeyValueStore>,
    location: Arc<dyn QueryLocation>,
    state: Arc<Mutex<SessionState>>,
}

impl QuerySession {
    /// Loads the stored history once; later changes are written back on every
    /// update.
    pub fn new(
        service: Arc<dyn AnswerService>,
        store: Arc<dyn KeyValueStore>,
        location: Arc<dyn QueryLocation>,
    ) -> Self {
        let history = QueryHistory::load(store.as_ref());
        tracing::debug!("session started with {} history entries", history.len());

        Self {
            service,
            store,
            location,
            state: Arc::new(Mutex::new(SessionState {
                current_query: String::new(),
                history,
                phase: Phase::Idle,
                result: None,
                error: None,
                active_citation: None,
                latest_request: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub async fn submit_query(&self, text: &str) -> SubmitOutcome {
        if text.trim().is_empty() {
            return SubmitOutcome::Rejected;
        }

        let request_id = {
            let mut state = self.lock();

            self.location.set_param(QUERY_PARAM, text);
            state.current_query = text.to_string();
            state.history.record(text);
            if let Err(err) = state.history.save(self.store.as_ref()) {
                tracing::warn!("failed to persist query history: {:#}", err);
            }

            state.result = None;
            state.error = None;
            state.active_citation = None;
            state.phase = Phase::Loading;
            state.latest_request += 1;
            state.latest_request
        };

        tracing::info!("query #{} submitted: {:?}", request_id, text);
        let outcome = self.service.query(text).await;

        let mut state = self.lock();
        if state.latest_request != request_id {
            tracing::debug!(
                "dropping stale response for query #{} (latest is #{})",
                request_id,
                state.latest_request
            );
            return SubmitOutcome::Superseded;
        }

        match outcome {
            Ok(result) => {
                tracing::info!(
                    "query #{} answered with {} matches",
                    request_id,
                    result.matches.len()
                );
                state.result = Some(result);
                state.phase = Phase::Success;
                SubmitOutcome::Completed
            }
            Err(err) => {
                tracing::warn!("query #{} failed: {}", request_id, err);
                state.error = Some(REQUEST_FAILED_MESSAGE.to_string());
                state.phase = Phase::Failed;
                SubmitOutcome::Failed
            }
        }
    }

    /// Re-runs a past query. Always a fresh fetch.
    pub async fn select_history_entry(&self, text: &str) -> SubmitOutcome {
        self.submit_query(text).await
    }

    /// Submits the `q` parameter of the navigable URL unless it is already the
    /// current query.
    pub async fn load_from_url(&self) -> Option<SubmitOutcome> {
        let query = self.location.get_param(QUERY_PARAM)?;
        if query == self.lock().current_query {
            return None;
        }
        Some(self.submit_query(&query).await)
    }

    pub fn toggle_citation(&self, n: usize) -> CitationFocus {
        let mut state = self.lock();
        state.active_citation = if state.active_citation == Some(n) {
            None
        } else {
            Some(n)
        };

        let scroll_to = state
            .result
            .as_ref()
            .and_then(|result| result.match_for_citation(n))
            .map(|_| n);

        CitationFocus {
            active: state.active_citation,
            scroll_to,
        }
    }

    pub fn match_for_citation(&self, n: usize) -> Option<Match> {
        self.lock()
            .result
            .as_ref()
            .and_then(|result| result.match_for_citation(n))
            .cloned()
    }

    /// The current narrative split into text and citation markers.
    pub fn narrative(&self) -> Vec<Segment> {
        let state = self.lock();
        match &state.result {
            Some(result) => split_narrative(&result.response, state.active_citation),
            None => Vec::new(),
        }
    }

    pub fn history(&self) -> QueryHistory {
        self.lock().history.clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.lock();
        SessionSnapshot {
            current_query: state.current_query.clone(),
            history: state.history.clone(),
            phase: state.phase,
            result: state.result.clone(),
            error: state.error.clone(),
            active_citation: state.active_citation,
        }
    }
}
