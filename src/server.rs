use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use askama::Template;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Json};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use crate::citations::Segment;
use crate::config::AppConfig;
use crate::history::QueryHistory;
use crate::location::{relative_link, QueryLocation, SharedLocation};
use crate::models::{country_display, Match};
use crate::session::{Phase, QuerySession, SessionSnapshot, QUERY_PARAM};
use crate::suggestions::Category;

#[derive(Clone)]
struct AppState {
    session: QuerySession,
    location: Arc<SharedLocation>,
}

pub async fn run_server(
    config: AppConfig,
    session: QuerySession,
    location: Arc<SharedLocation>,
) -> Result<()> {
    let state = AppState { session, location };

    let app = Router::new()
        .route("/", get(index_page))
        .route("/api/session", get(session_snapshot))
        .route("/api/history", get(query_history))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = config.bind_addr.parse()?;
    tracing::info!("listening on http://{}", addr);
    tracing::info!("answer service at {}", config.api_base_url);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[derive(Debug, Deserialize)]
struct PageParams {
    q: Option<String>,
    cite: Option<usize>,
}

async fn index_page(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Html<String>, ApiError> {
    let query = params.q.as_deref().filter(|q| !q.trim().is_empty());
    if let Some(query) = query {
        state.location.set_param(QUERY_PARAM, query);
        if let Some(outcome) = state.session.load_from_url().await {
            tracing::debug!("page query {:?} -> {:?}", query, outcome);
        }
    }

    sync_citation(&state.session, params.cite);

    let snapshot = state.session.snapshot();
    let page = IndexTemplate::build(&snapshot, &state.session.narrative());
    let body = page.render()?;
    Ok(Html(body))
}

/// Page links carry the citation state they lead to, so the session is only
/// toggled when the requested citation differs from the active one.
fn sync_citation(session: &QuerySession, requested: Option<usize>) {
    let active = session.snapshot().active_citation;
    if requested == active {
        return;
    }
    match (requested, active) {
        (Some(n), _) => {
            session.toggle_citation(n);
        }
        (None, Some(current)) => {
            session.toggle_citation(current);
        }
        (None, None) => {}
    }
}

async fn session_snapshot(State(state): State<AppState>) -> Json<SessionSnapshot> {
    Json(state.session.snapshot())
}

async fn query_history(State(state): State<AppState>) -> Json<QueryHistory> {
    Json(state.session.history())
}

struct LinkView {
    label: String,
    href: String,
}

struct SuggestionGroup {
    name: &'static str,
    links: Vec<LinkView>,
}

struct SegmentView {
    text: String,
    is_citation: bool,
    active: bool,
    href: String,
}

struct MatchCardView {
    anchor: String,
    position: usize,
    href: String,
    highlighted: bool,
    surface_class: &'static str,
    country: String,
    tournament_name: String,
    level_name: String,
    surface: String,
    round: String,
    date: String,
    winner_name: String,
    winner_country: String,
    loser_name: String,
    loser_country: String,
    score: String,
}

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    query: String,
    history: Vec<LinkView>,
    suggestions: Vec<SuggestionGroup>,
    loading: bool,
    error: String,
    narrative: Vec<SegmentView>,
    analysis: String,
    matches: Vec<MatchCardView>,
}

impl IndexTemplate {
    fn build(snapshot: &SessionSnapshot, narrative: &[Segment]) -> Self {
        let query = snapshot.current_query.clone();
        let active = snapshot.active_citation;
        let matches: &[Match] = snapshot
            .result
            .as_ref()
            .map(|r| r.matches.as_slice())
            .unwrap_or_default();

        let narrative = narrative
            .iter()
            .map(|segment| match segment {
                Segment::Text { text } => SegmentView {
                    text: text.clone(),
                    is_citation: false,
                    active: false,
                    href: String::new(),
                },
                Segment::Citation { number, active } => SegmentView {
                    text: number.to_string(),
                    is_citation: true,
                    active: *active,
                    href: citation_href(&query, *number, snapshot.active_citation, matches.len()),
                },
            })
            .collect();

        let cards = matches
            .iter()
            .enumerate()
            .map(|(idx, m)| {
                let position = idx + 1;
                MatchCardView {
                    anchor: format!("match-{}", position),
                    position,
                    href: citation_href(&query, position, active, matches.len()),
                    highlighted: active == Some(position),
                    surface_class: m.surface_kind().css_class(),
                    country: country_display(&m.tournament_country),
                    tournament_name: m.tournament_name.clone(),
                    level_name: m.level_name(),
                    surface: m.surface.clone(),
                    round: m.round.clone(),
                    date: m.formatted_date(),
                    winner_name: m.winner_name.clone(),
                    winner_country: country_display(&m.winner_country),
                    loser_name: m.loser_name.clone(),
                    loser_country: country_display(&m.loser_country),
                    score: m.score.clone(),
                }
            })
            .collect();

        let history = snapshot
            .history
            .entries()
            .iter()
            .map(|entry| LinkView {
                label: entry.clone(),
                href: relative_link(&[(QUERY_PARAM, entry.as_str())]),
            })
            .collect();

        let suggestions = Category::ALL
            .into_iter()
            .map(|category| SuggestionGroup {
                name: category.name(),
                links: category
                    .questions()
                    .iter()
                    .map(|question| LinkView {
                        label: question.to_string(),
                        href: relative_link(&[(QUERY_PARAM, *question)]),
                    })
                    .collect(),
            })
            .collect();

        Self {
            query,
            history,
            suggestions,
            loading: snapshot.phase == Phase::Loading,
            error: snapshot.error.clone().unwrap_or_default(),
            narrative,
            analysis: snapshot
                .result
                .as_ref()
                .map(|r| r.analysis.clone())
                .unwrap_or_default(),
            matches: cards,
        }
    }
}

/// Link that toggles citation `n`: selecting it when inactive (jumping to the
/// match card when there is one), clearing it when already active.
fn citation_href(query: &str, n: usize, active: Option<usize>, match_count: usize) -> String {
    if active == Some(n) {
        return relative_link(&[(QUERY_PARAM, query)]);
    }

    let cite = n.to_string();
    let mut href = relative_link(&[(QUERY_PARAM, query), ("cite", cite.as_str())]);
    if (1..=match_count).contains(&n) {
        href.push_str(&format!("#match-{}", n));
    }
    href
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl From<askama::Error> for ApiError {
    fn from(value: askama::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: value.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        tracing::error!("request failed: {}", self.message);
        let body = serde_json::json!({ "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::answer_client::{AnswerError, AnswerService};
    use crate::citations::split_narrative;
    use crate::models::AnswerResult;
    use crate::storage::MemoryStore;

    struct EchoService;

    #[async_trait]
    impl AnswerService for EchoService {
        async fn query(&self, text: &str) -> Result<AnswerResult, AnswerError> {
            Ok(AnswerResult {
                response: format!("About {} [1].", text),
                ..AnswerResult::default()
            })
        }
    }

    fn app_state() -> AppState {
        let location = Arc::new(SharedLocation::parse("http://localhost:3000/").unwrap());
        let session = QuerySession::new(
            Arc::new(EchoService),
            Arc::new(MemoryStore::new()),
            location.clone(),
        );
        AppState { session, location }
    }

    fn page_params(q: &str) -> Query<PageParams> {
        Query(PageParams {
            q: Some(q.to_string()),
            cite: None,
        })
    }

    #[tokio::test]
    async fn blank_page_query_leaves_url_and_session_alone() {
        let state = app_state();

        let page = index_page(State(state.clone()), page_params("Nadal")).await;
        assert!(page.is_ok());
        assert_eq!(state.session.snapshot().current_query, "Nadal");

        let page = index_page(State(state.clone()), page_params("   ")).await;
        assert!(page.is_ok());
        assert_eq!(state.session.snapshot().current_query, "Nadal");
        assert_eq!(
            state.location.get_param(QUERY_PARAM).as_deref(),
            Some("Nadal")
        );
    }

    #[test]
    fn inactive_citation_links_to_its_card() {
        assert_eq!(
            citation_href("clay kings", 2, None, 3),
            "/?q=clay+kings&cite=2#match-2"
        );
    }

    #[test]
    fn active_citation_link_clears_it() {
        assert_eq!(citation_href("clay kings", 2, Some(2), 3), "/?q=clay+kings");
    }

    #[test]
    fn citation_past_match_count_has_no_fragment() {
        assert_eq!(
            citation_href("clay kings", 7, Some(2), 3),
            "/?q=clay+kings&cite=7"
        );
    }

    #[test]
    fn page_renders_markers_and_cards() {
        let snapshot = SessionSnapshot {
            current_query: "Federer grass".to_string(),
            history: QueryHistory::from_entries(vec!["Federer grass".to_string()]),
            phase: Phase::Success,
            result: Some(AnswerResult {
                response: "Federer beat Nadal [1] <twice>.".to_string(),
                matches: vec![Match {
                    match_id: "m1".to_string(),
                    tournament_name: "Wimbledon".to_string(),
                    surface: "Grass".to_string(),
                    description: "20070708".to_string(),
                    ..Match::default()
                }],
                analysis: String::new(),
            }),
            error: None,
            active_citation: Some(1),
        };
        let narrative = split_narrative(
            &snapshot.result.as_ref().unwrap().response,
            snapshot.active_citation,
        );

        let page = IndexTemplate::build(&snapshot, &narrative);
        assert_eq!(page.narrative.len(), 3);
        assert!(page.narrative[1].is_citation && page.narrative[1].active);
        assert_eq!(page.matches[0].surface_class, "surface-grass");
        assert!(page.matches[0].highlighted);
        assert_eq!(page.matches[0].date, "July 8, 2007");

        let html = page.render().unwrap();
        assert!(html.contains("id=\"match-1\""));
        assert!(html.contains("&lt;twice&gt;"));
        assert!(!html.contains("<twice>"));
    }
}
