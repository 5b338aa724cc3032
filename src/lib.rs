pub mod types;
pub mod config;
pub mod api;
pub mod bracket;
pub mod elo;
pub mod rankings;

use types::*;
use config::*;
use bracket::{autofill_bracket, build_bracket_rounds, BracketRound};
use rankings::RankedTeam;

use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs,
    path::PathBuf,
    sync::{Arc, Mutex},
};
use axum::{
    extract::{Path as AxumPath, Query, State as AxumState},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, get_service},
    Router,
};
use tokio::net::TcpListener;
use tokio::task::JoinError;
use tower_http::services::ServeDir;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

// ── JSON responses ─────────────────────────────────────────────────────

fn json_response(body: String) -> Response {
    (
        [
            ("Content-Type", "application/json"),
            ("Cache-Control", "no-store"),
            ("Pragma", "no-cache"),
            ("Expires", "0"),
        ],
        body,
    )
        .into_response()
}

fn respond_json<T: Serialize>(result: Result<Result<T, String>, JoinError>) -> Response {
    match result {
        Ok(Ok(payload)) => {
            let body = serde_json::to_string(&payload).unwrap_or_else(|_| "{}".to_string());
            json_response(body)
        }
        Ok(Err(err)) => (StatusCode::BAD_GATEWAY, err).into_response(),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("handler task failed: {err}"),
        )
            .into_response(),
    }
}

// ── Handlers ───────────────────────────────────────────────────────────

async fn get_state_json(AxumState(state): AxumState<SiteServerState>) -> Response {
    let live = state.live.clone();
    let result = tokio::task::spawn_blocking(move || -> Result<LiveDataSnapshot, String> {
        let config = load_config_inner().unwrap_or_else(|_| AppConfig::default());
        api::maybe_refresh_live_data(&config, &live, false);
        Ok(api::live_data_snapshot(&live))
    })
    .await;
    respond_json(result)
}

#[derive(Deserialize)]
struct RankingsQuery {
    day: Option<usize>,
}

#[derive(Serialize)]
struct RankingsPayload {
    day: usize,
    matchdays: usize,
    rankings: Vec<RankedTeam>,
}

async fn get_rankings_json(
    AxumState(state): AxumState<SiteServerState>,
    Query(query): Query<RankingsQuery>,
) -> Response {
    let live = state.live.clone();
    let result = tokio::task::spawn_blocking(move || -> Result<RankingsPayload, String> {
        let config = load_config_inner()?;
        api::maybe_refresh_live_data(&config, &live, false);
        let (history, last_error) = {
            let guard = live.lock().unwrap_or_else(|e| e.into_inner());
            (guard.elo_history.clone(), guard.last_error.clone())
        };
        let history = history
            .ok_or_else(|| last_error.unwrap_or_else(|| "elo history unavailable".to_string()))?;
        let grouped = rankings::group_elo_history(&history);
        let matchdays = rankings::matchday_count(&grouped);
        let day = query.day.unwrap_or(matchdays.saturating_sub(1));
        Ok(RankingsPayload {
            day,
            matchdays,
            rankings: rankings::rankings_for_matchday(&grouped, day),
        })
    })
    .await;
    respond_json(result)
}

async fn get_bracket_json(AxumPath(event_id): AxumPath<String>) -> Response {
    let result = tokio::task::spawn_blocking(move || -> Result<Vec<BracketRound>, String> {
        let config = load_config_inner()?;
        let event_matches = api::fetch_event_matches(&config, &event_id)?;
        let mut details: HashMap<String, Match> = HashMap::new();
        for em in &event_matches {
            let Some(match_id) = em.match_id.as_ref() else {
                continue;
            };
            if details.contains_key(match_id) {
                continue;
            }
            match api::fetch_match(&config, match_id) {
                Ok(detail) => {
                    details.insert(match_id.clone(), detail);
                }
                Err(err) => warn!("match {match_id} detail unavailable: {err}"),
            }
        }
        Ok(autofill_bracket(build_bracket_rounds(&event_matches, &details)))
    })
    .await;
    respond_json(result)
}

async fn get_events_json() -> Response {
    let result = tokio::task::spawn_blocking(move || -> Result<Vec<Event>, String> {
        let config = load_config_inner()?;
        api::fetch_events(&config)
    })
    .await;
    respond_json(result)
}

async fn get_event_json(AxumPath(event_id): AxumPath<String>) -> Response {
    let result = tokio::task::spawn_blocking(move || -> Result<Event, String> {
        let config = load_config_inner()?;
        api::fetch_event(&config, &event_id)
    })
    .await;
    respond_json(result)
}

#[derive(Serialize)]
struct TeamPayload {
    team: Team,
    players: Vec<Player>,
}

async fn get_team_json(AxumPath(team_id): AxumPath<String>) -> Response {
    let result = tokio::task::spawn_blocking(move || -> Result<TeamPayload, String> {
        let config = load_config_inner()?;
        let team = api::fetch_team(&config, &team_id)?;
        let players = api::fetch_team_players(&config, &team_id)?;
        Ok(TeamPayload { team, players })
    })
    .await;
    respond_json(result)
}

async fn get_team_by_pfid_json(AxumPath(team_id): AxumPath<String>) -> Response {
    let result = tokio::task::spawn_blocking(move || -> Result<Team, String> {
        let config = load_config_inner()?;
        api::fetch_team_by_pfid(&config, &team_id)
    })
    .await;
    respond_json(result)
}

async fn get_player_json(AxumPath(player_id): AxumPath<String>) -> Response {
    let result = tokio::task::spawn_blocking(move || -> Result<Player, String> {
        let config = load_config_inner()?;
        api::fetch_player(&config, &player_id)
    })
    .await;
    respond_json(result)
}

async fn get_top10_json() -> Response {
    let result = tokio::task::spawn_blocking(move || -> Result<Vec<Team>, String> {
        let config = load_config_inner()?;
        api::fetch_top10(&config)
    })
    .await;
    respond_json(result)
}

async fn get_search_json(AxumPath(query): AxumPath<String>) -> Response {
    let result = tokio::task::spawn_blocking(move || -> Result<SearchResults, String> {
        let config = load_config_inner()?;
        api::fetch_search(&config, &query)
    })
    .await;
    respond_json(result)
}

#[derive(Serialize)]
struct MatchSummary {
    match_id: String,
    team1_id: String,
    team2_id: String,
    scheduled_time: i64,
    date: String,
    status: String,
    stars: Option<u8>,
}

// Star ratings need both teams' current elo; the cached team list covers
// that without a per-match fetch fan-out. Unknown teams get no stars.
fn summarize_matches(matches: Vec<Match>, live: &SharedLiveData) -> Vec<MatchSummary> {
    let elo_by_team: HashMap<String, f64> = {
        let guard = live.lock().unwrap_or_else(|e| e.into_inner());
        guard
            .teams
            .iter()
            .flatten()
            .map(|team| (team.team_id.clone(), team.elo))
            .collect()
    };
    matches
        .into_iter()
        .map(|detail| {
            let stars = match (
                elo_by_team.get(&detail.team1_id),
                elo_by_team.get(&detail.team2_id),
            ) {
                (Some(elo1), Some(elo2)) => Some(elo::match_stars(*elo1, *elo2)),
                _ => None,
            };
            MatchSummary {
                date: bracket::format_match_date(detail.scheduled_time),
                match_id: detail.match_id,
                team1_id: detail.team1_id,
                team2_id: detail.team2_id,
                scheduled_time: detail.scheduled_time,
                status: detail.status,
                stars,
            }
        })
        .collect()
}

async fn get_upcoming_json(AxumState(state): AxumState<SiteServerState>) -> Response {
    let live = state.live.clone();
    let result = tokio::task::spawn_blocking(move || -> Result<Vec<MatchSummary>, String> {
        let config = load_config_inner()?;
        api::maybe_refresh_live_data(&config, &live, false);
        let matches = api::fetch_upcoming(&config)?;
        Ok(summarize_matches(matches, &live))
    })
    .await;
    respond_json(result)
}

async fn get_results_json(AxumState(state): AxumState<SiteServerState>) -> Response {
    let live = state.live.clone();
    let result = tokio::task::spawn_blocking(move || -> Result<Vec<MatchSummary>, String> {
        let config = load_config_inner()?;
        api::maybe_refresh_live_data(&config, &live, false);
        let matches = api::fetch_results(&config)?;
        Ok(summarize_matches(matches, &live))
    })
    .await;
    respond_json(result)
}

#[derive(Serialize)]
struct MatchPreview {
    match_id: String,
    team1_id: String,
    team2_id: String,
    team1_elo: f64,
    team2_elo: f64,
    stars: u8,
    team1_win_probability: f64,
    scheduled_time: i64,
    date: String,
    status: String,
}

async fn get_match_preview_json(AxumPath(match_id): AxumPath<String>) -> Response {
    let result = tokio::task::spawn_blocking(move || -> Result<MatchPreview, String> {
        let config = load_config_inner()?;
        let detail = api::fetch_match(&config, &match_id)?;
        let team1 = api::fetch_team(&config, &detail.team1_id)?;
        let team2 = api::fetch_team(&config, &detail.team2_id)?;
        Ok(MatchPreview {
            match_id: detail.match_id,
            team1_id: team1.team_id,
            team2_id: team2.team_id,
            team1_elo: team1.elo,
            team2_elo: team2.elo,
            stars: elo::match_stars(team1.elo, team2.elo),
            team1_win_probability: elo::win_probability(team1.elo, team2.elo),
            scheduled_time: detail.scheduled_time,
            date: bracket::format_match_date(detail.scheduled_time),
            status: detail.status,
        })
    })
    .await;
    respond_json(result)
}

// ── Site HTTP server ───────────────────────────────────────────────────

pub fn site_router(state: SiteServerState, site_dir: PathBuf) -> Router {
    let static_files = get_service(ServeDir::new(site_dir));

    Router::new()
        .route("/state.json", get(get_state_json))
        .route("/rankings.json", get(get_rankings_json))
        .route("/events.json", get(get_events_json))
        .route("/event/:event_id", get(get_event_json))
        .route("/event/:event_id/bracket.json", get(get_bracket_json))
        .route("/team/:team_id", get(get_team_json))
        .route("/team_by_pfid/:team_id", get(get_team_by_pfid_json))
        .route("/player/:player_id", get(get_player_json))
        .route("/match/:match_id/preview.json", get(get_match_preview_json))
        .route("/upcoming.json", get(get_upcoming_json))
        .route("/results.json", get(get_results_json))
        .route("/top10.json", get(get_top10_json))
        .route("/search/:query", get(get_search_json))
        .fallback_service(static_files)
        .with_state(state)
}

async fn start_site_server(state: SiteServerState, config: &AppConfig) -> Result<(), String> {
    let site_dir = resolve_repo_path(&config.site_dir);
    let app = site_router(state, site_dir);
    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .map_err(|e| format!("site server failed to bind {}: {e}", config.bind_addr))?;
    info!("site server listening at http://{}/", config.bind_addr);
    axum::serve(listener, app)
        .await
        .map_err(|e| format!("site server error: {e}"))
}

// ── Entry point ────────────────────────────────────────────────────────

pub fn run() -> Result<(), String> {
    load_env_file();

    // Initialize tracing with rolling file output
    let logs_dir = repo_root().join("logs");
    fs::create_dir_all(&logs_dir).ok();
    let file_appender = tracing_appender::rolling::daily(&logs_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(non_blocking)
        .with_ansi(false)
        .init();
    info!("College Counter stats server starting");
    log_env_warnings();

    let config = load_config_inner()?;
    let live: SharedLiveData = Arc::new(Mutex::new(LiveDataState::default()));
    api::spawn_live_polling(live.clone());

    let state = SiteServerState { live };
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("build tokio runtime: {e}"))?;
    runtime.block_on(start_site_server(state, &config))
}
