use serde::{Deserialize, Serialize};
use std::{
    sync::{Arc, Mutex},
    time::SystemTime,
};

// ── Constants ──────────────────────────────────────────────────────────

pub const DEFAULT_API_BASE_URL: &str = "https://api.collegecounter.org";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8790";
pub const API_RETRY_ATTEMPTS: u32 = 3;
pub const LIVE_POLL_INTERVAL_MS: u64 = 60_000;
pub const LIVE_IDLE_REFRESH_MS: u64 = 600_000;
pub const BYE_TEAM_SENTINEL: &str = "BYE";
pub const PLACEHOLDER_SEED_PREFIX: &str = "placeholder-";

// ── Shared state type aliases ──────────────────────────────────────────

pub type SharedLiveData = Arc<Mutex<LiveDataState>>;

// ── App domain types ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct Team {
    pub team_id: String,
    pub name: String,
    pub elo: f64,
    pub leader: Option<String>,
    pub avatar: Option<String>,
    pub school_name: Option<String>,
    pub faceit_id: Option<String>,
    pub playfly_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Player {
    pub player_id: String,
    pub nickname: String,
    pub elo: f64,
    pub skill_level: Option<i64>,
    pub avatar: Option<String>,
    pub steam_id: Option<String>,
    pub faceit_id: Option<String>,
    pub visible: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Match {
    pub match_id: String,
    pub team1_id: String,
    pub team2_id: String,
    pub scheduled_time: i64,
    pub status: String,
    pub competition: Option<String>,
    pub platform: Option<String>,
    pub match_url: Option<String>,
    pub results_winner: Option<String>,
    pub results_score_team1: Option<i64>,
    pub results_score_team2: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventMatch {
    pub id: String,
    pub event_id: String,
    pub match_id: Option<String>,
    pub round: i64,
    pub number_in_bracket: i64,
    pub is_bye: bool,
    pub bye_team_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub event_id: String,
    pub title: String,
    pub start_date: i64,
    pub end_date: i64,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EloHistoryEntry {
    pub team_id: String,
    pub elo: f64,
    pub timestamp: i64,
    pub match_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct SearchResults {
    pub teams: Vec<Team>,
    pub players: Vec<Player>,
}

// ── Live data cache ────────────────────────────────────────────────────

#[derive(Default)]
pub struct LiveDataState {
    pub teams: Option<Vec<Team>>,
    pub elo_history: Option<Vec<EloHistoryEntry>>,
    pub last_fetch: Option<SystemTime>,
    pub last_error: Option<String>,
    pub fetch_in_flight: bool,
}

#[derive(Clone)]
pub struct SiteServerState {
    pub live: SharedLiveData,
}

#[derive(Debug, Clone, Serialize)]
pub struct LiveDataSnapshot {
    pub team_count: Option<usize>,
    pub elo_history_len: Option<usize>,
    pub last_error: Option<String>,
    pub last_fetch_ms: Option<u64>,
    pub age_ms: Option<u64>,
}

// ── Config types ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    pub api_base_url: String,
    pub bind_addr: String,
    pub site_dir: String,
    pub live_polling: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: String::new(),
            bind_addr: String::new(),
            site_dir: "site".to_string(),
            live_polling: false,
        }
    }
}

// ── CC API response nodes ──────────────────────────────────────────────
//
// The remote API is optional-field-heavy; every node field is an Option.
// Conversion to the strict domain types happens in `api`, which rejects
// records missing required fields instead of propagating them.

#[derive(Debug, Clone, Deserialize)]
pub struct TeamNode {
    pub team_id: Option<String>,
    pub name: Option<String>,
    pub elo: Option<f64>,
    pub leader: Option<String>,
    pub avatar: Option<String>,
    pub school_name: Option<String>,
    pub faceit_id: Option<String>,
    pub playfly_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayerNode {
    pub player_id: Option<String>,
    pub nickname: Option<String>,
    pub elo: Option<f64>,
    pub skill_level: Option<i64>,
    pub avatar: Option<String>,
    pub steam_id: Option<String>,
    pub faceit_id: Option<String>,
    pub visible: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatchNode {
    pub match_id: Option<String>,
    pub team1_id: Option<String>,
    pub team2_id: Option<String>,
    pub scheduled_time: Option<i64>,
    pub status: Option<String>,
    pub competition: Option<String>,
    pub platform: Option<String>,
    pub match_url: Option<String>,
    pub results_winner: Option<String>,
    pub results_score_team1: Option<i64>,
    pub results_score_team2: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventMatchNode {
    pub id: Option<String>,
    pub event_id: Option<String>,
    pub match_id: Option<String>,
    pub round: Option<i64>,
    pub number_in_bracket: Option<i64>,
    pub isbye: Option<bool>,
    pub bye_team_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventNode {
    pub event_id: Option<String>,
    pub title: Option<String>,
    pub start_date: Option<i64>,
    pub end_date: Option<i64>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EloHistoryNode {
    pub team_id: Option<String>,
    pub elo: Option<f64>,
    pub timestamp: Option<i64>,
    pub match_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SearchResultsNode {
    pub teams: Option<Vec<TeamNode>>,
    pub players: Option<Vec<PlayerNode>>,
}
