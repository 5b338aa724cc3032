use crate::config::*;
use crate::types::*;
use serde::de::DeserializeOwned;
use std::{
    thread::sleep,
    time::{Duration, SystemTime},
};
use tracing::warn;

// ── HTTP plumbing ──────────────────────────────────────────────────────

pub fn api_url(config: &AppConfig, path: &str) -> String {
  let base = config.api_base_url.trim_end_matches('/');
  let path = path.trim_start_matches('/');
  format!("{base}/{path}")
}

pub fn api_get_json<T: DeserializeOwned>(config: &AppConfig, path: &str) -> Result<T, String> {
  let url = api_url(config, path);
  let client = reqwest::blocking::Client::new();
  append_api_log("CC request", &format!("GET {url}"));
  let mut last_send_err = String::new();
  let mut resp = None;
  for attempt in 0..API_RETRY_ATTEMPTS {
    if attempt > 0 {
      sleep(Duration::from_millis(500 * u64::from(attempt)));
    }
    match client
      .get(&url)
      .header("User-Agent", "cc-stats-server")
      .send()
    {
      Ok(r) => { resp = Some(r); break; }
      Err(e) => {
        last_send_err = format!("CC request failed (attempt {}): {e}", attempt + 1);
        append_api_log("CC error", &last_send_err);
      }
    }
  }
  let resp = resp.ok_or_else(|| last_send_err.clone())?;
  let status = resp.status();
  let body = resp.text().map_err(|e| {
    append_api_log("CC error", &format!("read failed: {e}"));
    format!("CC read failed: {e}")
  })?;
  append_api_log("CC response", &format!("status: {status}\nbody:\n{body}"));
  if !status.is_success() {
    return Err(format!("CC error {status} for {url}: {body}"));
  }
  serde_json::from_str(&body).map_err(|e| {
    append_api_log("CC error", &format!("parse failed: {e}"));
    format!("CC parse failed for {url}: {e}")
  })
}

// ── Node → domain conversion ───────────────────────────────────────────

fn require<T>(field: Option<T>, name: &str, context: &str) -> Result<T, String> {
  field.ok_or_else(|| format!("{context} record is missing {name}"))
}

pub fn team_from_node(node: TeamNode) -> Result<Team, String> {
  Ok(Team {
    team_id: require(node.team_id, "team_id", "team")?,
    name: require(node.name, "name", "team")?,
    elo: require(node.elo, "elo", "team")?,
    leader: node.leader,
    avatar: node.avatar,
    school_name: node.school_name,
    faceit_id: node.faceit_id,
    playfly_id: node.playfly_id,
  })
}

pub fn player_from_node(node: PlayerNode) -> Result<Player, String> {
  Ok(Player {
    player_id: require(node.player_id, "player_id", "player")?,
    nickname: require(node.nickname, "nickname", "player")?,
    elo: require(node.elo, "elo", "player")?,
    skill_level: node.skill_level,
    avatar: node.avatar,
    steam_id: node.steam_id,
    faceit_id: node.faceit_id,
    visible: node.visible.unwrap_or(true),
  })
}

pub fn match_from_node(node: MatchNode) -> Result<Match, String> {
  Ok(Match {
    match_id: require(node.match_id, "match_id", "match")?,
    team1_id: require(node.team1_id, "team1_id", "match")?,
    team2_id: require(node.team2_id, "team2_id", "match")?,
    scheduled_time: require(node.scheduled_time, "scheduled_time", "match")?,
    status: require(node.status, "status", "match")?,
    competition: node.competition,
    platform: node.platform,
    match_url: node.match_url,
    results_winner: node.results_winner,
    results_score_team1: node.results_score_team1,
    results_score_team2: node.results_score_team2,
  })
}

pub fn event_match_from_node(node: EventMatchNode) -> Result<EventMatch, String> {
  Ok(EventMatch {
    id: require(node.id, "id", "event match")?,
    event_id: require(node.event_id, "event_id", "event match")?,
    match_id: node.match_id,
    round: require(node.round, "round", "event match")?,
    number_in_bracket: require(node.number_in_bracket, "number_in_bracket", "event match")?,
    is_bye: node.isbye.unwrap_or(false),
    bye_team_id: node.bye_team_id,
  })
}

pub fn event_from_node(node: EventNode) -> Result<Event, String> {
  Ok(Event {
    event_id: require(node.event_id, "event_id", "event")?,
    title: require(node.title, "title", "event")?,
    start_date: require(node.start_date, "start_date", "event")?,
    end_date: require(node.end_date, "end_date", "event")?,
    description: node.description,
  })
}

pub fn elo_history_from_node(node: EloHistoryNode) -> Result<EloHistoryEntry, String> {
  Ok(EloHistoryEntry {
    team_id: require(node.team_id, "team_id", "elo history")?,
    elo: require(node.elo, "elo", "elo history")?,
    timestamp: require(node.timestamp, "timestamp", "elo history")?,
    match_id: node.match_id,
  })
}

// Malformed entries in list payloads are dropped at the boundary rather
// than carried into rendering.
fn collect_ok<N, T>(
  nodes: Vec<N>,
  convert: fn(N) -> Result<T, String>,
  context: &str,
) -> Vec<T> {
  let mut out = Vec::with_capacity(nodes.len());
  for node in nodes {
    match convert(node) {
      Ok(item) => out.push(item),
      Err(err) => warn!("skipping {context}: {err}"),
    }
  }
  out
}

// ── Fetch functions ────────────────────────────────────────────────────

pub fn fetch_teams(config: &AppConfig) -> Result<Vec<Team>, String> {
  let nodes: Vec<TeamNode> = api_get_json(config, "/teams")?;
  Ok(collect_ok(nodes, team_from_node, "team"))
}

pub fn fetch_team(config: &AppConfig, team_id: &str) -> Result<Team, String> {
  team_from_node(api_get_json(config, &format!("/team/{team_id}"))?)
}

pub fn fetch_team_players(config: &AppConfig, team_id: &str) -> Result<Vec<Player>, String> {
  let nodes: Vec<PlayerNode> = api_get_json(config, &format!("/team/{team_id}/players"))?;
  Ok(collect_ok(nodes, player_from_node, "player"))
}

// Bracket bye seeds carry the advancing team's platform id in the slot
// that would otherwise hold an opponent; the literal sentinel resolves to
// a synthetic pass-through team without a network round trip.
pub fn fetch_team_by_pfid(config: &AppConfig, team_id: &str) -> Result<Team, String> {
  if team_id == BYE_TEAM_SENTINEL {
    return Ok(Team {
      team_id: BYE_TEAM_SENTINEL.to_string(),
      name: "---".to_string(),
      elo: 0.0,
      leader: None,
      avatar: None,
      school_name: None,
      faceit_id: None,
      playfly_id: None,
    });
  }
  team_from_node(api_get_json(config, &format!("/team_by_pfid/{team_id}"))?)
}

pub fn fetch_player(config: &AppConfig, player_id: &str) -> Result<Player, String> {
  player_from_node(api_get_json(config, &format!("/player/{player_id}"))?)
}

pub fn fetch_match(config: &AppConfig, match_id: &str) -> Result<Match, String> {
  match_from_node(api_get_json(config, &format!("/match/{match_id}"))?)
}

pub fn fetch_events(config: &AppConfig) -> Result<Vec<Event>, String> {
  let nodes: Vec<EventNode> = api_get_json(config, "/events")?;
  Ok(collect_ok(nodes, event_from_node, "event"))
}

pub fn fetch_event(config: &AppConfig, event_id: &str) -> Result<Event, String> {
  event_from_node(api_get_json(config, &format!("/event/{event_id}"))?)
}

pub fn fetch_event_matches(config: &AppConfig, event_id: &str) -> Result<Vec<EventMatch>, String> {
  let nodes: Vec<EventMatchNode> = api_get_json(config, &format!("/event/{event_id}/matches"))?;
  Ok(collect_ok(nodes, event_match_from_node, "event match"))
}

pub fn fetch_upcoming(config: &AppConfig) -> Result<Vec<Match>, String> {
  let nodes: Vec<MatchNode> = api_get_json(config, "/upcoming")?;
  Ok(collect_ok(nodes, match_from_node, "match"))
}

pub fn fetch_results(config: &AppConfig) -> Result<Vec<Match>, String> {
  let nodes: Vec<MatchNode> = api_get_json(config, "/results")?;
  Ok(collect_ok(nodes, match_from_node, "match"))
}

pub fn fetch_top10(config: &AppConfig) -> Result<Vec<Team>, String> {
  let nodes: Vec<TeamNode> = api_get_json(config, "/top10")?;
  Ok(collect_ok(nodes, team_from_node, "team"))
}

pub fn fetch_search(config: &AppConfig, query: &str) -> Result<SearchResults, String> {
  let node: SearchResultsNode = api_get_json(config, &format!("/search/{query}"))?;
  Ok(SearchResults {
    teams: collect_ok(node.teams.unwrap_or_default(), team_from_node, "team"),
    players: collect_ok(node.players.unwrap_or_default(), player_from_node, "player"),
  })
}

pub fn fetch_elo_history(config: &AppConfig) -> Result<Vec<EloHistoryEntry>, String> {
  let nodes: Vec<EloHistoryNode> = api_get_json(config, "/get_elo_history")?;
  Ok(collect_ok(nodes, elo_history_from_node, "elo history entry"))
}

// ── Live data cache ────────────────────────────────────────────────────

pub fn maybe_refresh_live_data(config: &AppConfig, live: &SharedLiveData, force: bool) {
  // The in-flight check and set must share one lock acquisition, or two
  // concurrent handlers could both observe the flag clear and both fetch.
  {
    let mut guard = live.lock().unwrap_or_else(|e| e.into_inner());
    let has_data = guard.teams.is_some() && guard.elo_history.is_some();
    let mut needs_refresh = force || !has_data;
    if !config.live_polling {
      if let Some(last) = guard.last_fetch {
        if last.elapsed().map(|age| age.as_millis() as u64).unwrap_or(u64::MAX) > LIVE_IDLE_REFRESH_MS {
          needs_refresh = true;
        }
      } else {
        needs_refresh = true;
      }
    }
    if !needs_refresh || guard.fetch_in_flight {
      return;
    }
    guard.fetch_in_flight = true;
  }

  let result = fetch_teams(config)
    .and_then(|teams| fetch_elo_history(config).map(|history| (teams, history)));

  let mut guard = live.lock().unwrap_or_else(|e| e.into_inner());
  guard.fetch_in_flight = false;
  match result {
    Ok((teams, history)) => {
      guard.teams = Some(teams);
      guard.elo_history = Some(history);
      guard.last_fetch = Some(SystemTime::now());
      guard.last_error = None;
    }
    Err(err) => {
      guard.last_error = Some(err);
    }
  }
}

pub fn live_data_snapshot(live: &SharedLiveData) -> LiveDataSnapshot {
  let guard = live.lock().unwrap_or_else(|e| e.into_inner());
  let last_fetch_ms = guard.last_fetch.and_then(|time| {
    time
      .duration_since(std::time::UNIX_EPOCH)
      .ok()
      .map(|duration| duration.as_millis() as u64)
  });
  LiveDataSnapshot {
    team_count: guard.teams.as_ref().map(|teams| teams.len()),
    elo_history_len: guard.elo_history.as_ref().map(|history| history.len()),
    last_error: guard.last_error.clone(),
    last_fetch_ms,
    age_ms: last_fetch_ms.map(|fetched| now_ms().saturating_sub(fetched)),
  }
}

pub fn spawn_live_polling(live: SharedLiveData) {
  std::thread::spawn(move || loop {
    let config = load_config_inner().unwrap_or_else(|_| AppConfig::default());
    if !config.live_polling {
      sleep(Duration::from_millis(LIVE_POLL_INTERVAL_MS));
      continue;
    }
    maybe_refresh_live_data(&config, &live, true);
    sleep(Duration::from_millis(LIVE_POLL_INTERVAL_MS));
  });
}
