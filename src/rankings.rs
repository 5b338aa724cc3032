use crate::types::EloHistoryEntry;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RankedTeam {
    pub team_id: String,
    pub rank: u32,
    pub elo: f64,
    pub rank_change: i32,
}

pub type GroupedEloHistory = HashMap<String, Vec<(i64, f64)>>;

/// Groups a flat elo history by team id; each team's entries are kept in
/// timestamp order so an index addresses a match day.
pub fn group_elo_history(entries: &[EloHistoryEntry]) -> GroupedEloHistory {
    let mut grouped: GroupedEloHistory = HashMap::new();
    for entry in entries {
        grouped
            .entry(entry.team_id.clone())
            .or_default()
            .push((entry.timestamp, entry.elo));
    }
    for history in grouped.values_mut() {
        history.sort_by_key(|(timestamp, _)| *timestamp);
    }
    grouped
}

/// Number of match days covered by the longest team history.
pub fn matchday_count(grouped: &GroupedEloHistory) -> usize {
    grouped.values().map(|history| history.len()).max().unwrap_or(0)
}

/// Elo at the given match day, falling back to the team's last known
/// rating when the requested day is past the end of its history.
pub fn elo_for_matchday(history: &[(i64, f64)], day: usize) -> f64 {
    history
        .get(day)
        .or_else(|| history.last())
        .map(|(_, elo)| *elo)
        .unwrap_or(0.0)
}

fn ranking_order(grouped: &GroupedEloHistory, day: usize) -> Vec<(String, f64)> {
    let mut order: Vec<(String, f64)> = grouped
        .iter()
        .map(|(team_id, history)| (team_id.clone(), elo_for_matchday(history, day)))
        .collect();
    // Ties break on team id so the ordering is deterministic.
    order.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then(a.0.cmp(&b.0)));
    order
}

/// Teams ranked by elo for a match day, with each team's movement
/// relative to the previous day (positive = climbed). Day 0 has no
/// previous day, so every change is 0.
pub fn rankings_for_matchday(grouped: &GroupedEloHistory, day: usize) -> Vec<RankedTeam> {
    let current = ranking_order(grouped, day);
    let previous_index: HashMap<String, usize> = if day == 0 {
        HashMap::new()
    } else {
        ranking_order(grouped, day - 1)
            .into_iter()
            .enumerate()
            .map(|(idx, (team_id, _))| (team_id, idx))
            .collect()
    };

    current
        .into_iter()
        .enumerate()
        .map(|(idx, (team_id, elo))| {
            let rank_change = previous_index
                .get(team_id.as_str())
                .map(|prev| *prev as i32 - idx as i32)
                .unwrap_or(0);
            RankedTeam {
                rank: idx as u32 + 1,
                team_id,
                elo,
                rank_change,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(team_id: &str, timestamp: i64, elo: f64) -> EloHistoryEntry {
        EloHistoryEntry {
            team_id: team_id.to_string(),
            elo,
            timestamp,
            match_id: None,
        }
    }

    fn sample_history() -> GroupedEloHistory {
        // Day 0: alpha 1500, beta 1400. Day 1: beta overtakes alpha.
        group_elo_history(&[
            entry("alpha", 100, 1500.0),
            entry("alpha", 200, 1450.0),
            entry("beta", 100, 1400.0),
            entry("beta", 200, 1550.0),
        ])
    }

    #[test]
    fn test_group_sorts_by_timestamp() {
        let grouped = group_elo_history(&[
            entry("alpha", 200, 1450.0),
            entry("alpha", 100, 1500.0),
        ]);
        assert_eq!(grouped["alpha"], vec![(100, 1500.0), (200, 1450.0)]);
    }

    #[test]
    fn test_elo_for_matchday_falls_back_to_last() {
        let history = vec![(100, 1500.0), (200, 1450.0)];
        assert_eq!(elo_for_matchday(&history, 0), 1500.0);
        assert_eq!(elo_for_matchday(&history, 1), 1450.0);
        assert_eq!(elo_for_matchday(&history, 9), 1450.0);
        assert_eq!(elo_for_matchday(&[], 0), 0.0);
    }

    #[test]
    fn test_day_zero_has_no_rank_changes() {
        let rankings = rankings_for_matchday(&sample_history(), 0);
        assert_eq!(rankings[0].team_id, "alpha");
        assert_eq!(rankings[0].rank, 1);
        assert!(rankings.iter().all(|r| r.rank_change == 0));
    }

    #[test]
    fn test_overtake_reports_rank_changes() {
        let rankings = rankings_for_matchday(&sample_history(), 1);
        assert_eq!(rankings[0].team_id, "beta");
        assert_eq!(rankings[0].rank_change, 1);
        assert_eq!(rankings[1].team_id, "alpha");
        assert_eq!(rankings[1].rank_change, -1);
    }

    #[test]
    fn test_matchday_count_uses_longest_history() {
        let grouped = group_elo_history(&[
            entry("alpha", 100, 1500.0),
            entry("beta", 100, 1400.0),
            entry("beta", 200, 1550.0),
            entry("beta", 300, 1600.0),
        ]);
        assert_eq!(matchday_count(&grouped), 3);
    }
}
