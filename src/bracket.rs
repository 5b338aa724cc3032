use crate::types::{EventMatch, Match, BYE_TEAM_SENTINEL, PLACEHOLDER_SEED_PREFIX};
use chrono::{LocalResult, TimeZone, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

// ── Bracket types ──────────────────────────────────────────────────────

/// One side of a pairing. An empty name means the slot is not yet
/// determined; `BYE` marks an automatic pass-through.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SeedSlot {
  pub name: String,
  pub score: Option<i64>,
}

impl SeedSlot {
  pub fn empty() -> Self {
    SeedSlot { name: String::new(), score: None }
  }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BracketSeed {
  pub id: String,
  pub date: String,
  pub teams: [SeedSlot; 2],
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BracketRound {
  pub number: u32,
  pub title: String,
  pub seeds: Vec<BracketSeed>,
}

// ── Helpers ────────────────────────────────────────────────────────────

pub fn format_match_date(unix_secs: i64) -> String {
  match Utc.timestamp_opt(unix_secs, 0) {
    LocalResult::Single(dt) => dt.format("%a %b %d %Y").to_string(),
    _ => String::new(),
  }
}

fn round_title(number: u32) -> String {
  format!("Round {number}")
}

// ── Seed construction ──────────────────────────────────────────────────

/// Groups an event's matches into bracket rounds. Seeds within a round
/// follow `number_in_bracket` order; rounds are ordered by round number.
/// Event matches without a resolvable match detail are dropped, as are
/// bye entries that do not name the advancing team.
pub fn build_bracket_rounds(
  event_matches: &[EventMatch],
  match_details: &HashMap<String, Match>,
) -> Vec<BracketRound> {
  let mut sorted: Vec<&EventMatch> = event_matches.iter().collect();
  sorted.sort_by_key(|em| em.number_in_bracket);

  let mut rounds_map: BTreeMap<u32, Vec<BracketSeed>> = BTreeMap::new();
  for em in sorted {
    let detail = match em.match_id.as_ref().and_then(|id| match_details.get(id)) {
      Some(detail) => detail,
      None => continue,
    };
    let seed = if em.is_bye {
      let advancing = match em.bye_team_id.as_deref().filter(|id| !id.trim().is_empty()) {
        Some(id) => id.to_string(),
        None => {
          tracing::warn!("bye entry {} has no advancing team, dropping", em.id);
          continue;
        }
      };
      BracketSeed {
        id: detail.match_id.clone(),
        date: format_match_date(detail.scheduled_time),
        teams: [
          SeedSlot { name: advancing, score: None },
          SeedSlot { name: BYE_TEAM_SENTINEL.to_string(), score: None },
        ],
      }
    } else {
      BracketSeed {
        id: detail.match_id.clone(),
        date: format_match_date(detail.scheduled_time),
        teams: [
          SeedSlot {
            name: detail.team1_id.clone(),
            score: detail.results_score_team1,
          },
          SeedSlot {
            name: detail.team2_id.clone(),
            score: detail.results_score_team2,
          },
        ],
      }
    };
    let number = em.round.max(0) as u32;
    rounds_map.entry(number).or_default().push(seed);
  }

  rounds_map
    .into_iter()
    .map(|(number, seeds)| BracketRound {
      number,
      title: round_title(number),
      seeds,
    })
    .collect()
}

// ── Auto-completion ────────────────────────────────────────────────────

/// Extends a partially known single-elimination bracket with placeholder
/// rounds until the final round holds exactly one seed. Real rounds are
/// never mutated; each appended round has ceil(n / 2) seeds with two
/// undetermined slots. An empty input yields an empty bracket.
pub fn autofill_bracket(initial: Vec<BracketRound>) -> Vec<BracketRound> {
  let mut result = initial;
  let Some(last) = result.last() else {
    return result;
  };

  let mut current_count = last.seeds.len();
  let mut round_number = result.len() as u32 + 1;

  while current_count > 1 {
    let next_count = current_count.div_ceil(2);
    let title = round_title(round_number);
    let seeds = (0..next_count)
      .map(|i| BracketSeed {
        id: format!("{PLACEHOLDER_SEED_PREFIX}{title}-{i}"),
        date: String::new(),
        teams: [SeedSlot::empty(), SeedSlot::empty()],
      })
      .collect();
    result.push(BracketRound {
      number: round_number,
      title,
      seeds,
    });
    current_count = next_count;
    round_number += 1;
  }

  result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn real_round(number: u32, seed_count: usize) -> BracketRound {
        let seeds = (0..seed_count)
            .map(|i| BracketSeed {
                id: format!("m{number}-{i}"),
                date: "Sat Mar 01 2025".to_string(),
                teams: [
                    SeedSlot { name: format!("team-{i}a"), score: Some(13) },
                    SeedSlot { name: format!("team-{i}b"), score: Some(7) },
                ],
            })
            .collect();
        BracketRound {
            number,
            title: format!("Round {number}"),
            seeds,
        }
    }

    fn event_match(id: &str, round: i64, number: i64, match_id: Option<&str>) -> EventMatch {
        EventMatch {
            id: id.to_string(),
            event_id: "ev1".to_string(),
            match_id: match_id.map(|m| m.to_string()),
            round,
            number_in_bracket: number,
            is_bye: false,
            bye_team_id: None,
        }
    }

    fn match_detail(match_id: &str, team1: &str, team2: &str) -> Match {
        Match {
            match_id: match_id.to_string(),
            team1_id: team1.to_string(),
            team2_id: team2.to_string(),
            scheduled_time: 1740787200,
            status: "SCHEDULED".to_string(),
            competition: None,
            platform: None,
            match_url: None,
            results_winner: None,
            results_score_team1: Some(13),
            results_score_team2: Some(9),
        }
    }

    #[test]
    fn test_autofill_eight_seeds_appends_three_rounds() {
        let out = autofill_bracket(vec![real_round(1, 8)]);
        assert_eq!(out.len(), 4);
        let counts: Vec<usize> = out.iter().map(|r| r.seeds.len()).collect();
        assert_eq!(counts, vec![8, 4, 2, 1]);
    }

    #[test]
    fn test_autofill_odd_seed_count_rounds_up() {
        let out = autofill_bracket(vec![real_round(1, 3)]);
        let counts: Vec<usize> = out.iter().map(|r| r.seeds.len()).collect();
        assert_eq!(counts, vec![3, 2, 1]);
    }

    #[test]
    fn test_autofill_halving_invariant() {
        for n in 1..=33usize {
            let out = autofill_bracket(vec![real_round(1, n)]);
            assert_eq!(out.last().unwrap().seeds.len(), 1);
            for pair in out.windows(2) {
                assert_eq!(pair[1].seeds.len(), pair[0].seeds.len().div_ceil(2));
            }
        }
    }

    #[test]
    fn test_autofill_final_round_is_noop() {
        let input = vec![real_round(1, 2), real_round(2, 1)];
        let out = autofill_bracket(input.clone());
        assert_eq!(out, input);
    }

    #[test]
    fn test_autofill_empty_input_is_empty() {
        assert!(autofill_bracket(Vec::new()).is_empty());
    }

    #[test]
    fn test_autofill_preserves_real_rounds() {
        let input = vec![real_round(1, 4)];
        let out = autofill_bracket(input.clone());
        assert_eq!(out[0], input[0]);
    }

    #[test]
    fn test_autofill_placeholder_seeds_are_blank_and_prefixed() {
        let out = autofill_bracket(vec![real_round(1, 4)]);
        assert_eq!(out.len(), 3);
        for round in &out[1..] {
            for seed in &round.seeds {
                assert!(seed.id.starts_with(PLACEHOLDER_SEED_PREFIX));
                assert!(seed.date.is_empty());
                for slot in &seed.teams {
                    assert!(slot.name.is_empty());
                    assert!(slot.score.is_none());
                }
            }
        }
    }

    #[test]
    fn test_autofill_continues_round_numbering() {
        let out = autofill_bracket(vec![real_round(1, 4)]);
        assert_eq!(out[1].number, 2);
        assert_eq!(out[1].title, "Round 2");
        assert_eq!(out[2].number, 3);
        assert_eq!(out[2].title, "Round 3");
    }

    #[test]
    fn test_build_groups_and_sorts_rounds() {
        let event_matches = vec![
            event_match("em3", 2, 3, Some("m3")),
            event_match("em2", 1, 2, Some("m2")),
            event_match("em1", 1, 1, Some("m1")),
        ];
        let details: HashMap<String, Match> = [
            ("m1".to_string(), match_detail("m1", "a", "b")),
            ("m2".to_string(), match_detail("m2", "c", "d")),
            ("m3".to_string(), match_detail("m3", "e", "f")),
        ]
        .into_iter()
        .collect();

        let rounds = build_bracket_rounds(&event_matches, &details);
        assert_eq!(rounds.len(), 2);
        assert_eq!(rounds[0].number, 1);
        assert_eq!(rounds[0].seeds.len(), 2);
        // number_in_bracket ordering within the round
        assert_eq!(rounds[0].seeds[0].id, "m1");
        assert_eq!(rounds[0].seeds[1].id, "m2");
        assert_eq!(rounds[1].number, 2);
        assert_eq!(rounds[1].seeds[0].teams[0].name, "e");
        assert_eq!(rounds[1].seeds[0].teams[0].score, Some(13));
    }

    #[test]
    fn test_build_skips_missing_detail() {
        let event_matches = vec![
            event_match("em1", 1, 1, Some("m1")),
            event_match("em2", 1, 2, Some("missing")),
            event_match("em3", 1, 3, None),
        ];
        let details: HashMap<String, Match> =
            [("m1".to_string(), match_detail("m1", "a", "b"))].into_iter().collect();

        let rounds = build_bracket_rounds(&event_matches, &details);
        assert_eq!(rounds.len(), 1);
        assert_eq!(rounds[0].seeds.len(), 1);
    }

    #[test]
    fn test_build_bye_seed() {
        let mut em = event_match("em1", 1, 1, Some("m1"));
        em.is_bye = true;
        em.bye_team_id = Some("pf-123".to_string());
        let details: HashMap<String, Match> =
            [("m1".to_string(), match_detail("m1", "a", "b"))].into_iter().collect();

        let rounds = build_bracket_rounds(&[em], &details);
        let seed = &rounds[0].seeds[0];
        assert_eq!(seed.teams[0].name, "pf-123");
        assert_eq!(seed.teams[0].score, None);
        assert_eq!(seed.teams[1].name, BYE_TEAM_SENTINEL);
        assert_eq!(seed.teams[1].score, None);
    }

    #[test]
    fn test_build_drops_bye_without_advancing_team() {
        let mut em = event_match("em1", 1, 1, Some("m1"));
        em.is_bye = true;
        let details: HashMap<String, Match> =
            [("m1".to_string(), match_detail("m1", "a", "b"))].into_iter().collect();

        assert!(build_bracket_rounds(&[em], &details).is_empty());
    }

    #[test]
    fn test_build_then_autofill_terminates_in_final() {
        let event_matches: Vec<EventMatch> = (0..5)
            .map(|i| event_match(&format!("em{i}"), 1, i, Some("m1")))
            .collect();
        let details: HashMap<String, Match> =
            [("m1".to_string(), match_detail("m1", "a", "b"))].into_iter().collect();

        let full = autofill_bracket(build_bracket_rounds(&event_matches, &details));
        let counts: Vec<usize> = full.iter().map(|r| r.seeds.len()).collect();
        assert_eq!(counts, vec![5, 3, 2, 1]);
    }

    #[test]
    fn test_format_match_date() {
        // 2025-03-01T00:00:00Z
        assert_eq!(format_match_date(1740787200), "Sat Mar 01 2025");
    }
}
