//! Rating heuristics: match star rating, win probability, and the
//! post-match rating update.

// ── Star rating tuning ─────────────────────────────────────────────────

// Lower decay punishes rating gaps more harshly.
const COMPETITIVENESS_DECAY_RATE: f64 = 400.0;
const COMPETITIVENESS_BIAS: f64 = 0.15;

// Rating where the quality term crosses 0.5.
const QUALITY_MIDPOINT_ELO: f64 = 1800.0;
const QUALITY_CURVE_STEEPNESS: f64 = 400.0;

// Matches between sub-2000-average teams never reach five stars.
const LOW_AVERAGE_CLAMP_ELO: f64 = 2000.0;
const LOW_AVERAGE_CLAMP_CEILING: f64 = 0.49;

const FIVE_STAR_THRESHOLD: f64 = 0.6;
const FOUR_STAR_THRESHOLD: f64 = 0.5;
const THREE_STAR_THRESHOLD: f64 = 0.35;
const TWO_STAR_THRESHOLD: f64 = 0.18;

// ── Rating update tuning ───────────────────────────────────────────────

// Maximum possible adjustment per match.
const ELO_K_FACTOR: f64 = 150.0;
const ELO_EXPECTED_DIVISOR: f64 = 600.0;
const WIN_PROBABILITY_DIVISOR: f64 = 400.0;

// ── Functions ──────────────────────────────────────────────────────────

/// Maps two team ratings to a 1-5 star display score: an exponential
/// competitiveness term (rating gap) multiplied by a sigmoid quality term
/// (average rating), bucketed against fixed thresholds.
pub fn match_stars(team1_elo: f64, team2_elo: f64) -> u8 {
    let avg_elo = (team1_elo + team2_elo) / 2.0;
    let elo_diff = (team1_elo - team2_elo).abs();

    let competitiveness = (-elo_diff / COMPETITIVENESS_DECAY_RATE).exp() + COMPETITIVENESS_BIAS;
    let quality = 1.0 / (1.0 + (-(avg_elo - QUALITY_MIDPOINT_ELO) / QUALITY_CURVE_STEEPNESS).exp());
    let game_score = competitiveness * quality;

    let clamped = if avg_elo < LOW_AVERAGE_CLAMP_ELO {
        game_score.min(LOW_AVERAGE_CLAMP_CEILING)
    } else {
        game_score
    };

    if clamped >= FIVE_STAR_THRESHOLD {
        5
    } else if clamped >= FOUR_STAR_THRESHOLD {
        4
    } else if clamped >= THREE_STAR_THRESHOLD {
        3
    } else if clamped >= TWO_STAR_THRESHOLD {
        2
    } else {
        1
    }
}

/// Standard ELO win probability for team 1.
pub fn win_probability(team1_elo: f64, team2_elo: f64) -> f64 {
    let elo_diff = team1_elo - team2_elo;
    1.0 / (1.0 + 10f64.powf(-elo_diff / WIN_PROBABILITY_DIVISOR))
}

pub fn expected_score(current_elo: f64, opponent_elo: f64) -> f64 {
    1.0 / (1.0 + 10f64.powf((opponent_elo - current_elo) / ELO_EXPECTED_DIVISOR))
}

pub fn updated_elo(current_elo: f64, opponent_elo: f64, won: bool) -> f64 {
    let result = if won { 1.0 } else { 0.0 };
    current_elo + ELO_K_FACTOR * (result - expected_score(current_elo, opponent_elo))
}

/// New ratings for both teams after a match.
pub fn updated_ratings(team1_elo: f64, team2_elo: f64, team1_won: bool) -> (f64, f64) {
    (
        updated_elo(team1_elo, team2_elo, team1_won),
        updated_elo(team2_elo, team1_elo, !team1_won),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_even_midpoint_match_is_three_stars() {
        // avg 1800 sits on the quality midpoint: quality 0.5, full
        // competitiveness 1.15, product 0.575 clamped to 0.49 → 3 stars.
        assert_eq!(match_stars(1800.0, 1800.0), 3);
    }

    #[test]
    fn test_lopsided_match_is_one_star() {
        // avg 2000 is at the clamp boundary (not clamped) but the 2000
        // rating gap floors the competitiveness term.
        assert_eq!(match_stars(1000.0, 3000.0), 1);
    }

    #[test]
    fn test_elite_even_match_is_five_stars() {
        assert_eq!(match_stars(2600.0, 2600.0), 5);
    }

    #[test]
    fn test_sub_2000_average_never_five_stars() {
        for elo in (800..2000).step_by(50) {
            assert!(match_stars(elo as f64, elo as f64) <= 4);
        }
    }

    #[test]
    fn test_stars_monotonic_in_rating_gap() {
        // Same 2400 average, widening gap.
        let mut last = u8::MAX;
        for delta in [0.0, 100.0, 300.0, 600.0, 1200.0] {
            let stars = match_stars(2400.0 - delta / 2.0, 2400.0 + delta / 2.0);
            assert!(stars <= last);
            last = stars;
        }
    }

    #[test]
    fn test_stars_monotonic_in_average_rating() {
        // Fixed rating gap, rising average. The sub-2000 clamp caps the
        // score but never lowers it below a poorer pairing's, so the
        // star count must be non-decreasing across the whole sweep.
        for delta in [0.0, 200.0] {
            let mut last = 0u8;
            for avg in (800..=3000).step_by(50) {
                let avg = avg as f64;
                let stars = match_stars(avg - delta / 2.0, avg + delta / 2.0);
                assert!(
                    stars >= last,
                    "stars dropped to {stars} at avg {avg}, delta {delta}"
                );
                last = stars;
            }
        }
    }

    #[test]
    fn test_stars_order_insensitive() {
        assert_eq!(match_stars(1700.0, 2100.0), match_stars(2100.0, 1700.0));
    }

    #[test]
    fn test_win_probability_even_match() {
        assert!((win_probability(1800.0, 1800.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_win_probability_complementary() {
        let p1 = win_probability(2000.0, 1600.0);
        let p2 = win_probability(1600.0, 2000.0);
        assert!(p1 > 0.5);
        assert!((p1 + p2 - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_updated_ratings_zero_sum() {
        let (new1, new2) = updated_ratings(1900.0, 1700.0, false);
        assert!(new1 < 1900.0);
        assert!(new2 > 1700.0);
        let drift = (new1 + new2) - (1900.0 + 1700.0);
        assert!(drift.abs() < 1e-9);
    }

    #[test]
    fn test_upset_moves_ratings_more() {
        let (favorite_wins, _) = updated_ratings(1900.0, 1700.0, true);
        let (favorite_loses, _) = updated_ratings(1900.0, 1700.0, false);
        let win_gain = favorite_wins - 1900.0;
        let loss_drop = 1900.0 - favorite_loses;
        assert!(loss_drop > win_gain);
    }
}
