/// The rating given to a player the first time they appear in a match.
pub const DEFAULT_RATING: f64 = 1000.0;

/// The K-factor instantiating the Elo rating system.
///
/// This bounds the change in rating from a single pairwise result. Every finished match is scored as
/// one result per other participant, so a large lobby moves a rating many times over.
const K_FACTOR: f64 = 32.0;

/// The rating difference at which the stronger player is expected to score ten times as often.
const DEVIATION: f64 = 400.0;

/// Update a rating after a match.
///
/// The player is scored as having beaten `wins` opponents and lost to `losses` opponents, each of
/// whom is assumed to have the average rating of the lobby (`opponent`). Ratings are integral
/// between results, with each adjustment truncated toward zero, and all wins are applied before any
/// losses. The order matters under truncation and is part of the contract.
pub fn update(rating: f64, opponent: f64, wins: usize, losses: usize) -> f64 {
    let opponent = opponent as i64;
    let mut rating = rating as i64;
    for _ in 0..wins {
        rating = adjust(rating, opponent, 1.0);
    }
    for _ in 0..losses {
        rating = adjust(rating, opponent, 0.0);
    }
    rating as f64
}

/// The probability that a player rated `rating` beats a player rated `opponent`.
pub fn expected_score(rating: i64, opponent: i64) -> f64 {
    1.0 / (1.0 + 10f64.powf((opponent - rating) as f64 / DEVIATION))
}

fn adjust(rating: i64, opponent: i64, score: f64) -> i64 {
    rating + (K_FACTOR * (score - expected_score(rating, opponent))) as i64
}
