//! Engine scores and win probabilities
//!
//! UCI engines report scores from the side to move's point of view. Everything
//! stored or compared in this crate is from White's point of view; the
//! conversion happens once, in [`Score::from_side_to_move`].

use crate::types::Color;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Logistic slope for centipawn scores
pub const CP_SCALE: f64 = 0.00368208;
/// Saturation constant for mate distances
pub const MATE_SCALE: f64 = 20.0;
pub const MIN_PROBABILITY: f64 = 0.001;
pub const MAX_PROBABILITY: f64 = 0.999;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Score {
    Centipawns(i32),
    /// Positive: White mates in n. Negative: Black mates in -n.
    Mate(i32),
    /// The given side has already been mated ("mate 0")
    Checkmated(Color),
}

impl Score {
    /// Convert a side-to-move relative score into White's perspective
    pub fn from_side_to_move(raw: Score, side: Color) -> Score {
        let orient = |v: i32| if side == Color::White { v } else { v.saturating_neg() };
        match raw {
            Score::Centipawns(cp) => Score::Centipawns(orient(cp)),
            Score::Mate(0) => Score::Checkmated(side),
            Score::Mate(n) => Score::Mate(orient(n)),
            Score::Checkmated(c) => Score::Checkmated(c),
        }
    }

    pub fn is_mate(&self) -> bool {
        !matches!(self, Score::Centipawns(_))
    }

    /// Probability that White wins, clamped to [0.001, 0.999]
    pub fn white_win_probability(&self) -> f64 {
        let p = match *self {
            Score::Centipawns(cp) => 1.0 / (1.0 + (-CP_SCALE * cp as f64).exp()),
            Score::Mate(n) => {
                let distance = n.unsigned_abs() as f64;
                let winner = 1.0 - 0.5 * distance / (distance + MATE_SCALE);
                if n > 0 {
                    winner
                } else {
                    1.0 - winner
                }
            }
            Score::Checkmated(Color::White) => 0.0,
            Score::Checkmated(Color::Black) => 1.0,
        };
        clamp_probability(p)
    }

    /// Win probability for `side`
    pub fn probability_for(&self, side: Color) -> f64 {
        side_probability(self.white_win_probability(), side)
    }

    /// Value in pawns for centipawn scores
    pub fn pawns(&self) -> Option<f64> {
        match *self {
            Score::Centipawns(cp) => Some(cp as f64 / 100.0),
            _ => None,
        }
    }
}

/// Turn a White win probability into the probability for `side`
pub fn side_probability(white: f64, side: Color) -> f64 {
    match side {
        Color::White => clamp_probability(white),
        Color::Black => clamp_probability(1.0 - white),
    }
}

pub fn clamp_probability(p: f64) -> f64 {
    if p.is_nan() {
        return 0.5;
    }
    p.clamp(MIN_PROBABILITY, MAX_PROBABILITY)
}

/// PGN `%eval` style: `0.35`, `-1.20`, `#3`, `#-2`
impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Score::Centipawns(cp) => write!(f, "{:.2}", cp as f64 / 100.0),
            Score::Mate(n) => write!(f, "#{}", n),
            Score::Checkmated(Color::White) => write!(f, "#-0"),
            Score::Checkmated(Color::Black) => write!(f, "#0"),
        }
    }
}
