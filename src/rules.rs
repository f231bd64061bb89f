//! Rules Evaluator
//!
//! Game-termination classification, move validation against the legal set and
//! move application. Illegality is reported as a value (`Err`/status), never
//! as a panic, for any structurally valid position.

use crate::error::{MoveError, MoveResult};
use crate::move_generator::MoveGenerator;
use crate::moves::Move;
use crate::position::Position;
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a game ended in a draw
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DrawReason {
    Stalemate,
    InsufficientMaterial,
    FiftyMove,
    ThreefoldRepetition,
}

/// State of the game at a position
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameStatus {
    InProgress,
    WhiteWins,
    BlackWins,
    Draw(DrawReason),
}

impl GameStatus {
    pub fn is_over(&self) -> bool {
        *self != GameStatus::InProgress
    }

    /// PGN result token
    pub fn result_tag(&self) -> &'static str {
        match self {
            GameStatus::InProgress => "*",
            GameStatus::WhiteWins => "1-0",
            GameStatus::BlackWins => "0-1",
            GameStatus::Draw(_) => "1/2-1/2",
        }
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameStatus::InProgress => write!(f, "in progress"),
            GameStatus::WhiteWins => write!(f, "white wins"),
            GameStatus::BlackWins => write!(f, "black wins"),
            GameStatus::Draw(DrawReason::Stalemate) => write!(f, "draw by stalemate"),
            GameStatus::Draw(DrawReason::InsufficientMaterial) => write!(f, "draw by insufficient material"),
            GameStatus::Draw(DrawReason::FiftyMove) => write!(f, "draw by fifty-move rule"),
            GameStatus::Draw(DrawReason::ThreefoldRepetition) => write!(f, "draw by threefold repetition"),
        }
    }
}

/// Classify the position.
///
/// `history` holds the structural hashes of the positions reached so far, the
/// current one included or not; it is only used for repetition counting.
pub fn evaluate(pos: &Position, history: &[u64]) -> GameStatus {
    let gen = MoveGenerator::new();

    if gen.generate_legal_moves(pos).is_empty() {
        if gen.is_in_check(pos) {
            return match pos.side_to_move {
                Color::White => GameStatus::BlackWins,
                Color::Black => GameStatus::WhiteWins,
            };
        }
        return GameStatus::Draw(DrawReason::Stalemate);
    }

    if has_insufficient_material(pos) {
        return GameStatus::Draw(DrawReason::InsufficientMaterial);
    }

    if pos.halfmove_clock >= 100 {
        return GameStatus::Draw(DrawReason::FiftyMove);
    }

    if repetition_count(pos, history) >= 3 {
        return GameStatus::Draw(DrawReason::ThreefoldRepetition);
    }

    GameStatus::InProgress
}

/// How many times the current position has occurred, itself included
pub fn repetition_count(pos: &Position, history: &[u64]) -> usize {
    let current = pos.zobrist();
    let seen = history.iter().filter(|&&h| h == current).count();
    if history.last() == Some(&current) {
        seen
    } else {
        seen + 1
    }
}

/// Check for insufficient material to checkmate.
///
/// Covers bare kings, a single minor piece, and any number of bishops that all
/// stand on squares of one colour.
pub fn has_insufficient_material(pos: &Position) -> bool {
    let mut minors = 0;
    let mut knights = 0;
    let mut light_bishops = 0;
    let mut dark_bishops = 0;

    for (sq, piece) in pos.pieces() {
        match get_piece_type(piece) {
            KING => {}
            KNIGHT => {
                minors += 1;
                knights += 1;
            }
            BISHOP => {
                minors += 1;
                if is_light_square(sq) {
                    light_bishops += 1;
                } else {
                    dark_bishops += 1;
                }
            }
            _ => return false,
        }
    }

    if minors <= 1 {
        return true;
    }

    knights == 0 && (light_bishops == 0 || dark_bishops == 0)
}

/// Check a move against the position and return the canonical legal move.
///
/// The structural and promotion checks give specific errors; anything that
/// passes them but is not in the legal set is `Illegal`.
pub fn validate_move(pos: &Position, mv: &Move) -> MoveResult<Move> {
    if mv.from >= 64 {
        return Err(MoveError::OutOfBounds(mv.from));
    }
    if mv.to >= 64 {
        return Err(MoveError::OutOfBounds(mv.to));
    }
    if mv.from == mv.to {
        return Err(MoveError::SameSquare);
    }

    let piece = pos.piece_at(mv.from);
    if piece == EMPTY {
        return Err(MoveError::NoPiece(square_name(mv.from)));
    }
    if color_of(piece) != Some(pos.side_to_move) {
        return Err(MoveError::WrongSide(square_name(mv.from)));
    }

    let is_pawn = get_piece_type(piece) == PAWN;
    let reaches_far_rank = rank_of(mv.to) == pos.side_to_move.promotion_rank();
    match mv.promotion_piece() {
        Some(promoted) => {
            if !is_pawn {
                return Err(MoveError::InvalidPromotion("only pawns promote".to_string()));
            }
            if !reaches_far_rank {
                return Err(MoveError::InvalidPromotion(format!(
                    "{} is not on the last rank",
                    square_name(mv.to)
                )));
            }
            if color_of(promoted) != Some(pos.side_to_move) {
                return Err(MoveError::InvalidPromotion("promotion piece has the wrong colour".to_string()));
            }
            if !PROMOTION_KINDS.contains(&get_piece_type(promoted)) {
                return Err(MoveError::InvalidPromotion("pawns promote to Q, R, B or N".to_string()));
            }
        }
        None if is_pawn && reaches_far_rank => {
            return Err(MoveError::InvalidPromotion("a promotion piece is required".to_string()));
        }
        None => {}
    }

    MoveGenerator::new()
        .generate_legal_moves(pos)
        .into_iter()
        .find(|legal| {
            legal.from == mv.from && legal.to == mv.to && legal.promotion_piece() == mv.promotion_piece()
        })
        .ok_or_else(|| MoveError::Illegal(mv.to_uci()))
}

/// Apply a move that has already passed [`validate_move`].
pub fn apply_move(pos: &mut Position, mv: &Move) {
    pos.play_unchecked(mv);
}

/// Validate then apply. The position is untouched when the move is rejected.
pub fn try_apply_move(pos: &mut Position, mv: &Move) -> MoveResult<Move> {
    let legal = validate_move(pos, mv)?;
    apply_move(pos, &legal);
    Ok(legal)
}
