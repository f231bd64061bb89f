//! Move notation
//!
//! Standard algebraic notation in both directions, plus a single entry point
//! that accepts whatever a user is likely to type: coordinate moves ("e2e4"),
//! castling words ("O-O", "0-0-0") or SAN ("Nbd7", "exd8=Q+").

use crate::error::{MoveError, MoveResult};
use crate::move_generator::MoveGenerator;
use crate::moves::{CoordinateMove, Move};
use crate::position::Position;
use crate::types::*;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref SAN_RE: Regex = Regex::new(
        r"^(?P<piece>[NBRQK])?(?P<file>[a-h])?(?P<rank>[1-8])?(?P<capture>x)?(?P<to>[a-h][1-8])(?:=?(?P<promo>[NBRQ]))?[+#]?[!?]*$"
    )
    .unwrap_or_else(|e| panic!("invalid SAN pattern: {}", e));
    static ref CASTLE_RE: Regex = Regex::new(r"^(?:O-O(?P<long>-O)?|0-0(?P<long0>-0)?)[+#]?[!?]*$")
        .unwrap_or_else(|e| panic!("invalid castling pattern: {}", e));
}

/// Render a legal move in SAN
pub fn to_san(pos: &Position, mv: &Move) -> String {
    let gen = MoveGenerator::new();
    let mut san = String::new();

    if mv.is_castle() {
        san.push_str(if mv.is_kingside_castle() { "O-O" } else { "O-O-O" });
    } else {
        let kind = get_piece_type(mv.piece);
        if kind == PAWN {
            if mv.is_capture() {
                san.push(FILE_NAMES[file_of(mv.from)] as char);
            }
        } else {
            if let Some(letter) = kind_letter(kind) {
                san.push(letter);
            }
            san.push_str(&disambiguation(pos, mv, &gen));
        }
        if mv.is_capture() {
            san.push('x');
        }
        san.push_str(&square_name(mv.to));
        if let Some(promoted) = mv.promotion_piece() {
            san.push('=');
            if let Some(letter) = kind_letter(get_piece_type(promoted)) {
                san.push(letter);
            }
        }
    }

    let mut after = pos.clone();
    after.play_unchecked(mv);
    if gen.is_in_check(&after) {
        if gen.generate_legal_moves(&after).is_empty() {
            san.push('#');
        } else {
            san.push('+');
        }
    }
    san
}

/// Smallest origin hint that tells `mv` apart from same-piece moves to the same square
fn disambiguation(pos: &Position, mv: &Move, gen: &MoveGenerator) -> String {
    let rivals: Vec<usize> = gen
        .generate_legal_moves(pos)
        .into_iter()
        .filter(|other| {
            !other.is_castle() && other.piece == mv.piece && other.to == mv.to && other.from != mv.from
        })
        .map(|other| other.from)
        .collect();

    if rivals.is_empty() {
        return String::new();
    }

    let file = FILE_NAMES[file_of(mv.from)] as char;
    let rank = RANK_NAMES[rank_of(mv.from)] as char;
    if rivals.iter().all(|&sq| file_of(sq) != file_of(mv.from)) {
        file.to_string()
    } else if rivals.iter().all(|&sq| rank_of(sq) != rank_of(mv.from)) {
        rank.to_string()
    } else {
        format!("{}{}", file, rank)
    }
}

/// Resolve SAN text against the legal moves of `pos`
pub fn parse_san(pos: &Position, text: &str) -> MoveResult<Move> {
    let text = text.trim();
    let legal = MoveGenerator::new().generate_legal_moves(pos);

    if let Some(caps) = CASTLE_RE.captures(text) {
        let kingside = caps.name("long").is_none() && caps.name("long0").is_none();
        return legal
            .into_iter()
            .find(|m| m.is_castle() && m.is_kingside_castle() == kingside)
            .ok_or_else(|| MoveError::Illegal(text.to_string()));
    }

    let caps = SAN_RE
        .captures(text)
        .ok_or_else(|| MoveError::Parse(text.to_string()))?;

    let kind = match caps.name("piece") {
        Some(m) => m
            .as_str()
            .chars()
            .next()
            .and_then(kind_from_letter)
            .ok_or_else(|| MoveError::Parse(text.to_string()))?,
        None => PAWN,
    };
    let to = caps
        .name("to")
        .and_then(|m| parse_square(m.as_str()))
        .ok_or_else(|| MoveError::Parse(text.to_string()))?;
    let from_file = caps
        .name("file")
        .map(|m| (m.as_str().as_bytes()[0] - b'a') as usize);
    let from_rank = caps
        .name("rank")
        .map(|m| (m.as_str().as_bytes()[0] - b'1') as usize);
    let promo = caps
        .name("promo")
        .and_then(|m| m.as_str().chars().next())
        .and_then(kind_from_letter);

    if promo.is_some() && kind != PAWN {
        return Err(MoveError::InvalidPromotion(text.to_string()));
    }

    let candidates: Vec<Move> = legal
        .into_iter()
        .filter(|m| {
            !m.is_castle()
                && get_piece_type(m.piece) == kind
                && m.to == to
                && from_file.map_or(true, |f| file_of(m.from) == f)
                && from_rank.map_or(true, |r| rank_of(m.from) == r)
                && m.promotion_piece().map(get_piece_type) == promo
        })
        .collect();

    match candidates.as_slice() {
        [only] => Ok(*only),
        [] => Err(MoveError::Illegal(text.to_string())),
        _ => Err(MoveError::Ambiguous(text.to_string())),
    }
}

/// Match coordinate text to a legal move, with specific errors for common mistakes
pub fn resolve_coordinate(pos: &Position, coord: &CoordinateMove) -> MoveResult<Move> {
    let piece = pos.piece_at(coord.from);
    if piece == EMPTY {
        return Err(MoveError::NoPiece(square_name(coord.from)));
    }
    if color_of(piece) != Some(pos.side_to_move) {
        return Err(MoveError::WrongSide(square_name(coord.from)));
    }

    let pawn_to_last_rank =
        get_piece_type(piece) == PAWN && rank_of(coord.to) == pos.side_to_move.promotion_rank();
    match coord.promotion {
        Some(_) if !pawn_to_last_rank => {
            return Err(MoveError::InvalidPromotion(format!(
                "{}{} is not a promotion",
                square_name(coord.from),
                square_name(coord.to)
            )))
        }
        None if pawn_to_last_rank => {
            return Err(MoveError::InvalidPromotion("a promotion piece is required".to_string()))
        }
        _ => {}
    }

    MoveGenerator::new()
        .generate_legal_moves(pos)
        .into_iter()
        .find(|m| coord.matches(m))
        .ok_or_else(|| {
            let mut text = format!("{}{}", square_name(coord.from), square_name(coord.to));
            if let Some(letter) = coord.promotion.and_then(kind_letter) {
                text.push(letter.to_ascii_lowercase());
            }
            MoveError::Illegal(text)
        })
}

/// Parse user input in coordinate, castling or SAN form
pub fn parse_move(pos: &Position, text: &str) -> MoveResult<Move> {
    let text = text.trim();
    if text.is_empty() {
        return Err(MoveError::Parse(String::new()));
    }
    match CoordinateMove::parse(text) {
        Ok(coord) => resolve_coordinate(pos, &coord),
        Err(MoveError::Parse(_)) => parse_san(pos, text),
        Err(e) => Err(e),
    }
}
