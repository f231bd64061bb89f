//! Move representation
//!
//! A move is one `Copy` value: the common fields plus a [`MoveKind`] tag that
//! carries the kind-specific payload (promotion piece, castling rook squares).

use crate::error::MoveError;
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What kind of move this is, with the data only that kind needs
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoveKind {
    Normal,
    /// King and rook move together. `rook_to` is the f- or d-file square.
    Castle { rook_from: usize, rook_to: usize },
    /// The captured pawn sits one rank behind `to`.
    EnPassant,
    /// Colour-matched piece code the pawn becomes.
    Promotion(u8),
}

/// A chess move
///
/// For castling `to` is the king's destination, except in layouts where the
/// king already stands there; then `to` is the rook's square (king takes rook).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Move {
    pub from: usize,
    pub to: usize,
    pub piece: u8,
    pub captured: Option<u8>,
    pub kind: MoveKind,
}

impl Move {
    /// Create a plain move or capture
    pub fn normal(from: usize, to: usize, piece: u8, captured: Option<u8>) -> Self {
        Move {
            from,
            to,
            piece,
            captured,
            kind: MoveKind::Normal,
        }
    }

    /// Create a promotion move
    pub fn promotion(from: usize, to: usize, piece: u8, captured: Option<u8>, promote_to: u8) -> Self {
        Move {
            from,
            to,
            piece,
            captured,
            kind: MoveKind::Promotion(promote_to),
        }
    }

    /// Create a castling move
    pub fn castle(from: usize, to: usize, piece: u8, rook_from: usize, rook_to: usize) -> Self {
        Move {
            from,
            to,
            piece,
            captured: None,
            kind: MoveKind::Castle { rook_from, rook_to },
        }
    }

    /// Create an en passant move
    pub fn en_passant(from: usize, to: usize, piece: u8, captured: u8) -> Self {
        Move {
            from,
            to,
            piece,
            captured: Some(captured),
            kind: MoveKind::EnPassant,
        }
    }

    #[inline]
    pub fn is_capture(&self) -> bool {
        self.captured.is_some()
    }

    #[inline]
    pub fn is_castle(&self) -> bool {
        matches!(self.kind, MoveKind::Castle { .. })
    }

    #[inline]
    pub fn is_en_passant(&self) -> bool {
        self.kind == MoveKind::EnPassant
    }

    /// Piece code a promoting pawn turns into
    pub fn promotion_piece(&self) -> Option<u8> {
        match self.kind {
            MoveKind::Promotion(p) => Some(p),
            _ => None,
        }
    }

    /// Colour of the moving piece
    pub fn color(&self) -> Option<Color> {
        color_of(self.piece)
    }

    /// True for castling toward the h-file
    pub fn is_kingside_castle(&self) -> bool {
        match self.kind {
            MoveKind::Castle { rook_from, .. } => file_of(rook_from) > file_of(self.from),
            _ => false,
        }
    }

    /// Where the king ends up. Equal to `to` for everything but king-takes-rook castling.
    pub fn king_destination(&self) -> usize {
        match self.kind {
            MoveKind::Castle { .. } => {
                let file = if self.is_kingside_castle() { 6 } else { 2 };
                square_at(file, rank_of(self.from))
            }
            _ => self.to,
        }
    }

    /// Convert move to UCI notation (e.g., "e2e4", "e7e8q")
    pub fn to_uci(&self) -> String {
        let mut uci = format!("{}{}", square_name(self.from), square_name(self.to));
        if let Some(p) = self.promotion_piece() {
            let promo_char = match get_piece_type(p) {
                QUEEN => 'q',
                ROOK => 'r',
                BISHOP => 'b',
                KNIGHT => 'n',
                _ => return uci,
            };
            uci.push(promo_char);
        }
        uci
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_uci())
    }
}

/// A move as written in coordinate form, before it is matched to a position
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CoordinateMove {
    pub from: usize,
    pub to: usize,
    /// Colourless piece kind
    pub promotion: Option<u8>,
}

impl CoordinateMove {
    /// Parse `<from><to>[promotion]`, e.g. "e2e4" or "a7a8q".
    pub fn parse(text: &str) -> Result<Self, MoveError> {
        let text = text.trim();
        if !(4..=5).contains(&text.len()) || !text.is_ascii() {
            return Err(MoveError::Parse(text.to_string()));
        }

        let from = parse_square(&text[0..2]).ok_or_else(|| MoveError::Parse(text.to_string()))?;
        let to = parse_square(&text[2..4]).ok_or_else(|| MoveError::Parse(text.to_string()))?;

        let promotion = match text.chars().nth(4) {
            None => None,
            Some(c) => match kind_from_letter(c) {
                Some(kind) if PROMOTION_KINDS.contains(&kind) => Some(kind),
                _ => {
                    return Err(MoveError::InvalidPromotion(format!(
                        "'{}' is not one of q, r, b, n",
                        c
                    )))
                }
            },
        };

        if from == to {
            return Err(MoveError::SameSquare);
        }

        Ok(CoordinateMove { from, to, promotion })
    }

    /// True if `mv` is what this coordinate text describes.
    ///
    /// Castling matches both the king-destination and the king-takes-rook spelling.
    pub fn matches(&self, mv: &Move) -> bool {
        if mv.from != self.from {
            return false;
        }
        let promo_kind = mv.promotion_piece().map(get_piece_type);
        if promo_kind != self.promotion {
            return false;
        }
        match mv.kind {
            MoveKind::Castle { rook_from, .. } => {
                self.to == mv.to || self.to == mv.king_destination() || self.to == rook_from
            }
            _ => mv.to == self.to,
        }
    }
}
