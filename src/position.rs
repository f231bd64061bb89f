//! Position representation
//!
//! An 8x8 mailbox of piece codes plus the state FEN carries: side to move,
//! castling rights, en passant target and the two move counters. Positions are
//! small plain values; the move generator clones them freely to test legality.

use crate::error::FenError;
use crate::fen;
use crate::moves::{Move, MoveKind};
use crate::types::*;
use std::fmt;

/// Chess position
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Position {
    /// 64-element array representing the board (0=a1, 1=b1, ..., 63=h8)
    pub squares: [u8; 64],
    pub side_to_move: Color,
    /// Bitmask for castling rights (1=K, 2=Q, 4=k, 8=q)
    pub castling_rights: u8,
    /// Square a pawn skipped over on the previous move
    pub en_passant: Option<usize>,
    /// Half-moves since the last pawn move or capture (for 50-move rule)
    pub halfmove_clock: u32,
    pub fullmove_number: u32,
}

impl Position {
    /// The standard starting position
    pub fn new() -> Self {
        let mut pos = Position::empty();
        let back = [ROOK, KNIGHT, BISHOP, QUEEN, KING, BISHOP, KNIGHT, ROOK];
        for (file, &kind) in back.iter().enumerate() {
            pos.squares[square_at(file, 0)] = make_piece(Color::White, kind);
            pos.squares[square_at(file, 1)] = WHITE_PAWN;
            pos.squares[square_at(file, 6)] = BLACK_PAWN;
            pos.squares[square_at(file, 7)] = make_piece(Color::Black, kind);
        }
        pos.castling_rights = CASTLE_ALL;
        pos
    }

    /// A board with no pieces, White to move, no rights
    pub fn empty() -> Self {
        Position {
            squares: [EMPTY; 64],
            side_to_move: Color::White,
            castling_rights: 0,
            en_passant: None,
            halfmove_clock: 0,
            fullmove_number: 1,
        }
    }

    /// Create a position from a FEN string (or the literal "startpos")
    pub fn from_fen(text: &str) -> Result<Self, FenError> {
        fen::parse(text)
    }

    /// Generate FEN string from current position
    pub fn to_fen(&self) -> String {
        fen::to_fen(self)
    }

    /// True if this is exactly the standard start layout with fresh counters
    pub fn is_start_position(&self) -> bool {
        *self == Position::new()
    }

    #[inline]
    pub fn piece_at(&self, sq: usize) -> u8 {
        self.squares[sq]
    }

    #[inline]
    pub fn is_empty(&self, sq: usize) -> bool {
        self.squares[sq] == EMPTY
    }

    /// Occupied squares with their piece codes
    pub fn pieces(&self) -> impl Iterator<Item = (usize, u8)> + '_ {
        self.squares
            .iter()
            .enumerate()
            .filter(|(_, &p)| p != EMPTY)
            .map(|(sq, &p)| (sq, p))
    }

    /// Find the king's square for the specified color
    pub fn find_king(&self, color: Color) -> Option<usize> {
        let king = make_piece(color, KING);
        self.squares.iter().position(|&p| p == king)
    }

    #[inline]
    pub fn has_castling_right(&self, flag: u8) -> bool {
        self.castling_rights & flag != 0
    }

    /// The rook a castling right refers to.
    ///
    /// Scans outward from the king along its back rank and returns the first
    /// rook of the same colour, which also covers non-standard starting files.
    pub fn castling_rook(&self, color: Color, kingside: bool) -> Option<usize> {
        let king_sq = self.find_king(color)?;
        if rank_of(king_sq) != color.back_rank() {
            return None;
        }
        let rook = make_piece(color, ROOK);
        let step: i32 = if kingside { 1 } else { -1 };
        let mut sq = king_sq;
        while let Some(next) = offset_square(sq, step, 0) {
            if self.squares[next] == rook {
                return Some(next);
            }
            sq = next;
        }
        None
    }

    /// Play a move without checking it.
    ///
    /// The caller guarantees the move came from the generator (or was validated
    /// against it). Used both for real moves and for legality simulation.
    pub fn play_unchecked(&mut self, mv: &Move) {
        let mover = self.side_to_move;
        let piece = self.squares[mv.from];
        let piece_type = get_piece_type(piece);

        let enemy = mover.opposite();
        let captured_rook_sq = match mv.captured {
            Some(p) if get_piece_type(p) == ROOK && !mv.is_en_passant() => Some(mv.to),
            _ => None,
        };

        match mv.kind {
            MoveKind::Normal => {
                self.squares[mv.from] = EMPTY;
                self.squares[mv.to] = piece;
            }
            MoveKind::Castle { rook_from, rook_to } => {
                let rook = self.squares[rook_from];
                let king_to = mv.king_destination();
                self.squares[mv.from] = EMPTY;
                self.squares[rook_from] = EMPTY;
                self.squares[king_to] = piece;
                self.squares[rook_to] = rook;
            }
            MoveKind::EnPassant => {
                let captured_sq = square_at(file_of(mv.to), rank_of(mv.from));
                self.squares[captured_sq] = EMPTY;
                self.squares[mv.from] = EMPTY;
                self.squares[mv.to] = piece;
            }
            MoveKind::Promotion(promoted) => {
                self.squares[mv.from] = EMPTY;
                self.squares[mv.to] = promoted;
            }
        }

        // Update castling rights
        if piece_type == KING {
            let (ks, qs) = mover.castle_flags();
            self.castling_rights &= !(ks | qs);
        } else if piece_type == ROOK {
            self.clear_rook_right(mover, mv.from);
        }
        if let Some(sq) = captured_rook_sq {
            self.clear_rook_right(enemy, sq);
        }

        // Update en passant square
        self.en_passant = None;
        if piece_type == PAWN && rank_of(mv.from).abs_diff(rank_of(mv.to)) == 2 {
            self.en_passant = Some((mv.from + mv.to) / 2);
        }

        // Update halfmove clock
        if piece_type == PAWN || mv.is_capture() {
            self.halfmove_clock = 0;
        } else {
            self.halfmove_clock = self.halfmove_clock.saturating_add(1);
        }

        // Update fullmove number
        if mover == Color::Black {
            self.fullmove_number = self.fullmove_number.saturating_add(1);
        }

        self.side_to_move = enemy;
    }

    /// Drop the right a back-rank rook on `sq` stands for, judged by which side
    /// of the king it is on.
    fn clear_rook_right(&mut self, color: Color, sq: usize) {
        if rank_of(sq) != color.back_rank() {
            return;
        }
        let king_sq = match self.find_king(color) {
            Some(k) if rank_of(k) == color.back_rank() => k,
            _ => return,
        };
        let (ks, qs) = color.castle_flags();
        if file_of(sq) > file_of(king_sq) {
            self.castling_rights &= !ks;
        } else if file_of(sq) < file_of(king_sq) {
            self.castling_rights &= !qs;
        }
    }

    /// Display the board as a string
    pub fn display(&self) -> String {
        let mut lines = Vec::new();
        lines.push("  +---+---+---+---+---+---+---+---+".to_string());

        for rank in (0..8).rev() {
            let mut row = format!("{} |", rank + 1);
            for file in 0..8 {
                let piece = self.squares[rank * 8 + file];
                if piece == EMPTY {
                    row.push_str("   |");
                } else if let Some(c) = piece_to_fen(piece) {
                    row.push_str(&format!(" {} |", c));
                } else {
                    row.push_str(" ? |");
                }
            }
            lines.push(row);
            lines.push("  +---+---+---+---+---+---+---+---+".to_string());
        }
        lines.push("    a   b   c   d   e   f   g   h".to_string());

        lines.join("\n")
    }
}

impl Default for Position {
    fn default() -> Self {
        Position::new()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_position_layout() {
        let pos = Position::new();
        assert_eq!(pos.find_king(Color::White), Some(4));
        assert_eq!(pos.find_king(Color::Black), Some(60));
        assert_eq!(pos.castling_rook(Color::White, true), Some(7));
        assert_eq!(pos.castling_rook(Color::Black, false), Some(56));
        assert_eq!(pos.pieces().count(), 32);
        assert!(pos.is_start_position());
    }

    #[test]
    fn double_push_sets_en_passant_and_counters() {
        let mut pos = Position::new();
        let e2 = parse_square("e2").unwrap();
        let e4 = parse_square("e4").unwrap();
        pos.play_unchecked(&Move::normal(e2, e4, WHITE_PAWN, None));
        assert_eq!(pos.en_passant, parse_square("e3"));
        assert_eq!(pos.side_to_move, Color::Black);
        assert_eq!(pos.halfmove_clock, 0);
        assert_eq!(pos.fullmove_number, 1);

        let g8 = parse_square("g8").unwrap();
        let f6 = parse_square("f6").unwrap();
        pos.play_unchecked(&Move::normal(g8, f6, BLACK_KNIGHT, None));
        assert_eq!(pos.en_passant, None);
        assert_eq!(pos.halfmove_clock, 1);
        assert_eq!(pos.fullmove_number, 2);
    }

    #[test]
    fn rook_capture_clears_the_matching_right() {
        let mut pos = Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        let a1 = parse_square("a1").unwrap();
        let a8 = parse_square("a8").unwrap();
        pos.play_unchecked(&Move::normal(a1, a8, WHITE_ROOK, Some(BLACK_ROOK)));
        assert_eq!(pos.castling_rights, CASTLE_WK | CASTLE_BK);
    }

    #[test]
    fn counters_saturate_instead_of_overflowing() {
        let gen = crate::move_generator::MoveGenerator::new();

        let pos = Position::from_fen("4k3/8/8/8/8/8/8/4K3 w - - 4294967295 1").unwrap();
        assert_eq!(gen.generate_legal_moves(&pos).len(), 5);
        let mut next = pos.clone();
        next.play_unchecked(&Move::normal(4, 12, WHITE_KING, None));
        assert_eq!(next.halfmove_clock, u32::MAX);

        let pos = Position::from_fen("4k3/8/8/8/8/8/8/4K3 b - - 0 4294967295").unwrap();
        assert_eq!(gen.generate_legal_moves(&pos).len(), 5);
        let mut next = pos.clone();
        next.play_unchecked(&Move::normal(60, 52, BLACK_KING, None));
        assert_eq!(next.fullmove_number, u32::MAX);
    }
}
