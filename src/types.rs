//! Type definitions and constants
//!
//! Piece codes, colours, castling flags and square helpers shared by every
//! other module. A piece code packs the kind in the lower 3 bits and the
//! colour in bits 3-4, so `EMPTY` (0) never collides with a real piece.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Piece type constants (lower 3 bits)
pub const EMPTY: u8 = 0;
pub const PAWN: u8 = 1;
pub const KNIGHT: u8 = 2;
pub const BISHOP: u8 = 3;
pub const ROOK: u8 = 4;
pub const QUEEN: u8 = 5;
pub const KING: u8 = 6;

/// Color constants (bits 3-4)
pub const WHITE: u8 = 8;
pub const BLACK: u8 = 16;

/// Piece masks
pub const PIECE_MASK: u8 = 0b111;
pub const COLOR_MASK: u8 = 0b11000;

pub const WHITE_PAWN: u8 = WHITE | PAWN;
pub const WHITE_KNIGHT: u8 = WHITE | KNIGHT;
pub const WHITE_BISHOP: u8 = WHITE | BISHOP;
pub const WHITE_ROOK: u8 = WHITE | ROOK;
pub const WHITE_QUEEN: u8 = WHITE | QUEEN;
pub const WHITE_KING: u8 = WHITE | KING;

pub const BLACK_PAWN: u8 = BLACK | PAWN;
pub const BLACK_KNIGHT: u8 = BLACK | KNIGHT;
pub const BLACK_BISHOP: u8 = BLACK | BISHOP;
pub const BLACK_ROOK: u8 = BLACK | ROOK;
pub const BLACK_QUEEN: u8 = BLACK | QUEEN;
pub const BLACK_KING: u8 = BLACK | KING;

/// Castling rights bitmasks
pub const CASTLE_WK: u8 = 1;
pub const CASTLE_WQ: u8 = 2;
pub const CASTLE_BK: u8 = 4;
pub const CASTLE_BQ: u8 = 8;
pub const CASTLE_ALL: u8 = CASTLE_WK | CASTLE_WQ | CASTLE_BK | CASTLE_BQ;

/// Pieces a pawn may promote to, in generation order.
pub const PROMOTION_KINDS: [u8; 4] = [QUEEN, ROOK, BISHOP, KNIGHT];

/// File and rank names for coordinate notation
pub const FILE_NAMES: &[u8; 8] = b"abcdefgh";
pub const RANK_NAMES: &[u8; 8] = b"12345678";

/// Side of the board.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Color {
    White,
    Black,
}

impl Color {
    /// The opposing side.
    #[inline]
    pub fn opposite(self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    /// Colour bits used inside piece codes.
    #[inline]
    pub fn bits(self) -> u8 {
        match self {
            Color::White => WHITE,
            Color::Black => BLACK,
        }
    }

    #[inline]
    pub fn index(self) -> usize {
        match self {
            Color::White => 0,
            Color::Black => 1,
        }
    }

    /// Rank (0-based) the side's pieces start on.
    #[inline]
    pub fn back_rank(self) -> usize {
        match self {
            Color::White => 0,
            Color::Black => 7,
        }
    }

    /// Rank a pawn of this side promotes on.
    #[inline]
    pub fn promotion_rank(self) -> usize {
        match self {
            Color::White => 7,
            Color::Black => 0,
        }
    }

    /// Rank of the en passant target left by this side's double push.
    #[inline]
    pub fn ep_rank(self) -> usize {
        match self {
            Color::White => 2,
            Color::Black => 5,
        }
    }

    /// Kingside and queenside castling flags for this side.
    #[inline]
    pub fn castle_flags(self) -> (u8, u8) {
        match self {
            Color::White => (CASTLE_WK, CASTLE_WQ),
            Color::Black => (CASTLE_BK, CASTLE_BQ),
        }
    }

    /// FEN side-to-move letter.
    pub fn fen_char(self) -> char {
        match self {
            Color::White => 'w',
            Color::Black => 'b',
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::White => write!(f, "white"),
            Color::Black => write!(f, "black"),
        }
    }
}

/// Extract piece type from piece value
#[inline]
pub fn get_piece_type(piece: u8) -> u8 {
    piece & PIECE_MASK
}

/// Extract color bits from piece value
#[inline]
pub fn get_piece_color(piece: u8) -> u8 {
    piece & COLOR_MASK
}

/// Colour of a non-empty piece code.
#[inline]
pub fn color_of(piece: u8) -> Option<Color> {
    match get_piece_color(piece) {
        WHITE => Some(Color::White),
        BLACK => Some(Color::Black),
        _ => None,
    }
}

#[inline]
pub fn is_white(piece: u8) -> bool {
    (piece & COLOR_MASK) == WHITE
}

/// Build a piece code from a colour and a kind.
#[inline]
pub fn make_piece(color: Color, kind: u8) -> u8 {
    color.bits() | kind
}

#[inline]
pub fn file_of(sq: usize) -> usize {
    sq % 8
}

#[inline]
pub fn rank_of(sq: usize) -> usize {
    sq / 8
}

#[inline]
pub fn square_at(file: usize, rank: usize) -> usize {
    rank * 8 + file
}

/// Square reached by stepping `(df, dr)` from `sq`, or `None` off the board.
#[inline]
pub fn offset_square(sq: usize, df: i32, dr: i32) -> Option<usize> {
    let file = file_of(sq) as i32 + df;
    let rank = rank_of(sq) as i32 + dr;
    if (0..8).contains(&file) && (0..8).contains(&rank) {
        Some(square_at(file as usize, rank as usize))
    } else {
        None
    }
}

/// True for light squares (h1 is light).
#[inline]
pub fn is_light_square(sq: usize) -> bool {
    (file_of(sq) + rank_of(sq)) % 2 == 1
}

/// Convert square index (0-63) to algebraic notation (e.g., "e4")
pub fn square_name(sq: usize) -> String {
    let file = file_of(sq);
    let rank = rank_of(sq);
    format!("{}{}", FILE_NAMES[file] as char, RANK_NAMES[rank] as char)
}

/// Convert algebraic notation to square index
pub fn parse_square(name: &str) -> Option<usize> {
    let bytes = name.as_bytes();
    if bytes.len() != 2 {
        return None;
    }

    let file = match bytes[0] {
        b'a'..=b'h' => (bytes[0] - b'a') as usize,
        _ => return None,
    };

    let rank = match bytes[1] {
        b'1'..=b'8' => (bytes[1] - b'1') as usize,
        _ => return None,
    };

    Some(rank * 8 + file)
}

/// FEN piece character to piece value
pub fn fen_to_piece(c: char) -> Option<u8> {
    match c {
        'P' => Some(WHITE_PAWN),
        'N' => Some(WHITE_KNIGHT),
        'B' => Some(WHITE_BISHOP),
        'R' => Some(WHITE_ROOK),
        'Q' => Some(WHITE_QUEEN),
        'K' => Some(WHITE_KING),
        'p' => Some(BLACK_PAWN),
        'n' => Some(BLACK_KNIGHT),
        'b' => Some(BLACK_BISHOP),
        'r' => Some(BLACK_ROOK),
        'q' => Some(BLACK_QUEEN),
        'k' => Some(BLACK_KING),
        _ => None,
    }
}

/// Piece value to FEN character
pub fn piece_to_fen(piece: u8) -> Option<char> {
    match piece {
        WHITE_PAWN => Some('P'),
        WHITE_KNIGHT => Some('N'),
        WHITE_BISHOP => Some('B'),
        WHITE_ROOK => Some('R'),
        WHITE_QUEEN => Some('Q'),
        WHITE_KING => Some('K'),
        BLACK_PAWN => Some('p'),
        BLACK_KNIGHT => Some('n'),
        BLACK_BISHOP => Some('b'),
        BLACK_ROOK => Some('r'),
        BLACK_QUEEN => Some('q'),
        BLACK_KING => Some('k'),
        _ => None,
    }
}

/// Upper-case SAN letter for a piece kind (`None` for pawns).
pub fn kind_letter(kind: u8) -> Option<char> {
    match kind {
        KNIGHT => Some('N'),
        BISHOP => Some('B'),
        ROOK => Some('R'),
        QUEEN => Some('Q'),
        KING => Some('K'),
        _ => None,
    }
}

/// Piece kind from a SAN/UCI promotion letter, either case.
pub fn kind_from_letter(c: char) -> Option<u8> {
    match c.to_ascii_lowercase() {
        'p' => Some(PAWN),
        'n' => Some(KNIGHT),
        'b' => Some(BISHOP),
        'r' => Some(ROOK),
        'q' => Some(QUEEN),
        'k' => Some(KING),
        _ => None,
    }
}
