//! FEN parsing and generation
//!
//! `validate_structure` is the cheap pre-check the engine bridge runs before a
//! FEN is allowed anywhere near the external process; `parse` builds a
//! [`Position`] on top of it.

use crate::error::FenError;
use crate::position::Position;
use crate::types::*;

/// Starting position FEN
pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Literal accepted in place of the starting FEN
pub const STARTPOS: &str = "startpos";

/// Check placement, side to move and king counts without building a position.
pub fn validate_structure(fen: &str) -> Result<(), FenError> {
    let fen = fen.trim();
    if fen == STARTPOS {
        return Ok(());
    }
    let parts: Vec<&str> = fen.split_whitespace().collect();
    if parts.is_empty() {
        return Err(FenError::Empty);
    }
    if !(4..=6).contains(&parts.len()) {
        return Err(FenError::FieldCount(parts.len()));
    }

    let ranks: Vec<&str> = parts[0].split('/').collect();
    if ranks.len() != 8 {
        return Err(FenError::RankCount(ranks.len()));
    }

    let mut white_kings = 0;
    let mut black_kings = 0;
    for (i, rank) in ranks.iter().enumerate() {
        let mut width = 0usize;
        for c in rank.chars() {
            match c {
                '1'..='8' => width += c as usize - '0' as usize,
                'K' => {
                    white_kings += 1;
                    width += 1;
                }
                'k' => {
                    black_kings += 1;
                    width += 1;
                }
                _ if fen_to_piece(c).is_some() => width += 1,
                _ => return Err(FenError::BadPiece(c)),
            }
        }
        if width != 8 {
            return Err(FenError::RankWidth {
                rank: 8 - i,
                width,
            });
        }
    }

    if parts[1] != "w" && parts[1] != "b" {
        return Err(FenError::SideToMove(parts[1].to_string()));
    }
    if white_kings != 1 {
        return Err(FenError::KingCount {
            color: Color::White,
            count: white_kings,
        });
    }
    if black_kings != 1 {
        return Err(FenError::KingCount {
            color: Color::Black,
            count: black_kings,
        });
    }
    Ok(())
}

/// Parse a FEN string (or "startpos") into a position
pub fn parse(fen: &str) -> Result<Position, FenError> {
    validate_structure(fen)?;
    let fen = fen.trim();
    if fen == STARTPOS {
        return Ok(Position::new());
    }
    let parts: Vec<&str> = fen.split_whitespace().collect();

    let mut pos = Position::empty();

    // Parse piece placement
    let mut rank = 7usize;
    let mut file = 0usize;
    for c in parts[0].chars() {
        if c == '/' {
            rank = rank.saturating_sub(1);
            file = 0;
        } else if let Some(run) = c.to_digit(10) {
            file += run as usize;
        } else if let Some(piece) = fen_to_piece(c) {
            pos.squares[square_at(file, rank)] = piece;
            file += 1;
        }
    }

    // Parse active color
    pos.side_to_move = if parts[1] == "w" { Color::White } else { Color::Black };

    // Parse castling rights
    if parts[2] != "-" {
        for c in parts[2].chars() {
            let flag = match c {
                'K' => CASTLE_WK,
                'Q' => CASTLE_WQ,
                'k' => CASTLE_BK,
                'q' => CASTLE_BQ,
                _ => return Err(FenError::Castling(parts[2].to_string())),
            };
            if pos.castling_rights & flag != 0 {
                return Err(FenError::Castling(parts[2].to_string()));
            }
            pos.castling_rights |= flag;
        }
    }

    // Parse en passant square
    if parts[3] != "-" {
        match parse_square(parts[3]) {
            // The target sits behind a pawn the opponent just pushed
            Some(sq) if rank_of(sq) == pos.side_to_move.opposite().ep_rank() => pos.en_passant = Some(sq),
            _ => return Err(FenError::EnPassant(parts[3].to_string())),
        }
    }

    // Parse move counters; both are optional
    if let Some(text) = parts.get(4) {
        pos.halfmove_clock = text
            .parse()
            .map_err(|_| FenError::Counter(text.to_string()))?;
    }
    if let Some(text) = parts.get(5) {
        let n: u32 = text
            .parse()
            .map_err(|_| FenError::Counter(text.to_string()))?;
        pos.fullmove_number = n.max(1);
    }

    Ok(pos)
}

/// Generate FEN string, always six fields
pub fn to_fen(pos: &Position) -> String {
    let mut fen = String::new();

    // Piece placement
    for rank in (0..8).rev() {
        let mut empty_count = 0;
        for file in 0..8 {
            let piece = pos.squares[square_at(file, rank)];
            if piece == EMPTY {
                empty_count += 1;
            } else {
                if empty_count > 0 {
                    fen.push_str(&empty_count.to_string());
                    empty_count = 0;
                }
                if let Some(c) = piece_to_fen(piece) {
                    fen.push(c);
                }
            }
        }
        if empty_count > 0 {
            fen.push_str(&empty_count.to_string());
        }
        if rank > 0 {
            fen.push('/');
        }
    }

    fen.push(' ');
    fen.push(pos.side_to_move.fen_char());

    fen.push(' ');
    if pos.castling_rights == 0 {
        fen.push('-');
    } else {
        if pos.castling_rights & CASTLE_WK != 0 { fen.push('K'); }
        if pos.castling_rights & CASTLE_WQ != 0 { fen.push('Q'); }
        if pos.castling_rights & CASTLE_BK != 0 { fen.push('k'); }
        if pos.castling_rights & CASTLE_BQ != 0 { fen.push('q'); }
    }

    fen.push(' ');
    match pos.en_passant {
        Some(sq) => fen.push_str(&square_name(sq)),
        None => fen.push('-'),
    }

    fen.push_str(&format!(" {} {}", pos.halfmove_clock, pos.fullmove_number));

    fen
}
