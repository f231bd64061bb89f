//! Zobrist hashing
//!
//! The key table is generated from a fixed seed the first time it is touched,
//! so hashes are stable across runs. Only structural state feeds the hash:
//! placement, castling rights, en passant file and side to move. The move
//! counters are left out so repetitions are detected regardless of them.

use crate::position::Position;
use crate::types::*;
use lazy_static::lazy_static;
use rand::prelude::*;

const ZOBRIST_SEED: u64 = 0x5EED_C0DE_2024_0001;

lazy_static! {
    static ref ZOBRIST: ZobristKeys = ZobristKeys::new();
}

/// Random keys, one per feature
pub struct ZobristKeys {
    /// [colour][kind - 1][square]
    piece_keys: [[[u64; 64]; 6]; 2],
    /// One per castling flag, in K, Q, k, q order
    castling_keys: [u64; 4],
    ep_file_keys: [u64; 8],
    black_to_move_key: u64,
}

impl ZobristKeys {
    fn new() -> Self {
        let mut rng = StdRng::seed_from_u64(ZOBRIST_SEED);

        let mut piece_keys = [[[0u64; 64]; 6]; 2];
        for color in piece_keys.iter_mut() {
            for kind in color.iter_mut() {
                for key in kind.iter_mut() {
                    *key = rng.gen();
                }
            }
        }

        let mut castling_keys = [0u64; 4];
        for key in castling_keys.iter_mut() {
            *key = rng.gen();
        }

        let mut ep_file_keys = [0u64; 8];
        for key in ep_file_keys.iter_mut() {
            *key = rng.gen();
        }

        let black_to_move_key = rng.gen();

        ZobristKeys {
            piece_keys,
            castling_keys,
            ep_file_keys,
            black_to_move_key,
        }
    }

    #[inline]
    fn piece(&self, piece: u8, sq: usize) -> u64 {
        let color = if is_white(piece) { 0 } else { 1 };
        let kind = get_piece_type(piece) as usize - 1;
        self.piece_keys[color][kind][sq]
    }
}

/// 64-bit structural hash of a position
pub fn hash_position(pos: &Position) -> u64 {
    let keys = &*ZOBRIST;
    let mut h = 0u64;

    for (sq, piece) in pos.pieces() {
        if (PAWN..=KING).contains(&get_piece_type(piece)) {
            h ^= keys.piece(piece, sq);
        }
    }

    for (i, flag) in [CASTLE_WK, CASTLE_WQ, CASTLE_BK, CASTLE_BQ].iter().enumerate() {
        if pos.castling_rights & flag != 0 {
            h ^= keys.castling_keys[i];
        }
    }

    if let Some(ep) = pos.en_passant {
        h ^= keys.ep_file_keys[file_of(ep)];
    }

    if pos.side_to_move == Color::Black {
        h ^= keys.black_to_move_key;
    }

    h
}

impl Position {
    /// Structural hash; see [`hash_position`]
    pub fn zobrist(&self) -> u64 {
        hash_position(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::move_generator::MoveGenerator;

    #[test]
    fn counters_do_not_change_the_hash() {
        let a = Position::from_fen("4k3/8/8/8/8/8/8/4K2R w K - 0 1").unwrap();
        let b = Position::from_fen("4k3/8/8/8/8/8/8/4K2R w K - 37 80").unwrap();
        assert_eq!(a.zobrist(), b.zobrist());
    }

    #[test]
    fn structural_fields_change_the_hash() {
        let base = Position::from_fen("4k3/8/8/8/8/8/8/4K2R w K - 0 1").unwrap();
        let no_rights = Position::from_fen("4k3/8/8/8/8/8/8/4K2R w - - 0 1").unwrap();
        let black = Position::from_fen("4k3/8/8/8/8/8/8/4K2R b K - 0 1").unwrap();
        assert_ne!(base.zobrist(), no_rights.zobrist());
        assert_ne!(base.zobrist(), black.zobrist());

        let ep = Position::from_fen("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 2").unwrap();
        let no_ep = Position::from_fen("4k3/8/8/3pP3/8/8/8/4K3 w - - 0 2").unwrap();
        assert_ne!(ep.zobrist(), no_ep.zobrist());
    }

    #[test]
    fn transpositions_hash_equal() {
        let gen = MoveGenerator::new();
        let play = |moves: &[&str]| {
            let mut pos = Position::new();
            for text in moves {
                let mv = gen
                    .generate_legal_moves(&pos)
                    .into_iter()
                    .find(|m| m.to_uci() == *text)
                    .unwrap();
                pos.play_unchecked(&mv);
            }
            pos
        };
        let a = play(&["g1f3", "g8f6", "b1c3"]);
        let b = play(&["b1c3", "g8f6", "g1f3"]);
        assert_eq!(a.zobrist(), b.zobrist());
    }

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(Position::new().zobrist(), Position::new().zobrist());
        assert_ne!(Position::new().zobrist(), 0);
    }
}
