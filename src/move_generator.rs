//! Move Generator Module
//!
//! Generates legal chess moves, including all special moves (castling, en
//! passant, pawn promotion). Candidates are produced per piece and then
//! filtered by playing each one on a copy of the position and checking
//! whether the mover's king is left attacked.

use crate::moves::Move;
use crate::position::Position;
use crate::types::*;

/// Direction steps as (file delta, rank delta)
const ROOK_DIRECTIONS: [(i32, i32); 4] = [(0, 1), (0, -1), (-1, 0), (1, 0)];
const BISHOP_DIRECTIONS: [(i32, i32); 4] = [(-1, 1), (1, 1), (1, -1), (-1, -1)];
const QUEEN_DIRECTIONS: [(i32, i32); 8] = [
    (0, 1), (0, -1), (-1, 0), (1, 0), (-1, 1), (1, 1), (1, -1), (-1, -1),
];
const KING_DIRECTIONS: [(i32, i32); 8] = QUEEN_DIRECTIONS;
const KNIGHT_OFFSETS: [(i32, i32); 8] = [
    (1, 2), (-1, 2), (2, 1), (-2, 1), (2, -1), (-2, -1), (1, -2), (-1, -2),
];

/// Move generator for chess positions
#[derive(Clone, Copy, Debug, Default)]
pub struct MoveGenerator;

impl MoveGenerator {
    pub fn new() -> Self {
        MoveGenerator
    }

    /// Generate all legal moves for the current position
    pub fn generate_legal_moves(&self, pos: &Position) -> Vec<Move> {
        let pseudo_legal = self.generate_pseudo_legal_moves(pos);
        let mut legal_moves = Vec::with_capacity(pseudo_legal.len());

        for mv in pseudo_legal {
            if self.is_legal(pos, &mv) {
                legal_moves.push(mv);
            }
        }

        legal_moves
    }

    /// Generate all pseudo-legal moves (may leave king in check)
    pub fn generate_pseudo_legal_moves(&self, pos: &Position) -> Vec<Move> {
        let mut moves = Vec::with_capacity(64);
        let color = pos.side_to_move.bits();

        for sq in 0..64 {
            let piece = pos.squares[sq];
            if piece == EMPTY || get_piece_color(piece) != color {
                continue;
            }

            match get_piece_type(piece) {
                PAWN => self.generate_pawn_moves(pos, sq, &mut moves),
                KNIGHT => self.generate_step_moves(pos, sq, &KNIGHT_OFFSETS, &mut moves),
                BISHOP => self.generate_sliding_moves(pos, sq, &BISHOP_DIRECTIONS, &mut moves),
                ROOK => self.generate_sliding_moves(pos, sq, &ROOK_DIRECTIONS, &mut moves),
                QUEEN => self.generate_sliding_moves(pos, sq, &QUEEN_DIRECTIONS, &mut moves),
                KING => {
                    self.generate_step_moves(pos, sq, &KING_DIRECTIONS, &mut moves);
                    self.generate_castling_moves(pos, sq, &mut moves);
                }
                _ => {}
            }
        }

        moves
    }

    fn generate_pawn_moves(&self, pos: &Position, sq: usize, moves: &mut Vec<Move>) {
        let piece = pos.squares[sq];
        let Some(color) = color_of(piece) else {
            return;
        };
        let forward: i32 = if color == Color::White { 1 } else { -1 };
        let start_rank = if color == Color::White { 1 } else { 6 };
        let promo_rank = color.promotion_rank();

        // Pushes
        if let Some(to) = offset_square(sq, 0, forward) {
            if pos.is_empty(to) {
                if rank_of(to) == promo_rank {
                    push_promotions(moves, sq, to, piece, None, color);
                } else {
                    moves.push(Move::normal(sq, to, piece, None));

                    if rank_of(sq) == start_rank {
                        if let Some(to2) = offset_square(sq, 0, 2 * forward) {
                            if pos.is_empty(to2) {
                                moves.push(Move::normal(sq, to2, piece, None));
                            }
                        }
                    }
                }
            }
        }

        // Captures
        for df in [-1, 1] {
            let Some(to) = offset_square(sq, df, forward) else {
                continue;
            };
            let target = pos.squares[to];

            if target != EMPTY && color_of(target) != Some(color) {
                if rank_of(to) == promo_rank {
                    push_promotions(moves, sq, to, piece, Some(target), color);
                } else {
                    moves.push(Move::normal(sq, to, piece, Some(target)));
                }
            }

            if pos.en_passant == Some(to) && target == EMPTY {
                let victim_sq = square_at(file_of(to), rank_of(sq));
                let victim = make_piece(color.opposite(), PAWN);
                if pos.squares[victim_sq] == victim {
                    moves.push(Move::en_passant(sq, to, piece, victim));
                }
            }
        }
    }

    /// Knights and the king's ordinary moves: one step per offset
    fn generate_step_moves(&self, pos: &Position, sq: usize, offsets: &[(i32, i32)], moves: &mut Vec<Move>) {
        let piece = pos.squares[sq];
        let color = get_piece_color(piece);

        for &(df, dr) in offsets {
            let Some(to) = offset_square(sq, df, dr) else {
                continue;
            };
            let target = pos.squares[to];
            if target == EMPTY {
                moves.push(Move::normal(sq, to, piece, None));
            } else if get_piece_color(target) != color {
                moves.push(Move::normal(sq, to, piece, Some(target)));
            }
        }
    }

    /// Generate moves for sliding pieces (bishop, rook, queen)
    fn generate_sliding_moves(&self, pos: &Position, sq: usize, directions: &[(i32, i32)], moves: &mut Vec<Move>) {
        let piece = pos.squares[sq];
        let color = get_piece_color(piece);

        for &(df, dr) in directions {
            let mut current = sq;
            while let Some(next) = offset_square(current, df, dr) {
                let target = pos.squares[next];

                if target == EMPTY {
                    moves.push(Move::normal(sq, next, piece, None));
                } else {
                    if get_piece_color(target) != color {
                        moves.push(Move::normal(sq, next, piece, Some(target)));
                    }
                    break;
                }

                current = next;
            }
        }
    }

    /// Castling for either wing.
    ///
    /// The rook is found by scanning outward from the king, so non-standard
    /// starting files work. Every square the king or rook crosses must be empty
    /// (apart from those two pieces) and the king may not start in, pass
    /// through or land on an attacked square.
    fn generate_castling_moves(&self, pos: &Position, king_sq: usize, moves: &mut Vec<Move>) {
        let color = pos.side_to_move;
        let rank = color.back_rank();
        if rank_of(king_sq) != rank {
            return;
        }
        let enemy = color.opposite();
        let (ks_flag, qs_flag) = color.castle_flags();

        for (flag, kingside) in [(ks_flag, true), (qs_flag, false)] {
            if !pos.has_castling_right(flag) {
                continue;
            }
            let Some(rook_from) = pos.castling_rook(color, kingside) else {
                continue;
            };

            let king_to = square_at(if kingside { 6 } else { 2 }, rank);
            let rook_to = square_at(if kingside { 5 } else { 3 }, rank);

            let files = [file_of(king_sq), file_of(king_to), file_of(rook_from), file_of(rook_to)];
            let lo = files.iter().copied().min().unwrap_or(0);
            let hi = files.iter().copied().max().unwrap_or(7);
            let blocked = (lo..=hi)
                .map(|f| square_at(f, rank))
                .any(|sq| sq != king_sq && sq != rook_from && !pos.is_empty(sq));
            if blocked {
                continue;
            }

            let (k_lo, k_hi) = if file_of(king_sq) <= file_of(king_to) {
                (file_of(king_sq), file_of(king_to))
            } else {
                (file_of(king_to), file_of(king_sq))
            };
            let king_path_attacked = (k_lo..=k_hi)
                .any(|f| self.is_square_attacked(pos, square_at(f, rank), enemy));
            if king_path_attacked {
                continue;
            }

            let to = if king_to == king_sq { rook_from } else { king_to };
            moves.push(Move::castle(king_sq, to, pos.squares[king_sq], rook_from, rook_to));
        }
    }

    /// Check if a square is attacked by the specified color
    pub fn is_square_attacked(&self, pos: &Position, sq: usize, by: Color) -> bool {
        // Pawns attack diagonally forward, so look diagonally behind the square.
        let pawn = make_piece(by, PAWN);
        let behind: i32 = if by == Color::White { -1 } else { 1 };
        for df in [-1, 1] {
            if let Some(from) = offset_square(sq, df, behind) {
                if pos.squares[from] == pawn {
                    return true;
                }
            }
        }

        let knight = make_piece(by, KNIGHT);
        for &(df, dr) in &KNIGHT_OFFSETS {
            if let Some(from) = offset_square(sq, df, dr) {
                if pos.squares[from] == knight {
                    return true;
                }
            }
        }

        let king = make_piece(by, KING);
        for &(df, dr) in &KING_DIRECTIONS {
            if let Some(from) = offset_square(sq, df, dr) {
                if pos.squares[from] == king {
                    return true;
                }
            }
        }

        for &dir in &ROOK_DIRECTIONS {
            if self.check_sliding_attack(pos, sq, dir, by, &[ROOK, QUEEN]) {
                return true;
            }
        }

        for &dir in &BISHOP_DIRECTIONS {
            if self.check_sliding_attack(pos, sq, dir, by, &[BISHOP, QUEEN]) {
                return true;
            }
        }

        false
    }

    /// Walk a ray from `sq` and report whether the first piece met is one of
    /// `piece_types` belonging to `by`.
    fn check_sliding_attack(&self, pos: &Position, sq: usize, (df, dr): (i32, i32), by: Color, piece_types: &[u8]) -> bool {
        let mut current = sq;

        while let Some(next) = offset_square(current, df, dr) {
            let piece = pos.squares[next];
            if piece != EMPTY {
                return color_of(piece) == Some(by) && piece_types.contains(&get_piece_type(piece));
            }
            current = next;
        }

        false
    }

    /// Check if a move is legal (doesn't leave own king in check)
    pub fn is_legal(&self, pos: &Position, mv: &Move) -> bool {
        let mover = pos.side_to_move;
        let mut scratch = pos.clone();
        scratch.play_unchecked(mv);

        match scratch.find_king(mover) {
            Some(sq) => !self.is_square_attacked(&scratch, sq, mover.opposite()),
            None => false,
        }
    }

    /// Check if the current side's king is in check
    pub fn is_in_check(&self, pos: &Position) -> bool {
        match pos.find_king(pos.side_to_move) {
            Some(king_sq) => self.is_square_attacked(pos, king_sq, pos.side_to_move.opposite()),
            None => false,
        }
    }

    pub fn is_checkmate(&self, pos: &Position) -> bool {
        self.is_in_check(pos) && self.generate_legal_moves(pos).is_empty()
    }

    pub fn is_stalemate(&self, pos: &Position) -> bool {
        !self.is_in_check(pos) && self.generate_legal_moves(pos).is_empty()
    }

    /// Count leaf nodes of the legal move tree to the given depth
    pub fn perft(&self, pos: &Position, depth: usize) -> u64 {
        if depth == 0 {
            return 1;
        }

        let moves = self.generate_legal_moves(pos);

        if depth == 1 {
            return moves.len() as u64;
        }

        let mut nodes = 0u64;
        for mv in moves {
            let mut child = pos.clone();
            child.play_unchecked(&mv);
            nodes += self.perft(&child, depth - 1);
        }

        nodes
    }

    /// Perft split by root move, in generation order
    pub fn divide(&self, pos: &Position, depth: usize) -> Vec<(Move, u64)> {
        self.generate_legal_moves(pos)
            .into_iter()
            .map(|mv| {
                let mut child = pos.clone();
                child.play_unchecked(&mv);
                let count = if depth <= 1 { 1 } else { self.perft(&child, depth - 1) };
                (mv, count)
            })
            .collect()
    }
}

fn push_promotions(moves: &mut Vec<Move>, from: usize, to: usize, piece: u8, captured: Option<u8>, color: Color) {
    for kind in PROMOTION_KINDS {
        moves.push(Move::promotion(from, to, piece, captured, make_piece(color, kind)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moves::MoveKind;

    const KIWIPETE: &str = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";

    fn legal(fen: &str) -> Vec<Move> {
        MoveGenerator::new().generate_legal_moves(&Position::from_fen(fen).unwrap())
    }

    #[test]
    fn start_position_has_twenty_moves() {
        let moves = MoveGenerator::new().generate_legal_moves(&Position::new());
        assert_eq!(moves.len(), 20);
    }

    #[test]
    fn perft_start_position() {
        let gen = MoveGenerator::new();
        let pos = Position::new();
        assert_eq!(gen.perft(&pos, 1), 20);
        assert_eq!(gen.perft(&pos, 2), 400);
        assert_eq!(gen.perft(&pos, 3), 8_902);
    }

    #[test]
    fn perft_kiwipete() {
        let gen = MoveGenerator::new();
        let pos = Position::from_fen(KIWIPETE).unwrap();
        assert_eq!(gen.perft(&pos, 1), 48);
        assert_eq!(gen.perft(&pos, 2), 2_039);
    }

    #[test]
    fn perft_endgame_with_pins_and_en_passant() {
        let gen = MoveGenerator::new();
        let pos = Position::from_fen("8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1").unwrap();
        assert_eq!(gen.perft(&pos, 1), 14);
        assert_eq!(gen.perft(&pos, 2), 191);
        assert_eq!(gen.perft(&pos, 3), 2_812);
    }

    #[test]
    fn divide_sums_to_perft() {
        let gen = MoveGenerator::new();
        let pos = Position::from_fen(KIWIPETE).unwrap();
        let total: u64 = gen.divide(&pos, 2).iter().map(|(_, n)| n).sum();
        assert_eq!(total, gen.perft(&pos, 2));
    }

    #[test]
    fn stalemate_is_not_checkmate() {
        let gen = MoveGenerator::new();
        let pos = Position::from_fen("8/8/8/8/8/5k2/5p2/5K2 w - - 0 1").unwrap();
        assert!(gen.generate_legal_moves(&pos).is_empty());
        assert!(!gen.is_in_check(&pos));
        assert!(gen.is_stalemate(&pos));
        assert!(!gen.is_checkmate(&pos));
    }

    #[test]
    fn no_legal_move_leaves_king_attacked() {
        let gen = MoveGenerator::new();
        let fens = [
            KIWIPETE,
            "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
            "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
            "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
        ];
        for fen in fens {
            let pos = Position::from_fen(fen).unwrap();
            for mv in gen.generate_legal_moves(&pos) {
                let mut after = pos.clone();
                after.play_unchecked(&mv);
                let king = after.find_king(pos.side_to_move).unwrap();
                assert!(
                    !gen.is_square_attacked(&after, king, pos.side_to_move.opposite()),
                    "{} leaves the king attacked in {}",
                    mv,
                    fen
                );
            }
        }
    }

    #[test]
    fn castling_through_attack_is_refused() {
        // Black bishop on b5 covers f1.
        let moves = legal("4k3/8/8/1b6/8/8/8/4K2R w K - 0 1");
        assert!(!moves.iter().any(|m| m.is_castle()));

        let moves = legal("4k3/8/8/8/8/8/8/4K2R w K - 0 1");
        let castle = moves.iter().find(|m| m.is_castle()).unwrap();
        assert_eq!(castle.to_uci(), "e1g1");
        assert_eq!(castle.kind, MoveKind::Castle { rook_from: 7, rook_to: 5 });
    }

    #[test]
    fn queenside_needs_b_file_empty() {
        let moves = legal("4k3/8/8/8/8/8/8/RN2K3 w Q - 0 1");
        assert!(!moves.iter().any(|m| m.is_castle()));
    }

    #[test]
    fn castling_with_non_standard_rook_file() {
        // King on f1, rook on g1: the rook is found by scanning outward.
        let moves = legal("4k3/8/8/8/8/8/8/5KR1 w K - 0 1");
        let castle = moves.iter().find(|m| m.is_castle()).unwrap();
        assert_eq!(castle.from, 5);
        assert_eq!(castle.king_destination(), 6);
        assert_eq!(castle.kind, MoveKind::Castle { rook_from: 6, rook_to: 5 });
    }

    #[test]
    fn promotion_branches_four_ways() {
        let moves = legal("8/P6k/8/8/8/8/8/K7 w - - 0 1");
        let promos: Vec<_> = moves.iter().filter(|m| m.promotion_piece().is_some()).collect();
        assert_eq!(promos.len(), 4);
        assert!(promos.iter().all(|m| m.to_uci().starts_with("a7a8")));
    }

    #[test]
    fn en_passant_is_generated() {
        let moves = legal("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 2");
        let ep = moves.iter().find(|m| m.is_en_passant()).unwrap();
        assert_eq!(ep.to_uci(), "e5d6");
        assert_eq!(ep.captured, Some(BLACK_PAWN));
    }

    #[test]
    fn pinned_piece_cannot_leave_the_line() {
        // Knight on e2 pinned by the rook on e8.
        let moves = legal("4r1k1/8/8/8/8/8/4N3/4K3 w - - 0 1");
        assert!(!moves.iter().any(|m| m.from == parse_square("e2").unwrap()));
    }
}
