use chess_uci_bridge::game::Game;
use chess_uci_bridge::move_generator::MoveGenerator;
use chess_uci_bridge::notation::{parse_move, to_san};
use chess_uci_bridge::pgn::{PgnHeaders, PgnOptions};
use chess_uci_bridge::position::Position;
use chess_uci_bridge::rules::{self, DrawReason, GameStatus};
use chess_uci_bridge::types::Color;

const KIWIPETE: &str = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";

const CORPUS: &[&str] = &[
    "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
    "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1",
    KIWIPETE,
    "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
    "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
    "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
    "8/8/8/8/8/5k2/5p2/5K2 w - - 0 1",
    "4k3/8/8/8/8/8/8/4K3 b - - 99 120",
];

#[test]
fn fen_round_trip_corpus() {
    for fen in CORPUS {
        let pos = Position::from_fen(fen).unwrap();
        assert_eq!(pos.to_fen(), *fen);
    }
}

#[test]
fn start_position_has_twenty_moves() {
    let moves = MoveGenerator::new().generate_legal_moves(&Position::new());
    assert_eq!(moves.len(), 20);
}

#[test]
fn no_legal_move_leaves_the_king_attacked() {
    let gen = MoveGenerator::new();
    for fen in CORPUS {
        let pos = Position::from_fen(fen).unwrap();
        let mover = pos.side_to_move;
        for mv in gen.generate_legal_moves(&pos) {
            let mut child = pos.clone();
            child.play_unchecked(&mv);
            let king = child.find_king(mover).unwrap();
            assert!(
                !gen.is_square_attacked(&child, king, mover.opposite()),
                "{} leaves the king attacked in {}",
                mv.to_uci(),
                fen
            );
        }
    }
}

#[test]
fn perft_reference_counts() {
    let gen = MoveGenerator::new();
    assert_eq!(gen.perft(&Position::new(), 3), 8_902);
    assert_eq!(gen.perft(&Position::from_fen(KIWIPETE).unwrap(), 2), 2_039);
    let split = gen.divide(&Position::from_fen(KIWIPETE).unwrap(), 2);
    assert_eq!(split.len(), 48);
    assert_eq!(split.iter().map(|(_, n)| n).sum::<u64>(), 2_039);
}

#[test]
fn pawn_stalemate() {
    let pos = Position::from_fen("8/8/8/8/8/5k2/5p2/5K2 w - - 0 1").unwrap();
    assert_eq!(rules::evaluate(&pos, &[]), GameStatus::Draw(DrawReason::Stalemate));
}

#[test]
fn eight_ply_cycle_is_threefold() {
    let mut game = Game::new();
    for _ in 0..2 {
        for mv in ["Nf3", "Nf6", "Ng1", "Ng8"] {
            game.make_move(mv).unwrap();
        }
    }
    assert_eq!(game.status(), GameStatus::Draw(DrawReason::ThreefoldRepetition));
    assert_eq!(game.status().result_tag(), "1/2-1/2");
}

#[test]
fn lost_castling_rights_make_a_different_position() {
    let mut game = Game::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
    let cycle = ["Ke2", "Ke7", "Ke1", "Ke8"];

    for _ in 0..2 {
        for mv in cycle {
            game.make_move(mv).unwrap();
        }
    }
    // Same placement three times, but the first had castling rights
    assert_eq!(game.status(), GameStatus::InProgress);

    for mv in cycle {
        game.make_move(mv).unwrap();
    }
    assert_eq!(game.status(), GameStatus::Draw(DrawReason::ThreefoldRepetition));
}

#[test]
fn undo_redo_reproduces_the_hash_sequence() {
    let mut game = Game::new();
    let line = ["e4", "c5", "Nf3", "d6", "d4", "cxd4", "Nxd4", "Nf6", "Nc3", "a6"];
    let mut forward = vec![game.tree().current().hash];
    for mv in line {
        game.make_move(mv).unwrap();
        forward.push(game.tree().current().hash);
    }

    let mut backward = vec![game.tree().current().hash];
    while game.undo() {
        backward.push(game.tree().current().hash);
    }
    backward.reverse();
    assert_eq!(backward, forward);

    let mut replay = vec![game.tree().current().hash];
    while game.redo() {
        replay.push(game.tree().current().hash);
    }
    assert_eq!(replay, forward);
    assert_eq!(game.position().side_to_move, Color::White);
}

#[test]
fn variations_survive_in_pgn() {
    let mut game = Game::new();
    game.make_move("e4").unwrap();
    game.make_move("e5").unwrap();
    game.undo();
    game.make_move("c5").unwrap();
    game.undo();
    assert!(game.go_to_variation(1));
    game.make_move("Nf3").unwrap();

    let pgn = game.pgn(&PgnHeaders::default(), PgnOptions::default());
    assert!(pgn.contains("1. e4 e5 (1... c5 2. Nf3) *"), "{}", pgn);
}

#[test]
fn san_round_trip_over_kiwipete() {
    let pos = Position::from_fen(KIWIPETE).unwrap();
    for mv in MoveGenerator::new().generate_legal_moves(&pos) {
        let san = to_san(&pos, &mv);
        assert_eq!(parse_move(&pos, &san).unwrap(), mv, "{}", san);
    }
}
