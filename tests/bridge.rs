use chess_uci_bridge::config::BridgeConfig;
use chess_uci_bridge::engine::{AnalysisRequest, EngineBridge, RequestStatus, Score, SearchLimit, Strength, Terminal};
use chess_uci_bridge::error::EngineError;
use chess_uci_bridge::game::Game;
use chess_uci_bridge::move_generator::MoveGenerator;
use chess_uci_bridge::notation::parse_move;
use chess_uci_bridge::position::Position;
use chess_uci_bridge::types::Color;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;

/// White mates with Ra8
const WHITE_MATES: &str = "6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1";
/// Black mates with Ra1
const BLACK_MATES: &str = "r5k1/8/8/8/8/8/5PPP/6K1 b - - 0 1";
const FOOLS_MATE: &str = "rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3";
const STALEMATE: &str = "8/8/8/8/8/5k2/5p2/5K2 w - - 0 1";

fn stub_config(args: &[String]) -> BridgeConfig {
    BridgeConfig {
        engine_path: env!("CARGO_BIN_EXE_uci_stub").to_string(),
        engine_args: args.to_vec(),
        handshake_timeout_ms: 5_000,
        ready_timeout_ms: 5_000,
        depth_timeout_ms: 5_000,
        movetime_grace_ms: 2_000,
        stop_grace_ms: 200,
        shutdown_grace_ms: 500,
        threads: 1,
        hash_mb: 16,
        ..BridgeConfig::default()
    }
}

fn temp_path(name: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("uci_stub_{}_{}", name, std::process::id()));
    let _ = std::fs::remove_file(&path);
    path
}

fn arg(path: &PathBuf) -> String {
    path.display().to_string()
}

fn is_mate_after(fen: &str, uci: &str) -> bool {
    let mut pos = Position::from_fen(fen).unwrap();
    let mv = parse_move(&pos, uci).unwrap();
    pos.play_unchecked(&mv);
    MoveGenerator::new().is_checkmate(&pos)
}

#[test]
fn handshake_collects_identity_and_options() {
    let bridge = EngineBridge::launch(stub_config(&[])).unwrap();
    assert_eq!(bridge.engine_name(), Some("uci_stub"));
    assert_eq!(bridge.engine_author(), Some("chess_uci_bridge"));
    let elo = bridge.options().get("uci_elo").unwrap();
    assert_eq!((elo.min, elo.max), (Some(1350), Some(2850)));
    assert!(bridge.options().get("Skill Level").is_some());
}

#[test]
fn mate_in_one_for_white() {
    let mut bridge = EngineBridge::new(stub_config(&[]));
    let result = bridge.analyze(&AnalysisRequest::depth(WHITE_MATES, 3));

    assert_eq!(result.status, RequestStatus::Completed, "{:?}", result.error);
    let best = result.best_move.as_deref().unwrap();
    assert!(is_mate_after(WHITE_MATES, best), "{}", best);
    assert_eq!(result.score, Some(Score::Mate(1)));
    assert_eq!(result.depth, Some(3));
    assert_eq!(result.pv, vec![best.to_string()]);
    assert!(result.white_win_probability > 0.95);
    assert!(result.side_to_move_probability > 0.95);
    assert!(result.lines.iter().any(|l| l.starts_with("bestmove")));
}

#[test]
fn mate_in_one_for_black_is_mirrored() {
    let mut bridge = EngineBridge::new(stub_config(&[]));
    let result = bridge.analyze(&AnalysisRequest::movetime(BLACK_MATES, 50));

    assert!(result.is_ok(), "{:?}", result.error);
    assert!(is_mate_after(BLACK_MATES, result.best_move.as_deref().unwrap()));
    assert_eq!(result.side_to_move, Color::Black);
    assert_eq!(result.score, Some(Score::Mate(-1)));
    assert!(result.white_win_probability < 0.05);
    assert!(result.side_to_move_probability > 0.95);
}

#[test]
fn terminal_positions() {
    let mut bridge = EngineBridge::new(stub_config(&[]));

    let mated = bridge.analyze(&AnalysisRequest::depth(FOOLS_MATE, 5));
    assert!(mated.is_ok(), "{:?}", mated.error);
    assert_eq!(mated.best_move, None);
    assert_eq!(mated.terminal, Some(Terminal::Checkmate));
    assert_eq!(mated.score, Some(Score::Checkmated(Color::White)));
    assert!((mated.white_win_probability - 0.001).abs() < 1e-9);

    let drawn = bridge.analyze(&AnalysisRequest::depth(STALEMATE, 5));
    assert!(drawn.is_ok(), "{:?}", drawn.error);
    assert_eq!(drawn.terminal, Some(Terminal::Stalemate));
    assert!((drawn.white_win_probability - 0.5).abs() < 1e-9);
}

#[test]
fn crash_is_reported_then_recovered() {
    let marker = temp_path("crash_marker");
    let mut bridge = EngineBridge::new(stub_config(&["--crash-once".to_string(), arg(&marker)]));

    let crashed = bridge.analyze(&AnalysisRequest::depth(WHITE_MATES, 2));
    assert_eq!(crashed.status, RequestStatus::Crashed);
    assert!(crashed.error.as_ref().map_or(false, |e| e.is_crash()), "{:?}", crashed.error);
    assert!(marker.exists());

    // Same bridge, restarted behind the scenes
    assert!(bridge.sticky_error().is_none());
    let result = bridge.analyze(&AnalysisRequest::depth(WHITE_MATES, 2));
    assert!(result.is_ok(), "{:?}", result.error);
    assert!(is_mate_after(WHITE_MATES, result.best_move.as_deref().unwrap()));
    assert!(result.generation > crashed.generation);

    let _ = std::fs::remove_file(&marker);
}

#[test]
fn crash_stays_sticky_without_auto_restart() {
    let marker = temp_path("sticky_marker");
    let mut config = stub_config(&["--crash-once".to_string(), arg(&marker)]);
    config.auto_restart = false;
    let mut bridge = EngineBridge::new(config);

    assert_eq!(bridge.analyze(&AnalysisRequest::depth(WHITE_MATES, 2)).status, RequestStatus::Crashed);
    assert!(bridge.sticky_error().is_some());
    let refused = bridge.analyze(&AnalysisRequest::depth(WHITE_MATES, 2));
    assert_eq!(refused.status, RequestStatus::Crashed);
    assert!(refused.lines.is_empty());

    bridge.restart().unwrap();
    assert!(bridge.analyze(&AnalysisRequest::depth(WHITE_MATES, 2)).is_ok());

    let _ = std::fs::remove_file(&marker);
}

#[test]
fn silent_engine_times_out() {
    let mut config = stub_config(&["--hang".to_string()]);
    config.depth_timeout_ms = 300;
    config.stop_grace_ms = 100;
    let mut bridge = EngineBridge::new(config);

    let result = bridge.analyze(&AnalysisRequest::depth(WHITE_MATES, 20));
    assert_eq!(result.status, RequestStatus::TimedOut);
    assert_eq!(result.error, Some(EngineError::Timeout { budget_ms: 300 }));
    assert!(result.best_move.is_none());
    assert!(bridge.is_running());
}

#[test]
fn engine_that_keeps_ignoring_stop_is_replaced() {
    let log = temp_path("hang_log");
    let mut config = stub_config(&["--hang".to_string(), "--log".to_string(), arg(&log)]);
    config.depth_timeout_ms = 300;
    config.stop_grace_ms = 100;
    let mut bridge = EngineBridge::new(config);

    // The first stopped search stays outstanding: the engine still answers isready
    let first = bridge.analyze(&AnalysisRequest::depth(WHITE_MATES, 20));
    assert_eq!(first.status, RequestStatus::TimedOut);
    assert!(bridge.is_running());

    // A second timeout on top of it gets a fresh process instead of another stale slot
    let second = bridge.analyze(&AnalysisRequest::depth(BLACK_MATES, 20));
    assert_eq!(second.status, RequestStatus::TimedOut);
    assert!(bridge.is_running());
    assert!(bridge.sticky_error().is_none());
    bridge.shutdown();

    let sent = std::fs::read_to_string(&log).unwrap();
    assert_eq!(sent.lines().filter(|l| *l == "uci").count(), 2, "{}", sent);
    assert_eq!(sent.lines().filter(|l| *l == "stop").count(), 1, "{}", sent);

    let _ = std::fs::remove_file(&log);
}

#[test]
fn output_written_just_before_exit_is_delivered() {
    let mut bridge = EngineBridge::new(stub_config(&["--exit-after-go".to_string()]));

    let result = bridge.analyze(&AnalysisRequest::depth(WHITE_MATES, 3));
    assert_eq!(result.status, RequestStatus::Completed, "{:?}", result.error);
    assert!(is_mate_after(WHITE_MATES, result.best_move.as_deref().unwrap()));
    assert_eq!(result.score, Some(Score::Mate(1)));
    assert_eq!(result.depth, Some(3));
}

#[test]
fn failed_restart_is_sticky_until_a_restart_succeeds() {
    let crash_marker = temp_path("restart_crash_marker");
    let refuse_marker = temp_path("restart_refuse_marker");
    let mut bridge = EngineBridge::new(stub_config(&[
        "--crash-once".to_string(),
        arg(&crash_marker),
        "--exit-if-exists".to_string(),
        arg(&refuse_marker),
    ]));

    // Every engine launched after the crash exits before the handshake
    let refuse = refuse_marker.clone();
    bridge.subscribe_analysis(move |result| {
        if result.status == RequestStatus::Crashed {
            let _ = std::fs::write(&refuse, b"refuse");
        }
    });

    let crashed = bridge.analyze(&AnalysisRequest::depth(WHITE_MATES, 2));
    assert_eq!(crashed.status, RequestStatus::Crashed);
    assert!(matches!(bridge.sticky_error(), Some(EngineError::RestartFailed(_))), "{:?}", bridge.sticky_error());
    assert!(!bridge.is_running());

    let refused = bridge.analyze(&AnalysisRequest::depth(WHITE_MATES, 2));
    assert_eq!(refused.status, RequestStatus::Crashed);
    assert!(matches!(refused.error, Some(EngineError::RestartFailed(_))));
    assert!(refused.lines.is_empty());

    // Still refusing: an explicit restart fails and the error stays
    assert!(matches!(bridge.restart(), Err(EngineError::RestartFailed(_))));
    assert!(bridge.sticky_error().is_some());

    std::fs::remove_file(&refuse_marker).unwrap();
    bridge.restart().unwrap();
    assert!(bridge.sticky_error().is_none());
    let result = bridge.analyze(&AnalysisRequest::depth(WHITE_MATES, 2));
    assert!(result.is_ok(), "{:?}", result.error);
    assert!(is_mate_after(WHITE_MATES, result.best_move.as_deref().unwrap()));

    let _ = std::fs::remove_file(&crash_marker);
}

#[test]
fn late_output_is_never_attributed_to_the_next_request() {
    let mut config = stub_config(&["--delay-ms".to_string(), "400".to_string()]);
    config.depth_timeout_ms = 150;
    config.stop_grace_ms = 50;
    let mut bridge = EngineBridge::new(config);

    let stale = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&stale);
    bridge.subscribe_lines(move |out| {
        if out.stale {
            sink.lock().push(out.line.clone());
        }
    });

    let first = bridge.analyze(&AnalysisRequest::depth(WHITE_MATES, 4));
    assert_eq!(first.status, RequestStatus::TimedOut);

    let second = bridge.analyze(&AnalysisRequest::movetime(BLACK_MATES, 50));
    assert!(second.is_ok(), "{:?}", second.error);
    let best = second.best_move.as_deref().unwrap();
    assert!(is_mate_after(BLACK_MATES, best), "{}", best);
    assert_eq!(second.score, Some(Score::Mate(-1)));

    let stale = stale.lock();
    assert!(stale.iter().any(|l| l.starts_with("bestmove")), "{:?}", *stale);
    assert!(!second.lines.iter().any(|l| stale.contains(l)));
}

#[test]
fn strength_and_settings_reach_the_engine() {
    let log = temp_path("command_log");
    let mut bridge = EngineBridge::new(stub_config(&["--log".to_string(), arg(&log)]));

    assert!(bridge.analyze(&AnalysisRequest::depth(WHITE_MATES, 1).with_strength(Strength::elo(1000))).is_ok());
    assert!(bridge.analyze(&AnalysisRequest::depth(WHITE_MATES, 1).with_strength(Strength::skill(5))).is_ok());
    assert!(bridge.analyze(&AnalysisRequest::depth(WHITE_MATES, 1).with_multipv(3)).is_ok());
    bridge.shutdown();

    let sent: Vec<String> = std::fs::read_to_string(&log)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect();
    let index = |cmd: &str| sent.iter().position(|l| l == cmd).unwrap_or_else(|| panic!("{} not sent: {:?}", cmd, sent));

    index("setoption name Threads value 1");
    index("setoption name Hash value 16");
    let limit_on = index("setoption name UCI_LimitStrength value true");
    // 1000 is below the advertised minimum
    let elo = index("setoption name UCI_Elo value 1350");
    let limit_off = index("setoption name UCI_LimitStrength value false");
    let skill = index("setoption name Skill Level value 5");
    index("setoption name MultiPV value 3");
    assert!(limit_on < elo && elo < limit_off && limit_off < skill);
    assert!(sent.iter().any(|l| l == "position fen 6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1"));
    assert_eq!(sent.iter().filter(|l| l.starts_with("go depth 1")).count(), 3);
    assert_eq!(sent.last().map(String::as_str), Some("quit"));

    let _ = std::fs::remove_file(&log);
}

#[test]
fn analysis_notifications() {
    let mut bridge = EngineBridge::new(stub_config(&[]));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let id = bridge.subscribe_analysis(move |result| sink.lock().push(result.status));

    bridge.analyze(&AnalysisRequest::depth("startpos", 2));
    bridge.analyze(&AnalysisRequest::depth("not a fen", 2));
    assert!(bridge.unsubscribe_analysis(id));
    bridge.analyze(&AnalysisRequest::depth("startpos", 2));

    assert_eq!(*seen.lock(), vec![RequestStatus::Completed, RequestStatus::Rejected]);
}

#[test]
fn game_analysis_is_cached_per_position() {
    let log = temp_path("game_log");
    let mut game = Game::with_engine(stub_config(&["--log".to_string(), arg(&log)]));
    for mv in ["f3", "e5", "g4"] {
        game.make_move(mv).unwrap();
    }

    let first = game.analyze(SearchLimit::Depth(2), Strength::full()).unwrap();
    assert_eq!(first.score, Score::Mate(-1));
    assert_eq!(first.best_move.as_deref(), Some("d8h4"));
    assert_eq!(game.tree().current().evaluation, Some(Score::Mate(-1)));

    // Leaving and re-entering the position hits the cache
    game.undo();
    game.redo();
    let again = game.analyze(SearchLimit::Depth(2), Strength::full()).unwrap();
    assert_eq!(again, first);
    assert_eq!(game.evaluation(), Some(first));

    if let Some(engine) = game.engine_mut() {
        engine.shutdown();
    }
    let sent = std::fs::read_to_string(&log).unwrap();
    assert_eq!(sent.lines().filter(|l| l.starts_with("go ")).count(), 1);

    let _ = std::fs::remove_file(&log);
}
