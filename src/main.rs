//! chess_uci_bridge command line
//!
//! Usage:
//!     chess_uci_bridge analyse [FEN] --depth 12 --engine /usr/bin/stockfish
//!     chess_uci_bridge perft [FEN] --depth 4 --divide
//!     chess_uci_bridge legal [FEN]
//!     chess_uci_bridge pgn e4 e5 Nf3 --white Alice
//!
//! Logging goes to stderr and is controlled with `RUST_LOG`.

use chess_uci_bridge::config::BridgeConfig;
use chess_uci_bridge::engine::{AnalysisRequest, EngineBridge, Strength};
use chess_uci_bridge::fen::STARTING_FEN;
use chess_uci_bridge::game::Game;
use chess_uci_bridge::move_generator::MoveGenerator;
use chess_uci_bridge::notation::to_san;
use chess_uci_bridge::pgn::{PgnHeaders, PgnOptions};
use chess_uci_bridge::position::Position;
use chess_uci_bridge::rules;
use clap::{Parser, Subcommand};
use std::process::ExitCode;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "chess_uci_bridge", version, about = "Chess rules core and UCI engine client")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ask an external engine for the best move and evaluation
    Analyse {
        #[arg(default_value = STARTING_FEN)]
        fen: String,
        #[arg(short, long, conflicts_with = "movetime")]
        depth: Option<u32>,
        /// Search time in milliseconds
        #[arg(short, long)]
        movetime: Option<u64>,
        #[arg(long, conflicts_with = "skill")]
        elo: Option<u32>,
        #[arg(long)]
        skill: Option<u8>,
        #[arg(long, default_value_t = 1)]
        multipv: u32,
        /// Engine executable; overrides the config file and CHESS_ENGINE_PATH
        #[arg(short, long)]
        engine: Option<String>,
        /// JSON bridge configuration
        #[arg(short, long)]
        config: Option<String>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Count leaf nodes of the legal move tree
    Perft {
        #[arg(default_value = STARTING_FEN)]
        fen: String,
        #[arg(short, long, default_value_t = 3)]
        depth: usize,
        /// Break the count down by root move
        #[arg(long)]
        divide: bool,
    },
    /// List the legal moves and the game status
    Legal {
        #[arg(default_value = STARTING_FEN)]
        fen: String,
    },
    /// Play a list of moves from the start and print the game as PGN
    Pgn {
        moves: Vec<String>,
        #[arg(long)]
        fen: Option<String>,
        #[arg(long, default_value = "?")]
        white: String,
        #[arg(long, default_value = "?")]
        black: String,
        #[arg(long, default_value = "?")]
        event: String,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {}", message);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<(), String> {
    match command {
        Command::Analyse {
            fen,
            depth,
            movetime,
            elo,
            skill,
            multipv,
            engine,
            config,
            json,
        } => {
            let mut config = match config {
                Some(path) => BridgeConfig::from_json_file(&path).map_err(|e| e.to_string())?,
                None => BridgeConfig::default(),
            }
            .with_env_overrides();
            if let Some(path) = engine {
                config.engine_path = path;
            }

            let request = match movetime {
                Some(ms) => AnalysisRequest::movetime(fen, ms),
                None => AnalysisRequest::depth(fen, depth.unwrap_or(12)),
            };
            let strength = match (elo, skill) {
                (Some(elo), _) => Strength::elo(elo),
                (None, Some(level)) => Strength::skill(level),
                (None, None) => Strength::full(),
            };
            let request = request.with_strength(strength).with_multipv(multipv);

            let mut bridge = EngineBridge::new(config);
            let result = bridge.analyze(&request);
            bridge.shutdown();

            if json {
                let value = serde_json::json!({
                    "status": format!("{:?}", result.status),
                    "error": result.error.as_ref().map(|e| e.to_string()),
                    "best_move": result.best_move,
                    "ponder": result.ponder,
                    "score": result.score,
                    "depth": result.depth,
                    "pv": result.pv,
                    "terminal": result.terminal.map(|t| format!("{:?}", t)),
                    "white_win_probability": result.white_win_probability,
                    "side_to_move_probability": result.side_to_move_probability,
                    "elapsed_ms": result.elapsed.as_millis() as u64,
                });
                println!("{}", value);
            } else if let Some(err) = &result.error {
                return Err(err.to_string());
            } else {
                if let Some(name) = bridge.engine_name() {
                    println!("engine:   {}", name);
                }
                println!("bestmove: {}", result.best_move.as_deref().unwrap_or("(none)"));
                if let Some(score) = result.score {
                    println!("score:    {} (depth {})", score, result.depth.unwrap_or(0));
                }
                if let Some(terminal) = result.terminal {
                    println!("terminal: {:?}", terminal);
                }
                println!("white:    {:.3}", result.white_win_probability);
                if !result.pv.is_empty() {
                    println!("pv:       {}", result.pv.join(" "));
                }
            }
            if result.is_ok() {
                Ok(())
            } else {
                Err(format!("analysis {:?}", result.status))
            }
        }

        Command::Perft { fen, depth, divide } => {
            let position = Position::from_fen(&fen).map_err(|e| e.to_string())?;
            let generator = MoveGenerator::new();
            let start = Instant::now();
            let nodes = if divide {
                let split = generator.divide(&position, depth);
                for (mv, count) in &split {
                    println!("{}: {}", mv.to_uci(), count);
                }
                split.iter().map(|(_, count)| count).sum::<u64>()
            } else {
                generator.perft(&position, depth)
            };
            let elapsed = start.elapsed().as_secs_f64();
            let nps = if elapsed > 0.0 { (nodes as f64 / elapsed) as u64 } else { 0 };
            println!("Nodes: {} ({:.3}s, {} nps)", nodes, elapsed, nps);
            Ok(())
        }

        Command::Legal { fen } => {
            let position = Position::from_fen(&fen).map_err(|e| e.to_string())?;
            println!("{}", position.display());
            let moves = MoveGenerator::new().generate_legal_moves(&position);
            let listed: Vec<String> = moves
                .iter()
                .map(|mv| format!("{} ({})", to_san(&position, mv), mv.to_uci()))
                .collect();
            println!("Legal moves: {}", moves.len());
            if !listed.is_empty() {
                println!("{}", listed.join(" "));
            }
            println!("Status: {}", rules::evaluate(&position, &[]));
            Ok(())
        }

        Command::Pgn {
            moves,
            fen,
            white,
            black,
            event,
        } => {
            let mut game = match fen {
                Some(fen) => Game::from_fen(&fen).map_err(|e| e.to_string())?,
                None => Game::new(),
            };
            for (ply, text) in moves.iter().enumerate() {
                game.make_move(text)
                    .map_err(|e| format!("move {} ({}): {}", ply + 1, text, e))?;
            }
            let headers = PgnHeaders {
                event,
                white,
                black,
                ..PgnHeaders::default()
            };
            print!("{}", game.pgn(&headers, PgnOptions::default()));
            Ok(())
        }
    }
}
