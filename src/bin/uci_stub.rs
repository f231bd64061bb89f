//! uci_stub - scripted UCI responder
//!
//! Speaks enough UCI to exercise the bridge. Its only "search" is a one-ply
//! probe: a mating move is reported as `mate 1`, anything else as `cp 0` with
//! the first legal move. Misbehaviour is opt-in:
//!
//!     --crash-once <marker>      exit on `go` unless <marker> exists (creates it)
//!     --delay-ms <n>             sleep before answering `go`
//!     --exit-after-go            exit right after the first `bestmove`
//!     --exit-if-exists <marker>  exit at startup, before `uci`, while <marker> exists
//!     --hang                     never answer `go`
//!     --log <path>               append every received command to <path>

use chess_uci_bridge::engine::options::{UciOption, ELO, HASH, LIMIT_STRENGTH, MULTI_PV, SKILL_LEVEL, THREADS};
use chess_uci_bridge::move_generator::MoveGenerator;
use chess_uci_bridge::moves::Move;
use chess_uci_bridge::notation::parse_move;
use chess_uci_bridge::position::Position;
use clap::Parser;
use std::fs::OpenOptions;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

const ENGINE_NAME: &str = "uci_stub";
const ENGINE_AUTHOR: &str = "chess_uci_bridge";

#[derive(Parser, Debug)]
#[command(name = "uci_stub", about = "Scripted UCI responder for bridge tests")]
struct Args {
    #[arg(long)]
    crash_once: Option<PathBuf>,
    #[arg(long, default_value_t = 0)]
    delay_ms: u64,
    #[arg(long)]
    exit_after_go: bool,
    #[arg(long)]
    exit_if_exists: Option<PathBuf>,
    #[arg(long)]
    hang: bool,
    #[arg(long)]
    log: Option<PathBuf>,
}

struct Stub {
    args: Args,
    position: Position,
    generator: MoveGenerator,
    options: Vec<UciOption>,
    running: bool,
}

impl Stub {
    fn new(args: Args) -> Self {
        Stub {
            args,
            position: Position::new(),
            generator: MoveGenerator::new(),
            options: vec![
                UciOption::spin(THREADS, 1, 1, 512),
                UciOption::spin(HASH, 16, 1, 33554432),
                UciOption::check(LIMIT_STRENGTH, false),
                UciOption::spin(ELO, 1350, 1350, 2850),
                UciOption::spin(SKILL_LEVEL, 20, 0, 20),
                UciOption::spin(MULTI_PV, 1, 1, 500),
            ],
            running: true,
        }
    }

    fn run(&mut self) {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else {
                break;
            };
            let line = line.trim();
            if !line.is_empty() {
                self.log(line);
                self.process_command(line);
            }
            if !self.running {
                break;
            }
        }
    }

    fn log(&self, line: &str) {
        let Some(path) = &self.args.log else {
            return;
        };
        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
            let _ = writeln!(file, "{}", line);
        }
    }

    fn send(&self, message: &str) {
        println!("{}", message);
        io::stdout().flush().ok();
    }

    fn process_command(&mut self, line: &str) {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some((&command, args)) = parts.split_first() else {
            return;
        };

        match command {
            "uci" => self.cmd_uci(),
            "isready" => self.send("readyok"),
            "setoption" => self.cmd_setoption(args),
            "ucinewgame" => self.position = Position::new(),
            "position" => self.cmd_position(args),
            "go" => self.cmd_go(args),
            "quit" => self.running = false,
            // Searches finish before the next command is read
            "stop" => {}
            _ => self.send(&format!("info string unknown command: {}", command)),
        }
    }

    fn cmd_uci(&self) {
        self.send(&format!("id name {}", ENGINE_NAME));
        self.send(&format!("id author {}", ENGINE_AUTHOR));
        for option in &self.options {
            self.send(&option.to_uci_string());
        }
        self.send("uciok");
    }

    fn cmd_setoption(&mut self, args: &[&str]) {
        if args.first() != Some(&"name") {
            return;
        }
        let rest = &args[1..];
        let split = rest.iter().position(|&t| t == "value");
        let (name, value) = match split {
            Some(i) => (rest[..i].join(" "), rest[i + 1..].join(" ")),
            None => (rest.join(" "), String::new()),
        };
        if let Some(option) = self.options.iter_mut().find(|o| o.name.eq_ignore_ascii_case(&name)) {
            option.set_value(&value);
        }
    }

    fn cmd_position(&mut self, args: &[&str]) {
        let Some((&kind, rest)) = args.split_first() else {
            return;
        };
        let moves_at = rest.iter().position(|&t| t == "moves");
        let (setup, moves) = match moves_at {
            Some(i) => (&rest[..i], &rest[i + 1..]),
            None => (rest, &[][..]),
        };

        let position = match kind {
            "startpos" => Some(Position::new()),
            "fen" => Position::from_fen(&setup.join(" ")).ok(),
            _ => None,
        };
        let Some(mut position) = position else {
            self.send("info string invalid position");
            return;
        };
        for text in moves {
            match parse_move(&position, text) {
                Ok(mv) => position.play_unchecked(&mv),
                Err(_) => {
                    self.send(&format!("info string illegal move {}", text));
                    break;
                }
            }
        }
        self.position = position;
    }

    fn cmd_go(&mut self, args: &[&str]) {
        if let Some(marker) = &self.args.crash_once {
            if !marker.exists() {
                let _ = std::fs::write(marker, b"crashed");
                std::process::exit(3);
            }
        }
        if self.args.hang {
            return;
        }
        if self.args.delay_ms > 0 {
            thread::sleep(Duration::from_millis(self.args.delay_ms));
        }

        let mut depth = 1;
        let mut i = 0;
        while i < args.len() {
            match args[i] {
                "depth" if i + 1 < args.len() => {
                    depth = args[i + 1].parse::<u32>().unwrap_or(1).max(1);
                    i += 2;
                }
                "movetime" | "wtime" | "btime" | "winc" | "binc" | "movestogo" | "nodes" => i += 2,
                _ => i += 1,
            }
        }

        let moves = self.generator.generate_legal_moves(&self.position);
        if moves.is_empty() {
            let score = if self.generator.is_in_check(&self.position) {
                "mate 0"
            } else {
                "cp 0"
            };
            self.send(&format!("info depth 0 score {}", score));
            self.send("bestmove (none)");
            return;
        }

        let (best, score) = match self.mating_move(&moves) {
            Some(mv) => (mv, "mate 1"),
            None => (moves[0], "cp 0"),
        };
        self.send(&format!(
            "info depth {} seldepth {} multipv 1 score {} nodes {} nps 0 time 0 pv {}",
            depth,
            depth,
            score,
            moves.len(),
            best.to_uci()
        ));
        self.send(&format!("bestmove {}", best.to_uci()));
        if self.args.exit_after_go {
            std::process::exit(0);
        }
    }

    fn mating_move(&self, moves: &[Move]) -> Option<Move> {
        moves.iter().copied().find(|mv| {
            let mut child = self.position.clone();
            child.play_unchecked(mv);
            self.generator.is_checkmate(&child)
        })
    }
}

fn main() {
    let args = Args::parse();
    if args.exit_if_exists.as_ref().map_or(false, |marker| marker.exists()) {
        std::process::exit(4);
    }
    let mut stub = Stub::new(args);
    stub.run();
}
