//! UCI wire protocol
//!
//! Builders for the commands the bridge sends and a parser for the lines an
//! engine writes back. Parsing is forgiving: unknown tokens are skipped and
//! unknown lines come back as [`EngineLine::Other`].

use crate::engine::options::UciOption;
use crate::engine::score::Score;
use crate::fen::{STARTING_FEN, STARTPOS};
use std::time::Duration;

/// How long a search may run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchLimit {
    Depth(u32),
    MoveTime(Duration),
}

/// `position startpos` for the standard start, `position fen <fen>` otherwise
pub fn position_command(fen: &str) -> String {
    let fen = fen.trim();
    if fen == STARTPOS || fen == STARTING_FEN {
        "position startpos".to_string()
    } else {
        format!("position fen {}", fen)
    }
}

pub fn go_command(limit: SearchLimit) -> String {
    match limit {
        SearchLimit::Depth(depth) => format!("go depth {}", depth.max(1)),
        SearchLimit::MoveTime(time) => format!("go movetime {}", time.as_millis().max(1)),
    }
}

/// Bound qualifier on an `info ... score` field
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScoreBound {
    Exact,
    Lower,
    Upper,
}

/// One parsed `info` line. The score is as the engine sent it, relative to
/// the side to move.
#[derive(Clone, Debug, PartialEq)]
pub struct InfoLine {
    pub depth: Option<u32>,
    pub seldepth: Option<u32>,
    pub multipv: Option<u32>,
    pub score: Option<Score>,
    pub bound: ScoreBound,
    pub nodes: Option<u64>,
    pub nps: Option<u64>,
    pub time_ms: Option<u64>,
    pub pv: Vec<String>,
    pub string: Option<String>,
}

impl InfoLine {
    fn empty() -> Self {
        InfoLine {
            depth: None,
            seldepth: None,
            multipv: None,
            score: None,
            bound: ScoreBound::Exact,
            nodes: None,
            nps: None,
            time_ms: None,
            pv: Vec::new(),
            string: None,
        }
    }

    /// True for the first (or only) principal variation
    pub fn is_primary(&self) -> bool {
        self.multipv.map_or(true, |m| m == 1)
    }

    /// Parse the arguments of an `info` line
    pub fn parse(args: &[&str]) -> Self {
        let mut info = InfoLine::empty();

        let mut i = 0;
        while i < args.len() {
            match args[i] {
                "depth" if i + 1 < args.len() => {
                    info.depth = args[i + 1].parse().ok();
                    i += 2;
                }
                "seldepth" if i + 1 < args.len() => {
                    info.seldepth = args[i + 1].parse().ok();
                    i += 2;
                }
                "multipv" if i + 1 < args.len() => {
                    info.multipv = args[i + 1].parse().ok();
                    i += 2;
                }
                "nodes" if i + 1 < args.len() => {
                    info.nodes = args[i + 1].parse().ok();
                    i += 2;
                }
                "nps" if i + 1 < args.len() => {
                    info.nps = args[i + 1].parse().ok();
                    i += 2;
                }
                "time" if i + 1 < args.len() => {
                    info.time_ms = args[i + 1].parse().ok();
                    i += 2;
                }
                "score" if i + 2 < args.len() => {
                    let value = args[i + 2].parse::<i32>().ok();
                    info.score = match (args[i + 1], value) {
                        ("cp", Some(cp)) => Some(Score::Centipawns(cp)),
                        ("mate", Some(n)) => Some(Score::Mate(n)),
                        _ => None,
                    };
                    i += 3;
                    match args.get(i) {
                        Some(&"lowerbound") => {
                            info.bound = ScoreBound::Lower;
                            i += 1;
                        }
                        Some(&"upperbound") => {
                            info.bound = ScoreBound::Upper;
                            i += 1;
                        }
                        _ => {}
                    }
                }
                "pv" => {
                    info.pv = args[i + 1..].iter().map(|s| s.to_string()).collect();
                    break;
                }
                "string" => {
                    info.string = Some(args[i + 1..].join(" "));
                    break;
                }
                _ => {
                    i += 1;
                }
            }
        }

        info
    }
}

/// Final answer of a search
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BestMove {
    /// `None` for `(none)`, `0000` or a bare `bestmove`
    pub mv: Option<String>,
    pub ponder: Option<String>,
}

impl BestMove {
    pub fn parse(args: &[&str]) -> Self {
        fn is_move(text: &str) -> bool {
            text != "(none)" && text != "0000"
        }
        let mv = args.first().filter(|t| is_move(t)).map(|s| s.to_string());
        let ponder = match (args.get(1), args.get(2)) {
            (Some(&"ponder"), Some(p)) if is_move(p) => Some(p.to_string()),
            _ => None,
        };
        BestMove { mv, ponder }
    }
}

/// Anything an engine can say
#[derive(Clone, Debug, PartialEq)]
pub enum EngineLine {
    Id { key: String, value: String },
    UciOk,
    ReadyOk,
    Option(UciOption),
    Info(InfoLine),
    BestMove(BestMove),
    Other(String),
}

pub fn parse_line(line: &str) -> EngineLine {
    let line = line.trim();
    let parts: Vec<&str> = line.split_whitespace().collect();
    let Some((&command, args)) = parts.split_first() else {
        return EngineLine::Other(String::new());
    };

    match command {
        "uciok" => EngineLine::UciOk,
        "readyok" => EngineLine::ReadyOk,
        "id" if !args.is_empty() => EngineLine::Id {
            key: args[0].to_string(),
            value: args[1..].join(" "),
        },
        "option" => match UciOption::parse(line) {
            Some(option) => EngineLine::Option(option),
            None => EngineLine::Other(line.to_string()),
        },
        "info" => EngineLine::Info(InfoLine::parse(args)),
        "bestmove" => EngineLine::BestMove(BestMove::parse(args)),
        _ => EngineLine::Other(line.to_string()),
    }
}

/// Pick the info line that describes the finished search.
///
/// Prefers a primary line at exactly the requested depth, otherwise the
/// deepest primary line. Lines without a score are ignored.
pub fn select_info(lines: &[InfoLine], requested_depth: Option<u32>) -> Option<&InfoLine> {
    let scored = || lines.iter().filter(|l| l.score.is_some() && l.is_primary());

    if let Some(depth) = requested_depth {
        if let Some(line) = scored().filter(|l| l.depth == Some(depth)).last() {
            return Some(line);
        }
    }

    // max_by_key keeps the last of equal keys, i.e. the most recent line
    scored().max_by_key(|l| l.depth.unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(line: &str) -> InfoLine {
        match parse_line(line) {
            EngineLine::Info(info) => info,
            other => panic!("not an info line: {:?}", other),
        }
    }

    #[test]
    fn command_builders() {
        assert_eq!(position_command("startpos"), "position startpos");
        assert_eq!(position_command(STARTING_FEN), "position startpos");
        assert_eq!(
            position_command("4k3/8/8/8/8/8/8/4K2R w K - 0 1"),
            "position fen 4k3/8/8/8/8/8/8/4K2R w K - 0 1"
        );
        assert_eq!(go_command(SearchLimit::Depth(12)), "go depth 12");
        assert_eq!(go_command(SearchLimit::MoveTime(Duration::from_millis(250))), "go movetime 250");
    }

    #[test]
    fn parse_info_fields() {
        let line = info("info depth 12 seldepth 18 multipv 1 score cp -35 upperbound nodes 123456 nps 900000 time 137 pv e7e5 g1f3 b8c6");
        assert_eq!(line.depth, Some(12));
        assert_eq!(line.seldepth, Some(18));
        assert_eq!(line.score, Some(Score::Centipawns(-35)));
        assert_eq!(line.bound, ScoreBound::Upper);
        assert_eq!(line.nodes, Some(123456));
        assert_eq!(line.time_ms, Some(137));
        assert_eq!(line.pv, vec!["e7e5", "g1f3", "b8c6"]);

        let mate = info("info depth 3 score mate -2 pv h7h8");
        assert_eq!(mate.score, Some(Score::Mate(-2)));

        let text = info("info string NNUE evaluation enabled");
        assert_eq!(text.string.as_deref(), Some("NNUE evaluation enabled"));
        assert_eq!(text.score, None);
    }

    #[test]
    fn parse_other_lines() {
        assert_eq!(parse_line("uciok"), EngineLine::UciOk);
        assert_eq!(parse_line("readyok  "), EngineLine::ReadyOk);
        assert_eq!(
            parse_line("id name Stockfish 16"),
            EngineLine::Id {
                key: "name".to_string(),
                value: "Stockfish 16".to_string()
            }
        );
        assert!(matches!(parse_line("option name Hash type spin default 16 min 1 max 33554432"), EngineLine::Option(_)));
        assert_eq!(parse_line("Stockfish by the developers"), EngineLine::Other("Stockfish by the developers".to_string()));
    }

    #[test]
    fn parse_bestmove_variants() {
        let best = |line: &str| match parse_line(line) {
            EngineLine::BestMove(b) => b,
            other => panic!("{:?}", other),
        };
        assert_eq!(
            best("bestmove e2e4 ponder e7e5"),
            BestMove {
                mv: Some("e2e4".to_string()),
                ponder: Some("e7e5".to_string())
            }
        );
        assert_eq!(best("bestmove (none)").mv, None);
        assert_eq!(best("bestmove 0000").mv, None);
        assert_eq!(best("bestmove").mv, None);
    }

    #[test]
    fn info_selection_prefers_requested_depth() {
        let lines = vec![
            info("info depth 8 multipv 1 score cp 10 pv e2e4"),
            info("info depth 10 multipv 1 score cp 20 pv d2d4"),
            info("info depth 10 multipv 2 score cp 5 pv c2c4"),
            info("info depth 11 multipv 1 score cp 40 lowerbound pv d2d4"),
        ];
        assert_eq!(select_info(&lines, Some(10)).unwrap().score, Some(Score::Centipawns(20)));
        assert_eq!(select_info(&lines, Some(9)).unwrap().depth, Some(11));
        assert_eq!(select_info(&lines, None).unwrap().depth, Some(11));
        assert!(select_info(&[info("info string hello")], Some(1)).is_none());
    }
}
