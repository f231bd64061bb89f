//! chess_uci_bridge - chess rules core and UCI engine client
//!
//! - Full FIDE move generation, including castling from non-standard rook files
//! - FEN, SAN and coordinate notation
//! - Draw detection (stalemate, material, fifty moves, threefold repetition)
//! - Branching game tree with Zobrist position identity and PGN export
//! - A bridge to an external UCI engine with timeouts, crash recovery and
//!   evaluation normalization

pub mod types;
pub mod error;
pub mod position;
pub mod fen;
pub mod moves;
pub mod move_generator;
pub mod rules;
pub mod notation;
pub mod hash;
pub mod game_tree;
pub mod pgn;
pub mod cache;
pub mod events;
pub mod config;
pub mod engine;
pub mod game;

pub use config::BridgeConfig;
pub use engine::{AnalysisRequest, AnalysisResult, EngineBridge, RequestStatus, Score};
pub use error::{ConfigError, EngineError, FenError, MoveError};
pub use game::Game;
pub use moves::Move;
pub use position::Position;
pub use rules::GameStatus;
