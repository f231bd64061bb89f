//! External UCI engine support
//!
//! `process` owns the child and its reader thread, `protocol` builds commands
//! and parses replies, `options` handles advertised options and strength,
//! `score` normalizes evaluations, and `bridge` ties them into the request
//! state machine.

pub mod bridge;
pub mod options;
pub mod process;
pub mod protocol;
pub mod score;

pub use bridge::{
    AnalysisRequest, AnalysisResult, EngineBridge, EngineOutput, RequestState, RequestStatus, Terminal,
};
pub use options::{EngineSettings, OptionSet, Strength, UciOption};
pub use protocol::SearchLimit;
pub use score::Score;
