//! Engine Bridge
//!
//! Drives one external UCI engine. Each `analyze` call walks the request state
//! machine
//!
//! ```text
//! Idle -> Configuring -> Positioning -> Searching -> Completed | TimedOut | Crashed
//! ```
//!
//! on the caller's thread, ticking on the reader channel until the engine
//! answers, the budget runs out or the process dies. `&mut self` keeps a
//! single request in flight.
//!
//! Output that belongs to an abandoned search is never attributed to a newer
//! request: every search given up on after `stop` is counted, and that many
//! `bestmove` lines are swallowed (along with their `info` lines) before new
//! output is accepted. An `isready` fence precedes every search.

use crate::config::BridgeConfig;
use crate::engine::options::{EngineSettings, OptionSet, Strength, MULTI_PV};
use crate::engine::process::EngineProcess;
use crate::engine::protocol::{self, BestMove, EngineLine, InfoLine, SearchLimit};
use crate::engine::score::{side_probability, Score};
use crate::error::EngineError;
use crate::events::{SubscriptionId, Subscribers};
use crate::position::Position;
use crate::types::Color;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Where the current (or last) request is in its lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum RequestState {
    Idle,
    Configuring,
    Positioning,
    Searching,
    Completed,
    TimedOut,
    Crashed,
}

/// Outcome of one request
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum RequestStatus {
    Completed,
    TimedOut,
    Crashed,
    /// Bad input; the engine was never contacted
    Rejected,
    /// The engine could not be started or did not become ready
    Failed,
}

/// Game-over verdict when the engine has no move to offer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Terminal {
    Checkmate,
    Stalemate,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AnalysisRequest {
    pub fen: String,
    pub limit: SearchLimit,
    pub strength: Strength,
    pub multipv: u32,
}

impl AnalysisRequest {
    pub fn depth(fen: impl Into<String>, depth: u32) -> Self {
        AnalysisRequest {
            fen: fen.into(),
            limit: SearchLimit::Depth(depth),
            strength: Strength::full(),
            multipv: 1,
        }
    }

    pub fn movetime(fen: impl Into<String>, millis: u64) -> Self {
        AnalysisRequest {
            fen: fen.into(),
            limit: SearchLimit::MoveTime(Duration::from_millis(millis)),
            strength: Strength::full(),
            multipv: 1,
        }
    }

    pub fn with_strength(mut self, strength: Strength) -> Self {
        self.strength = strength;
        self
    }

    pub fn with_multipv(mut self, multipv: u32) -> Self {
        self.multipv = multipv.max(1);
        self
    }

    fn requested_depth(&self) -> Option<u32> {
        match self.limit {
            SearchLimit::Depth(d) => Some(d),
            SearchLimit::MoveTime(_) => None,
        }
    }
}

/// Everything a request produced. Always complete; failures are carried in
/// `status` and `error`.
#[derive(Clone, Debug, PartialEq)]
pub struct AnalysisResult {
    pub generation: u64,
    pub fen: String,
    pub status: RequestStatus,
    pub error: Option<EngineError>,
    pub side_to_move: Color,
    /// Verbatim engine move in coordinate form
    pub best_move: Option<String>,
    pub ponder: Option<String>,
    /// From White's point of view
    pub score: Option<Score>,
    pub depth: Option<u32>,
    pub pv: Vec<String>,
    pub terminal: Option<Terminal>,
    pub white_win_probability: f64,
    pub side_to_move_probability: f64,
    /// Raw engine output attributed to this request
    pub lines: Vec<String>,
    pub elapsed: Duration,
}

impl AnalysisResult {
    pub fn is_ok(&self) -> bool {
        self.status == RequestStatus::Completed
    }
}

/// One line of engine output
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineOutput {
    pub generation: u64,
    pub line: String,
    /// Output left over from an abandoned search
    pub stale: bool,
}

#[derive(Debug, Default)]
struct RequestRecord {
    generation: u64,
    lines: Vec<String>,
    infos: Vec<InfoLine>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Wait {
    UciOk,
    ReadyOk,
    BestMove,
    /// Until every abandoned search has delivered its bestmove
    Settled,
}

pub struct EngineBridge {
    config: BridgeConfig,
    settings: EngineSettings,
    process: Option<EngineProcess>,
    name: Option<String>,
    author: Option<String>,
    options: OptionSet,
    state: RequestState,
    generation: u64,
    abandoned: usize,
    sticky: Option<EngineError>,
    current_multipv: u32,
    record: RequestRecord,
    line_subscribers: Subscribers<EngineOutput>,
    analysis_subscribers: Subscribers<AnalysisResult>,
}

impl EngineBridge {
    /// A bridge that starts its engine on first use
    pub fn new(config: BridgeConfig) -> Self {
        let settings = config.engine_settings();
        EngineBridge {
            config,
            settings,
            process: None,
            name: None,
            author: None,
            options: OptionSet::default(),
            state: RequestState::Idle,
            generation: 0,
            abandoned: 0,
            sticky: None,
            current_multipv: 1,
            record: RequestRecord::default(),
            line_subscribers: Subscribers::new(),
            analysis_subscribers: Subscribers::new(),
        }
    }

    /// Create a bridge and start its engine right away
    pub fn launch(config: BridgeConfig) -> Result<Self, EngineError> {
        let mut bridge = EngineBridge::new(config);
        bridge.start()?;
        Ok(bridge)
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn state(&self) -> RequestState {
        self.state
    }

    pub fn engine_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn engine_author(&self) -> Option<&str> {
        self.author.as_deref()
    }

    /// Options advertised during the last handshake
    pub fn options(&self) -> &OptionSet {
        &self.options
    }

    /// The error that blocks requests until [`restart`](Self::restart), if any
    pub fn sticky_error(&self) -> Option<&EngineError> {
        self.sticky.as_ref()
    }

    pub fn is_running(&mut self) -> bool {
        self.process.as_mut().map_or(false, |p| p.is_alive())
    }

    /// Threads/Hash to use from the next (re)start on
    pub fn set_settings(&mut self, settings: EngineSettings) {
        self.settings = settings;
    }

    pub fn subscribe_lines<F>(&mut self, handler: F) -> SubscriptionId
    where
        F: FnMut(&EngineOutput) + Send + 'static,
    {
        self.line_subscribers.subscribe(handler)
    }

    pub fn unsubscribe_lines(&mut self, id: SubscriptionId) -> bool {
        self.line_subscribers.unsubscribe(id)
    }

    pub fn subscribe_analysis<F>(&mut self, handler: F) -> SubscriptionId
    where
        F: FnMut(&AnalysisResult) + Send + 'static,
    {
        self.analysis_subscribers.subscribe(handler)
    }

    pub fn unsubscribe_analysis(&mut self, id: SubscriptionId) -> bool {
        self.analysis_subscribers.unsubscribe(id)
    }

    /// Launch the engine and complete the handshake. Replaces a running engine.
    pub fn start(&mut self) -> Result<(), EngineError> {
        self.stop_process();
        self.abandoned = 0;
        self.options.clear();
        self.name = None;
        self.author = None;
        self.current_multipv = 1;

        self.process = Some(EngineProcess::spawn(&self.config.engine_path, &self.config.engine_args)?);

        match self.initialize() {
            Ok(()) => {
                self.sticky = None;
                self.state = RequestState::Idle;
                info!(
                    name = self.name.as_deref().unwrap_or("?"),
                    options = self.options.len(),
                    "engine ready"
                );
                Ok(())
            }
            Err(e) => {
                self.stop_process();
                Err(e)
            }
        }
    }

    fn initialize(&mut self) -> Result<(), EngineError> {
        self.send("uci")?;
        self.wait_for(Wait::UciOk, self.config.handshake_timeout())
            .map_err(|e| not_ready(e, "uci"))?;

        for command in self.options.settings_commands(&self.settings) {
            self.send(&command)?;
        }
        self.fence("isready")
    }

    /// Stop the engine and launch a fresh one.
    ///
    /// On failure the bridge keeps reporting [`EngineError::RestartFailed`]
    /// until a later restart succeeds.
    pub fn restart(&mut self) -> Result<(), EngineError> {
        warn!(path = %self.config.engine_path, "restarting engine");
        self.sticky = None;
        match self.start() {
            Ok(()) => Ok(()),
            Err(e) => {
                let err = EngineError::RestartFailed(e.to_string());
                warn!(error = %err, "engine stays unavailable");
                self.sticky = Some(err.clone());
                self.state = RequestState::Crashed;
                Err(err)
            }
        }
    }

    /// Send `quit`, wait briefly, kill if needed
    pub fn shutdown(&mut self) {
        if self.process.is_some() {
            info!("shutting engine down");
        }
        self.stop_process();
        self.state = RequestState::Idle;
    }

    fn stop_process(&mut self) {
        if let Some(mut process) = self.process.take() {
            process.shutdown(self.config.shutdown_grace());
        }
    }

    /// Run one analysis request to completion
    pub fn analyze(&mut self, request: &AnalysisRequest) -> AnalysisResult {
        let started = Instant::now();
        self.generation += 1;
        self.record = RequestRecord {
            generation: self.generation,
            ..RequestRecord::default()
        };
        self.state = RequestState::Idle;

        let position = match Position::from_fen(&request.fen) {
            Ok(position) => position,
            Err(e) => {
                debug!(fen = %request.fen, error = %e, "rejected analysis request");
                return self.finish(request, Color::White, RequestStatus::Rejected, Some(e.into()), None, started);
            }
        };
        let side = position.side_to_move;

        if let Some(err) = self.sticky.clone() {
            return self.finish(request, side, RequestStatus::Crashed, Some(err), None, started);
        }
        if self.process.is_none() {
            if let Err(e) = self.start() {
                let status = if e.is_crash() { RequestStatus::Crashed } else { RequestStatus::Failed };
                return self.finish(request, side, status, Some(e), None, started);
            }
        }

        match self.run_request(request) {
            Ok(best) => {
                self.state = RequestState::Completed;
                self.finish(request, side, RequestStatus::Completed, None, Some(best), started)
            }
            Err(e @ EngineError::Timeout { .. }) => {
                self.state = RequestState::TimedOut;
                warn!(fen = %request.fen, error = %e, "search timed out");
                let result = self.finish(request, side, RequestStatus::TimedOut, Some(e), None, started);
                self.abandon_search();
                result
            }
            Err(e) if e.is_crash() => {
                self.state = RequestState::Crashed;
                warn!(fen = %request.fen, error = %e, "engine crashed during request");
                let result = self.finish(request, side, RequestStatus::Crashed, Some(e.clone()), None, started);
                self.recover(e);
                result
            }
            Err(e) => {
                warn!(fen = %request.fen, error = %e, "engine request failed");
                let result = self.finish(request, side, RequestStatus::Failed, Some(e.clone()), None, started);
                self.recover(e);
                result
            }
        }
    }

    fn run_request(&mut self, request: &AnalysisRequest) -> Result<BestMove, EngineError> {
        self.state = RequestState::Configuring;
        let mut commands = self.options.strength_commands(&request.strength);
        if request.multipv.max(1) != self.current_multipv {
            if let Some(command) = self.options.spin_command(MULTI_PV, request.multipv.max(1) as i64) {
                commands.push(command);
            }
            self.current_multipv = request.multipv.max(1);
        }
        for command in &commands {
            self.send(command)?;
        }
        self.send("ucinewgame")?;
        self.fence("ucinewgame")?;

        self.state = RequestState::Positioning;
        self.send(&protocol::position_command(&request.fen))?;

        self.state = RequestState::Searching;
        let budget = match request.limit {
            SearchLimit::MoveTime(time) => time + self.config.movetime_grace(),
            SearchLimit::Depth(_) => self.config.depth_timeout(),
        };
        self.send(&protocol::go_command(request.limit))?;

        self.wait_for(Wait::BestMove, budget)?
            .ok_or_else(|| EngineError::Io("search ended without a bestmove".to_string()))
    }

    /// `isready` and wait for `readyok`
    fn fence(&mut self, stage: &str) -> Result<(), EngineError> {
        self.send("isready")?;
        self.wait_for(Wait::ReadyOk, self.config.ready_timeout())
            .map(|_| ())
            .map_err(|e| not_ready(e, stage))
    }

    /// Best-effort `stop` after a timeout. A search that never answers is
    /// counted so its late `bestmove` is discarded; an engine that will not
    /// even answer `isready`, or times out again while an earlier stopped
    /// search is still outstanding, is replaced.
    fn abandon_search(&mut self) {
        if self.abandoned > 0 {
            warn!(outstanding = self.abandoned, "engine ignored an earlier stop, replacing it");
            self.recover(EngineError::NotReady {
                stage: "stop".to_string(),
            });
            return;
        }
        if self.send("stop").is_err() {
            self.recover(EngineError::Crashed("engine died while stopping a search".to_string()));
            return;
        }
        self.abandoned += 1;

        match self.wait_for(Wait::Settled, self.config.stop_grace()) {
            Ok(_) => debug!("abandoned search answered stop"),
            Err(EngineError::Timeout { .. }) => {
                debug!(outstanding = self.abandoned, "no bestmove after stop");
                if let Err(e) = self.fence("stop") {
                    self.recover(e);
                }
            }
            Err(e) => self.recover(e),
        }
    }

    /// One automatic restart after a failure
    fn recover(&mut self, cause: EngineError) {
        if !self.config.auto_restart {
            self.stop_process();
            self.sticky = Some(cause);
            return;
        }
        if let Err(e) = self.restart() {
            warn!(error = %e, "automatic restart failed");
        }
    }

    fn send(&mut self, command: &str) -> Result<(), EngineError> {
        match self.process.as_mut() {
            Some(process) => process.send(command),
            None => Err(EngineError::Crashed("engine is not running".to_string())),
        }
    }

    /// Next output line, `Ok(None)` if the tick passed quietly
    fn next_line(&mut self) -> Result<Option<String>, EngineError> {
        let tick = self.config.tick();
        let process = self
            .process
            .as_mut()
            .ok_or_else(|| EngineError::Crashed("engine is not running".to_string()))?;

        if let Some(line) = process.recv_timeout(tick)? {
            return Ok(Some(line));
        }
        if process.is_alive() {
            return Ok(None);
        }
        // Exited: the reader may still be forwarding the last lines. Hand them
        // out until the channel closes, then report the crash.
        let deadline = Instant::now() + self.config.shutdown_grace();
        while Instant::now() < deadline {
            if let Some(line) = process.recv_timeout(tick)? {
                return Ok(Some(line));
            }
        }
        Err(EngineError::Crashed("engine process exited".to_string()))
    }

    fn wait_for(&mut self, target: Wait, timeout: Duration) -> Result<Option<BestMove>, EngineError> {
        let deadline = Instant::now() + timeout;
        loop {
            if target == Wait::Settled && self.abandoned == 0 {
                return Ok(None);
            }
            if Instant::now() >= deadline {
                return Err(EngineError::Timeout {
                    budget_ms: timeout.as_millis() as u64,
                });
            }
            let Some(line) = self.next_line()? else {
                continue;
            };

            let stale = self.abandoned > 0;
            self.line_subscribers.emit(&EngineOutput {
                generation: self.record.generation,
                line: line.clone(),
                stale,
            });
            if !stale {
                self.record.lines.push(line.clone());
            }

            match protocol::parse_line(&line) {
                EngineLine::Id { key, value } => match key.as_str() {
                    "name" => self.name = Some(value),
                    "author" => self.author = Some(value),
                    _ => {}
                },
                EngineLine::Option(option) => self.options.insert(option),
                EngineLine::UciOk if target == Wait::UciOk => return Ok(None),
                EngineLine::ReadyOk if target == Wait::ReadyOk => return Ok(None),
                EngineLine::BestMove(_) if stale => {
                    self.abandoned -= 1;
                    debug!(outstanding = self.abandoned, "discarded bestmove of an abandoned search");
                }
                EngineLine::BestMove(best) if target == Wait::BestMove => return Ok(Some(best)),
                EngineLine::Info(info) if !stale && target == Wait::BestMove => self.record.infos.push(info),
                _ => {}
            }
        }
    }

    fn finish(
        &mut self,
        request: &AnalysisRequest,
        side: Color,
        status: RequestStatus,
        error: Option<EngineError>,
        best: Option<BestMove>,
        started: Instant,
    ) -> AnalysisResult {
        let selected = protocol::select_info(&self.record.infos, request.requested_depth()).cloned();
        let mut score = selected
            .as_ref()
            .and_then(|info| info.score)
            .map(|raw| Score::from_side_to_move(raw, side));
        let (best_move, ponder) = match best {
            Some(best) => (best.mv, best.ponder),
            None => (None, None),
        };

        let mut terminal = None;
        if status == RequestStatus::Completed && best_move.is_none() {
            if score.map_or(false, |s| s.is_mate()) {
                terminal = Some(Terminal::Checkmate);
                score = Some(Score::Checkmated(side));
            } else {
                terminal = Some(Terminal::Stalemate);
                score = Some(Score::Centipawns(0));
            }
        }

        let white = score.map_or(0.5, |s| s.white_win_probability());
        let result = AnalysisResult {
            generation: self.record.generation,
            fen: request.fen.clone(),
            status,
            error,
            side_to_move: side,
            best_move,
            ponder,
            score,
            depth: selected.as_ref().and_then(|info| info.depth),
            pv: selected.map(|info| info.pv).unwrap_or_default(),
            terminal,
            white_win_probability: white,
            side_to_move_probability: side_probability(white, side),
            lines: std::mem::take(&mut self.record.lines),
            elapsed: started.elapsed(),
        };
        debug!(
            generation = result.generation,
            status = ?result.status,
            best = result.best_move.as_deref().unwrap_or("-"),
            "analysis finished"
        );
        self.analysis_subscribers.emit(&result);
        result
    }
}

impl Drop for EngineBridge {
    fn drop(&mut self) {
        self.stop_process();
    }
}

/// A handshake or fence that ran out of time means the engine is not ready
fn not_ready(error: EngineError, stage: &str) -> EngineError {
    match error {
        EngineError::Timeout { .. } => EngineError::NotReady {
            stage: stage.to_string(),
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_fen_is_rejected_without_an_engine() {
        let mut bridge = EngineBridge::new(BridgeConfig::for_engine("/nonexistent/engine"));
        let result = bridge.analyze(&AnalysisRequest::depth("8/8/8/8/8/8/8/8 w - - 0 1", 5));
        assert_eq!(result.status, RequestStatus::Rejected);
        assert!(matches!(result.error, Some(EngineError::InvalidFen(_))));
        assert!(result.best_move.is_none());
        assert_eq!(result.white_win_probability, 0.5);
        assert!(!bridge.is_running());
    }

    #[test]
    fn missing_engine_fails_cleanly() {
        let mut bridge = EngineBridge::new(BridgeConfig::for_engine("/nonexistent/engine"));
        let result = bridge.analyze(&AnalysisRequest::depth("startpos", 5));
        assert_eq!(result.status, RequestStatus::Failed);
        assert!(matches!(result.error, Some(EngineError::Spawn { .. })));
        assert!(EngineBridge::launch(BridgeConfig::for_engine("/nonexistent/engine")).is_err());
    }

    #[test]
    fn request_builders() {
        let req = AnalysisRequest::movetime("startpos", 150)
            .with_strength(Strength::elo(1500))
            .with_multipv(0);
        assert_eq!(req.limit, SearchLimit::MoveTime(Duration::from_millis(150)));
        assert_eq!(req.multipv, 1);
        assert_eq!(req.requested_depth(), None);
        assert_eq!(AnalysisRequest::depth("startpos", 7).requested_depth(), Some(7));
    }

    #[test]
    fn not_ready_only_rewrites_timeouts() {
        assert_eq!(
            not_ready(EngineError::Timeout { budget_ms: 5 }, "uci"),
            EngineError::NotReady { stage: "uci".to_string() }
        );
        assert_eq!(
            not_ready(EngineError::Io("x".to_string()), "uci"),
            EngineError::Io("x".to_string())
        );
    }
}
