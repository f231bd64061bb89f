//! Game facade
//!
//! What a front end talks to: make/undo/redo moves, query legal moves and
//! status, read evaluations and subscribe to side-to-move changes. Owns the
//! game tree, the analysis cache and (optionally) an engine bridge.

use crate::cache::{AnalysisCache, CachedEvaluation};
use crate::config::BridgeConfig;
use crate::engine::bridge::{AnalysisRequest, EngineBridge};
use crate::engine::options::Strength;
use crate::engine::protocol::SearchLimit;
use crate::error::{EngineError, FenError, MoveResult};
use crate::events::{SubscriptionId, Subscribers};
use crate::game_tree::{GameTree, NodeId, DEFAULT_MAX_NODES};
use crate::move_generator::MoveGenerator;
use crate::moves::Move;
use crate::notation::{parse_move, to_san};
use crate::pgn::{write_pgn, PgnHeaders, PgnOptions};
use crate::position::Position;
use crate::rules::{self, DrawReason, GameStatus};
use crate::types::Color;
use tracing::debug;

const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// Emitted whenever navigation lands on a node, and when the game is reset
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SideToMoveChanged {
    pub side: Color,
    pub node: NodeId,
    pub hash: u64,
}

pub struct Game {
    tree: GameTree,
    cache: AnalysisCache,
    generator: MoveGenerator,
    engine: Option<EngineBridge>,
    side_subscribers: Subscribers<SideToMoveChanged>,
}

impl Game {
    pub fn new() -> Self {
        Self::with_position(Position::new(), DEFAULT_MAX_NODES, DEFAULT_CACHE_CAPACITY)
    }

    pub fn from_fen(fen: &str) -> Result<Self, FenError> {
        let position = Position::from_fen(fen)?;
        Ok(Self::with_position(position, DEFAULT_MAX_NODES, DEFAULT_CACHE_CAPACITY))
    }

    /// Tree and cache sized from `config`, with an engine that starts on
    /// first analysis
    pub fn with_engine(config: BridgeConfig) -> Self {
        let mut game = Self::with_position(Position::new(), config.max_tree_nodes, config.cache_capacity);
        game.engine = Some(EngineBridge::new(config));
        game
    }

    fn with_position(position: Position, max_nodes: usize, cache_capacity: usize) -> Self {
        Game {
            tree: GameTree::with_capacity(position, max_nodes),
            cache: AnalysisCache::new(cache_capacity),
            generator: MoveGenerator::new(),
            engine: None,
            side_subscribers: Subscribers::new(),
        }
    }

    pub fn attach_engine(&mut self, engine: EngineBridge) -> Option<EngineBridge> {
        self.engine.replace(engine)
    }

    pub fn detach_engine(&mut self) -> Option<EngineBridge> {
        self.engine.take()
    }

    pub fn engine_mut(&mut self) -> Option<&mut EngineBridge> {
        self.engine.as_mut()
    }

    pub fn position(&self) -> &Position {
        &self.tree.current().position
    }

    pub fn side_to_move(&self) -> Color {
        self.position().side_to_move
    }

    pub fn tree(&self) -> &GameTree {
        &self.tree
    }

    pub fn cache(&self) -> &AnalysisCache {
        &self.cache
    }

    pub fn subscribe_side_to_move<F>(&mut self, handler: F) -> SubscriptionId
    where
        F: FnMut(&SideToMoveChanged) + Send + 'static,
    {
        self.side_subscribers.subscribe(handler)
    }

    pub fn unsubscribe_side_to_move(&mut self, id: SubscriptionId) -> bool {
        self.side_subscribers.unsubscribe(id)
    }

    /// Start over from `position`. The cache survives; it is keyed by position.
    pub fn reset(&mut self, position: Position) {
        self.tree.clear(position);
        self.notify_side();
    }

    /// Legal moves in the current position
    pub fn legal_moves(&mut self) -> Vec<Move> {
        let hash = self.tree.current().hash;
        if let Some(moves) = self.cache.legal_moves(hash) {
            return moves;
        }
        let moves = self.generator.generate_legal_moves(self.position());
        self.cache.store_legal_moves(hash, moves.clone());
        moves
    }

    /// Status of the current position given the path that led to it.
    ///
    /// The cache only holds verdicts that follow from the placement alone.
    /// The hash ignores the move clocks, so the fifty-move rule is checked
    /// here, and repetition is always recounted along the current path.
    pub fn status(&mut self) -> GameStatus {
        let hash = self.tree.current().hash;
        let local = match self.cache.status(hash) {
            Some(status) => status,
            None => {
                let status = rules::evaluate(self.position(), &[]);
                if status != GameStatus::Draw(DrawReason::FiftyMove) {
                    self.cache.store_status(hash, status);
                }
                status
            }
        };
        if local != GameStatus::InProgress {
            return local;
        }
        if self.position().halfmove_clock >= 100 {
            return GameStatus::Draw(DrawReason::FiftyMove);
        }
        let history = self.tree.path_hashes();
        if rules::repetition_count(self.position(), &history) >= 3 {
            GameStatus::Draw(DrawReason::ThreefoldRepetition)
        } else {
            GameStatus::InProgress
        }
    }

    /// Play a move given as coordinate, castling or SAN text
    pub fn make_move(&mut self, text: &str) -> MoveResult<Move> {
        let mv = parse_move(self.position(), text)?;
        self.play(&mv)
    }

    /// Validate and play a move, recording it in the tree.
    ///
    /// The position is untouched when the move is rejected. Returns the
    /// canonical legal move that was played.
    pub fn play(&mut self, mv: &Move) -> MoveResult<Move> {
        let before = self.position().clone();
        let mut after = before.clone();
        let played = rules::try_apply_move(&mut after, mv)?;
        let san = to_san(&before, &played);

        let evaluation = self
            .cache
            .peek(after.zobrist())
            .and_then(|e| e.evaluation.as_ref())
            .map(|e| e.score);

        debug!(san = %san, fen = %after.to_fen(), "move played");
        self.tree.add_move(after, played, Some(san), evaluation);
        self.notify_side();
        Ok(played)
    }

    pub fn undo(&mut self) -> bool {
        let moved = self.tree.undo();
        if moved {
            self.notify_side();
        }
        moved
    }

    pub fn redo(&mut self) -> bool {
        let moved = self.tree.redo();
        if moved {
            self.notify_side();
        }
        moved
    }

    pub fn go_to_variation(&mut self, index: usize) -> bool {
        let moved = self.tree.go_to_variation(index);
        if moved {
            self.notify_side();
        }
        moved
    }

    pub fn go_to(&mut self, id: NodeId) -> bool {
        let moved = self.tree.go_to(id);
        if moved {
            self.notify_side();
        }
        moved
    }

    /// Cached engine verdict for the current position
    pub fn evaluation(&self) -> Option<CachedEvaluation> {
        self.cache
            .peek(self.tree.current().hash)
            .and_then(|e| e.evaluation.clone())
    }

    /// Evaluate the current position, reusing a cached result when one is at
    /// least as deep as asked for. A time-limited search accepts any cached
    /// result.
    pub fn analyze(&mut self, limit: SearchLimit, strength: Strength) -> Result<CachedEvaluation, EngineError> {
        let hash = self.tree.current().hash;
        let min_depth = match limit {
            SearchLimit::Depth(depth) => depth,
            SearchLimit::MoveTime(_) => 0,
        };
        if let Some(cached) = self.cache.evaluation(hash, min_depth) {
            debug!(hash, depth = cached.depth, "analysis cache hit");
            self.tree.set_evaluation(self.tree.current_id(), cached.score);
            return Ok(cached);
        }

        let engine = self.engine.as_mut().ok_or(EngineError::NoEngine)?;
        let request = AnalysisRequest {
            fen: self.tree.current().position.to_fen(),
            limit,
            strength,
            multipv: 1,
        };
        let result = engine.analyze(&request);
        if !result.is_ok() {
            return Err(result
                .error
                .unwrap_or_else(|| EngineError::Io("analysis failed without an error".to_string())));
        }
        let score = result
            .score
            .ok_or_else(|| EngineError::Io("engine reported no score".to_string()))?;

        let evaluation = CachedEvaluation {
            score,
            white_win_probability: result.white_win_probability,
            depth: result.depth.unwrap_or(min_depth),
            best_move: result.best_move,
        };
        self.cache.store_evaluation(hash, evaluation.clone());
        self.tree.set_evaluation(self.tree.current_id(), score);
        Ok(evaluation)
    }

    /// The whole tree as PGN. An unset result is filled in from the status of
    /// the main line's last position.
    pub fn pgn(&self, headers: &PgnHeaders, options: PgnOptions) -> String {
        let mut headers = headers.clone();
        if headers.result.trim().is_empty() || headers.result == "*" {
            let line = self.tree.main_line();
            let history: Vec<u64> = line.iter().filter_map(|&id| self.tree.node(id)).map(|n| n.hash).collect();
            if let Some(last) = line.last().and_then(|&id| self.tree.node(id)) {
                headers.result = rules::evaluate(&last.position, &history).result_tag().to_string();
            }
        }
        write_pgn(&self.tree, &headers, options)
    }

    fn notify_side(&mut self) {
        let node = self.tree.current();
        let event = SideToMoveChanged {
            side: node.position.side_to_move,
            node: node.id,
            hash: node.hash,
        };
        self.side_subscribers.emit(&event);
    }
}

impl Default for Game {
    fn default() -> Self {
        Game::new()
    }
}
