//! PGN export
//!
//! Writes a [`GameTree`] as PGN: tag pairs, then movetext with variations in
//! parentheses and optional `{[%eval ..]}` comments.

use crate::game_tree::{GameTree, Node, NodeId};
use crate::notation::to_san;
use crate::types::Color;
use serde::{Deserialize, Serialize};

const LINE_WIDTH: usize = 80;

/// Tag pairs. The seven-tag roster is always written, `?` standing in for
/// anything unknown; the rest only when set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PgnHeaders {
    pub event: String,
    pub site: String,
    pub date: String,
    pub round: String,
    pub white: String,
    pub black: String,
    /// Falls back to `*` when empty
    pub result: String,
    pub white_elo: Option<u32>,
    pub black_elo: Option<u32>,
    pub opening: Option<String>,
    pub eco: Option<String>,
}

impl Default for PgnHeaders {
    fn default() -> Self {
        PgnHeaders {
            event: "?".to_string(),
            site: "?".to_string(),
            date: "????.??.??".to_string(),
            round: "?".to_string(),
            white: "?".to_string(),
            black: "?".to_string(),
            result: "*".to_string(),
            white_elo: None,
            black_elo: None,
            opening: None,
            eco: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PgnOptions {
    pub evaluations: bool,
    pub variations: bool,
}

impl Default for PgnOptions {
    fn default() -> Self {
        PgnOptions {
            evaluations: true,
            variations: true,
        }
    }
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

fn tag(out: &mut String, name: &str, value: &str) {
    out.push_str(&format!("[{} \"{}\"]\n", name, escape(value)));
}

/// Render the whole tree
pub fn write_pgn(tree: &GameTree, headers: &PgnHeaders, options: PgnOptions) -> String {
    let mut out = String::new();
    let result = if headers.result.trim().is_empty() {
        "*"
    } else {
        headers.result.as_str()
    };

    tag(&mut out, "Event", &headers.event);
    tag(&mut out, "Site", &headers.site);
    tag(&mut out, "Date", &headers.date);
    tag(&mut out, "Round", &headers.round);
    tag(&mut out, "White", &headers.white);
    tag(&mut out, "Black", &headers.black);
    tag(&mut out, "Result", result);
    if let Some(elo) = headers.white_elo {
        tag(&mut out, "WhiteElo", &elo.to_string());
    }
    if let Some(elo) = headers.black_elo {
        tag(&mut out, "BlackElo", &elo.to_string());
    }
    if let Some(opening) = &headers.opening {
        tag(&mut out, "Opening", opening);
    }
    if let Some(eco) = &headers.eco {
        tag(&mut out, "ECO", eco);
    }

    let root = tree.node(tree.root_id());
    if let Some(root) = root {
        if !root.position.is_start_position() {
            tag(&mut out, "SetUp", "1");
            tag(&mut out, "FEN", &root.position.to_fen());
        }
    }
    out.push('\n');

    let mut tokens = Vec::new();
    write_line(tree, tree.root_id(), options, true, &mut tokens);
    tokens.push(result.to_string());

    out.push_str(&wrap(&tokens));
    out.push('\n');
    out
}

/// Emit the continuation of `parent`: its main move, the sibling variations,
/// then the rest of the main line.
fn write_line(tree: &GameTree, parent: NodeId, options: PgnOptions, mut force_number: bool, tokens: &mut Vec<String>) {
    let mut cursor = parent;
    loop {
        let Some(node) = tree.node(cursor) else {
            return;
        };
        let Some(&main) = node.children.first() else {
            return;
        };

        write_move(tree, node, main, options, force_number, tokens);

        let mut had_variation = false;
        if options.variations {
            for &variation in node.children.iter().skip(1) {
                tokens.push("(".to_string());
                write_move(tree, node, variation, options, true, tokens);
                write_line(tree, variation, options, false, tokens);
                tokens.push(")".to_string());
                had_variation = true;
            }
        }

        force_number = had_variation;
        cursor = main;
    }
}

fn write_move(tree: &GameTree, parent: &Node, child: NodeId, options: PgnOptions, force_number: bool, tokens: &mut Vec<String>) {
    let Some(node) = tree.node(child) else {
        return;
    };
    let Some(mv) = node.mv else {
        return;
    };

    let before = &parent.position;
    match before.side_to_move {
        Color::White => tokens.push(format!("{}.", before.fullmove_number)),
        Color::Black if force_number => tokens.push(format!("{}...", before.fullmove_number)),
        Color::Black => {}
    }

    let san = node.notation.clone().unwrap_or_else(|| to_san(before, &mv));
    tokens.push(san);

    if options.evaluations {
        if let Some(score) = node.evaluation {
            tokens.push(format!("{{[%eval {}]}}", score));
        }
    }
}

fn wrap(tokens: &[String]) -> String {
    let mut out = String::new();
    let mut width = 0;
    for token in tokens {
        // No space inside the parentheses
        let glue = !out.is_empty() && !out.ends_with('(') && token != ")";
        let extra = token.len() + usize::from(glue);
        if width > 0 && width + extra > LINE_WIDTH {
            out.push('\n');
            width = 0;
        } else if glue {
            out.push(' ');
            width += 1;
        }
        out.push_str(token);
        width += token.len();
    }
    out
}
