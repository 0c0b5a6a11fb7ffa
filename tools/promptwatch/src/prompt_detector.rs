//! Detects the bottom border of the rounded input box that interactive
//! coding assistants draw around their prompt.
//!
//! Once that border shows up in captured output the session has finished
//! rendering and is waiting for input. Matching works on trimmed lines and
//! on `char`s, so box-drawing glyphs are never split.

use serde::Serialize;

pub const HORIZONTAL: char = '─';
pub const BOTTOM_LEFT: char = '╰';
pub const BOTTOM_RIGHT: char = '╯';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BorderShape {
    /// Right-hand fragment such as `──╯`, possibly after other text.
    Partial,
    /// Whole bottom edge `╰──╯`.
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BorderMatch {
    pub line_index: usize,
    pub shape: BorderShape,
}

/// Returns true when any line of `output` is a prompt box bottom border.
pub fn detects(output: &str) -> bool {
    find_bottom_border(output).is_some()
}

/// Last line of `output` that closes a prompt box, if any.
pub fn find_bottom_border(output: &str) -> Option<BorderMatch> {
    if output.trim().is_empty() {
        return None;
    }
    output
        .lines()
        .enumerate()
        .filter_map(|(line_index, line)| {
            classify_line(line).map(|shape| BorderMatch { line_index, shape })
        })
        .last()
}

/// Classifies a single line. The line must end at `╯` with at least one `─`
/// right before it; anything after the corner (`──╯ │`) rules it out.
pub fn classify_line(line: &str) -> Option<BorderShape> {
    let trimmed = line.trim();
    let body = trimmed.strip_suffix(BOTTOM_RIGHT)?;
    if !body.ends_with(HORIZONTAL) {
        return None;
    }
    match body.strip_prefix(BOTTOM_LEFT) {
        Some(inner) if inner.chars().all(|c| c == HORIZONTAL) => Some(BorderShape::Complete),
        _ => Some(BorderShape::Partial),
    }
}
