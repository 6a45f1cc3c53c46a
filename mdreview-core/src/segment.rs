//! Markdown segmentation
//!
//! Turns raw markdown into an ordered list of [`Unit`]s. Two strategies
//! exist and exactly one is chosen per session:
//!
//! - [`SegmentationMode::Block`] cuts the text into headings, list items,
//!   fenced code blocks and paragraphs for whole-block approval.
//! - [`SegmentationMode::Line`] yields one unit per physical line so that
//!   comments can target arbitrary line ranges.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{Unit, UnitKind};

static HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(#{1,6})\s+(.+)$").expect("heading pattern"));
static BULLET_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*[-*]\s+(.+)$").expect("bullet pattern"));
static ORDERED_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\d+\.\s+(.+)$").expect("ordered item pattern"));
static FENCE_LANGUAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^```(\w*)$").expect("fence pattern"));

const FENCE: &str = "```";

/// Segmentation strategy, fixed for the lifetime of a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentationMode {
    #[default]
    Block,
    Line,
}

impl SegmentationMode {
    pub fn segment(self, text: &str) -> Vec<Unit> {
        match self {
            SegmentationMode::Block => segment_blocks(text),
            SegmentationMode::Line => segment_lines(text),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentationMode::Block => "block",
            SegmentationMode::Line => "line",
        }
    }
}

impl fmt::Display for SegmentationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SegmentationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "block" => Ok(SegmentationMode::Block),
            "line" => Ok(SegmentationMode::Line),
            other => Err(format!("unknown segmentation mode '{}' (expected block or line)", other)),
        }
    }
}

/// Split text into heading, list-item, code and paragraph units.
///
/// Single forward pass over physical lines. Pattern checks run in the
/// order heading, list item, code fence, paragraph; the first match wins.
/// Blank lines only separate blocks and never produce units.
pub fn segment_blocks(text: &str) -> Vec<Unit> {
    let lines: Vec<&str> = text.split('\n').collect();
    let mut units = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];

        if line.trim().is_empty() {
            i += 1;
            continue;
        }

        let id = format!("block-{}", units.len());

        if let Some(caps) = HEADING.captures(line) {
            let level = caps[1].len() as u8;
            units.push(Unit::heading(id, level, caps[2].trim(), line));
            i += 1;
            continue;
        }

        if let Some(item) = list_item_text(line) {
            units.push(Unit::new(id, UnitKind::ListItem, item, line));
            i += 1;
            continue;
        }

        if is_fence(line) {
            let start = i;
            i += 1;
            while i < lines.len() && !is_fence(lines[i]) {
                i += 1;
            }
            if i < lines.len() {
                // closing fence
                i += 1;
            } else {
                debug!(unit = %id, line = start, "unterminated code fence consumed to end of input");
            }

            let raw = lines[start..i].join("\n");
            units.push(Unit::new(id, UnitKind::Code, code_label(line), raw));
            continue;
        }

        let start = i;
        i += 1;
        while i < lines.len() && continues_paragraph(lines[i]) {
            i += 1;
        }
        let block = &lines[start..i];
        units.push(Unit::new(
            id,
            UnitKind::Paragraph,
            block.join(" ").trim(),
            block.join("\n"),
        ));
    }

    debug!(units = units.len(), "segmented markdown into blocks");
    units
}

/// One `line` unit per physical line, blank lines included
pub fn segment_lines(text: &str) -> Vec<Unit> {
    text.split('\n')
        .enumerate()
        .map(|(index, line)| Unit::line(index, line))
        .collect()
}

fn list_item_text(line: &str) -> Option<&str> {
    BULLET_ITEM
        .captures(line)
        .or_else(|| ORDERED_ITEM.captures(line))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
}

fn is_fence(line: &str) -> bool {
    line.trim().starts_with(FENCE)
}

fn continues_paragraph(line: &str) -> bool {
    !line.trim().is_empty()
        && !HEADING.is_match(line)
        && list_item_text(line).is_none()
        && !is_fence(line)
}

fn code_label(opening_fence: &str) -> String {
    let language = FENCE_LANGUAGE
        .captures(opening_fence.trim())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or("");

    if language.is_empty() {
        "[Code block]".to_string()
    } else {
        format!("[Code: {}]", language)
    }
}
