//! Block decomposition engine
//!
//! Turns an opaque response string into an ordered sequence of typed
//! content blocks. Text is split on blank-line boundaries first (fence
//! aware, so blank lines inside ``` fences do not split), heading lines
//! then carve their segment so a heading owns its section body, and each
//! resulting segment is classified by a fixed precedence order. The engine
//! never fails: anything unrecognized is a paragraph.
//!
//! A block's `content` is the raw segment text, so joining contents in
//! index order reproduces the response modulo dropped empty and rule-only
//! segments, and re-decomposing a block's own content yields the block
//! back.

pub mod incremental;

pub use incremental::IncrementalDecomposer;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Kind of one content block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    Paragraph,
    Heading,
    Bullet,
    Numbered,
    Code,
    Table,
    Quote,
    Chart,
}

/// Type-specific attributes attached to a block
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockMetadata {
    /// Heading level (1-6)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<u8>,

    /// Fence language tag
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    /// De-markered list item texts
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<String>,

    /// Diagram form named by a chart block
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart_kind: Option<String>,
}

/// One typed, indexed unit of a provider response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseBlock {
    /// 0-based index, contiguous within one response
    pub index: usize,

    /// Classified kind
    pub kind: BlockKind,

    /// Raw segment text, markers included
    pub content: String,

    /// Type-specific attributes
    #[serde(default)]
    pub metadata: BlockMetadata,
}

static NUMBERED_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d+[.)]\s+").unwrap());
static TABLE_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\|?[\s:|-]+\|?\s*$").unwrap());

/// Fence language tags that always mean a chart
const CHART_TAGS: &[&str] = &["mermaid", "chart", "diagram", "plantuml", "vega", "vega-lite"];

/// Diagram declarations recognized at the start of an untagged fence body
const CHART_DECLARATIONS: &[&str] = &[
    "flowchart",
    "sequencediagram",
    "statediagram",
    "gantt",
    "pie",
    "graph",
    "classdiagram",
    "erdiagram",
    "journey",
    "mindmap",
];

/// Decompose response text into typed, contiguously indexed blocks
pub fn decompose(text: &str) -> Vec<ResponseBlock> {
    let mut blocks = Vec::new();
    for segment in split_segments(text) {
        for section in split_heading_sections(&segment) {
            if section.trim().is_empty() || is_horizontal_rule(&section) {
                continue;
            }
            let (kind, metadata) = classify(&section);
            blocks.push(ResponseBlock {
                index: blocks.len(),
                kind,
                content: section,
                metadata,
            });
        }
    }
    blocks
}

/// Split on blank lines, keeping fenced runs whole
fn split_segments(text: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut in_fence = false;

    let mut flush = |current: &mut Vec<&str>| {
        if !current.is_empty() {
            segments.push(current.join("\n"));
            current.clear();
        }
    };

    for line in text.lines() {
        if line.trim_start().starts_with("```") {
            if in_fence {
                current.push(line);
                flush(&mut current);
                in_fence = false;
            } else {
                // A fence opens its own segment even without a blank line
                // before it.
                flush(&mut current);
                current.push(line);
                in_fence = true;
            }
            continue;
        }
        if in_fence {
            current.push(line);
            continue;
        }
        if line.trim().is_empty() {
            flush(&mut current);
        } else {
            current.push(line);
        }
    }
    flush(&mut current);
    segments
}

/// Carve a segment at heading lines so each heading owns its section body
/// up to the next heading of any level
fn split_heading_sections(segment: &str) -> Vec<String> {
    if segment.trim_start().starts_with("```") {
        return vec![segment.to_string()];
    }
    if !segment.lines().any(|l| heading_level(l).is_some()) {
        return vec![segment.to_string()];
    }

    let mut sections = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in segment.lines() {
        if heading_level(line).is_some() && !current.is_empty() {
            sections.push(current.join("\n"));
            current.clear();
        }
        current.push(line);
    }
    if !current.is_empty() {
        sections.push(current.join("\n"));
    }
    sections
}

/// Heading marker level (1-6), if the line is one
fn heading_level(line: &str) -> Option<u8> {
    let trimmed = line.trim_start();
    let hashes = trimmed.chars().take_while(|&c| c == '#').count();
    if (1..=6).contains(&hashes) && trimmed[hashes..].starts_with(' ') {
        Some(hashes as u8)
    } else {
        None
    }
}

/// Exactly a horizontal-rule marker: three or more repeated `-`, `*`, `_`
fn is_horizontal_rule(segment: &str) -> bool {
    let trimmed = segment.trim();
    trimmed.len() >= 3
        && ['-', '*', '_']
            .iter()
            .any(|&rule| trimmed.chars().all(|c| c == rule))
}

/// Classify one segment by the fixed precedence order
fn classify(segment: &str) -> (BlockKind, BlockMetadata) {
    if segment.trim_start().starts_with("```") {
        return classify_fence(segment);
    }

    let lines: Vec<&str> = segment.lines().collect();
    let Some(first) = lines.first() else {
        return (BlockKind::Paragraph, BlockMetadata::default());
    };

    if let Some(level) = heading_level(first) {
        return (
            BlockKind::Heading,
            BlockMetadata {
                level: Some(level),
                ..Default::default()
            },
        );
    }

    if is_table(&lines) {
        return (BlockKind::Table, BlockMetadata::default());
    }

    if lines.iter().all(|l| bullet_item(l).is_some()) {
        let items = lines.iter().filter_map(|l| bullet_item(l)).collect();
        return (
            BlockKind::Bullet,
            BlockMetadata {
                items,
                ..Default::default()
            },
        );
    }

    if lines.iter().all(|l| NUMBERED_MARKER.is_match(l)) {
        let items = lines
            .iter()
            .map(|l| NUMBERED_MARKER.replace(l, "").trim_end().to_string())
            .collect();
        return (
            BlockKind::Numbered,
            BlockMetadata {
                items,
                ..Default::default()
            },
        );
    }

    if lines.iter().all(|l| l.trim_start().starts_with('>')) {
        return (BlockKind::Quote, BlockMetadata::default());
    }

    (BlockKind::Paragraph, BlockMetadata::default())
}

/// Classify a fenced segment as chart or code
fn classify_fence(segment: &str) -> (BlockKind, BlockMetadata) {
    let mut lines = segment.lines();
    let tag = lines
        .next()
        .map(|first| first.trim_start().trim_start_matches('`').trim().to_lowercase())
        .unwrap_or_default();

    if CHART_TAGS.contains(&tag.as_str()) {
        let declaration = fence_body_declaration(segment);
        return (
            BlockKind::Chart,
            BlockMetadata {
                chart_kind: declaration.or(Some(tag)),
                ..Default::default()
            },
        );
    }

    if let Some(declaration) = fence_body_declaration(segment) {
        return (
            BlockKind::Chart,
            BlockMetadata {
                chart_kind: Some(declaration),
                ..Default::default()
            },
        );
    }

    (
        BlockKind::Code,
        BlockMetadata {
            language: if tag.is_empty() { None } else { Some(tag) },
            ..Default::default()
        },
    )
}

/// Diagram declaration opening the fence body, if any
fn fence_body_declaration(segment: &str) -> Option<String> {
    let first_body_line = segment
        .lines()
        .skip(1)
        .map(str::trim)
        .find(|l| !l.is_empty() && !l.starts_with("```"))?
        .to_lowercase();
    CHART_DECLARATIONS
        .iter()
        .find(|d| first_body_line.starts_with(**d))
        .map(|d| d.to_string())
}

/// Contiguous pipe-delimited lines with a separator row
fn is_table(lines: &[&str]) -> bool {
    if lines.len() < 2 {
        return false;
    }
    if !lines.iter().all(|l| l.contains('|')) {
        return false;
    }
    let separator = lines[1];
    separator.contains('-') && TABLE_SEPARATOR.is_match(separator)
}

/// De-markered bullet item text, if the line is a bullet
fn bullet_item(line: &str) -> Option<String> {
    let trimmed = line.trim_start();
    let mut chars = trimmed.chars();
    let marker = chars.next()?;
    if !matches!(marker, '-' | '*' | '+') {
        return None;
    }
    let rest = chars.as_str();
    if !rest.starts_with(' ') {
        return None;
    }
    Some(rest.trim().to_string())
}
