use serde::{Deserialize, Serialize};

/// What kind of markdown construct a unit was cut from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum UnitKind {
    Heading,
    ListItem,
    Paragraph,
    Code,
    Line,
}

impl UnitKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitKind::Heading => "heading",
            UnitKind::ListItem => "list-item",
            UnitKind::Paragraph => "paragraph",
            UnitKind::Code => "code",
            UnitKind::Line => "line",
        }
    }
}

/// One independently reviewable piece of the source text.
///
/// Units are produced once by the segmenter and never change afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Unit {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: UnitKind,
    #[serde(rename = "text")]
    pub display_text: String,
    /// Heading depth (1-6); zero for every other kind
    #[serde(default)]
    pub level: u8,
    #[serde(rename = "raw")]
    pub raw_source: String,
}

impl Unit {
    pub fn new(
        id: impl Into<String>,
        kind: UnitKind,
        display_text: impl Into<String>,
        raw_source: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            display_text: display_text.into(),
            level: 0,
            raw_source: raw_source.into(),
        }
    }

    pub fn heading(
        id: impl Into<String>,
        level: u8,
        display_text: impl Into<String>,
        raw_source: impl Into<String>,
    ) -> Self {
        let mut unit = Self::new(id, UnitKind::Heading, display_text, raw_source);
        unit.level = level;
        unit
    }

    /// A verbatim physical line; the id is its zero-based index
    pub fn line(index: usize, content: &str) -> Self {
        Self::new(index.to_string(), UnitKind::Line, content, content)
    }

    /// Whether the raw markdown carries more than what `display_text` shows
    pub fn has_hidden_source(&self) -> bool {
        self.raw_source != self.display_text
    }
}
