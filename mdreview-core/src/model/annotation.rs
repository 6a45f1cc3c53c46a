use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ReviewError, Result};

pub type AnnotationId = Uuid;

/// Inclusive range of zero-based physical lines
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LineRange {
    pub start_line: usize,
    pub end_line: usize,
}

impl LineRange {
    /// Validate raw presenter input against the document's line count.
    ///
    /// Accepts signed values so that out-of-band input such as `-1` is
    /// rejected rather than wrapped.
    pub fn checked(start: i64, end: i64, line_count: usize) -> Result<Self> {
        let invalid = || ReviewError::InvalidRange {
            start,
            end,
            line_count,
        };

        if start < 0 || end < start {
            return Err(invalid());
        }
        let start_line = usize::try_from(start).map_err(|_| invalid())?;
        let end_line = usize::try_from(end).map_err(|_| invalid())?;
        if end_line >= line_count {
            return Err(invalid());
        }

        Ok(Self {
            start_line,
            end_line,
        })
    }

    pub fn single(line: usize) -> Self {
        Self {
            start_line: line,
            end_line: line,
        }
    }

    /// Build a range from two endpoints in either order
    pub fn spanning(a: usize, b: usize) -> Self {
        Self {
            start_line: a.min(b),
            end_line: a.max(b),
        }
    }

    /// Re-check a range that may have been built without validation
    pub fn validate(&self, line_count: usize) -> Result<()> {
        if self.start_line <= self.end_line && self.end_line < line_count {
            Ok(())
        } else {
            Err(ReviewError::InvalidRange {
                start: i64::try_from(self.start_line).unwrap_or(i64::MAX),
                end: i64::try_from(self.end_line).unwrap_or(i64::MAX),
                line_count,
            })
        }
    }

    pub fn contains(&self, line: usize) -> bool {
        line >= self.start_line && line <= self.end_line
    }

    /// Number of lines covered
    pub fn span(&self) -> usize {
        self.end_line - self.start_line + 1
    }
}

/// Opaque token a presenter uses to re-locate a text selection.
///
/// The core stores and echoes it back; it never looks inside.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct SelectionAnchor(serde_json::Value);

impl SelectionAnchor {
    pub fn new(token: serde_json::Value) -> Self {
        Self(token)
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }
}

/// A sub-line text selection reported by the presenter
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TextSelection {
    pub anchor: SelectionAnchor,
    pub selected_text: String,
    /// Lines the selection touches, as reported by the presenter
    #[serde(flatten)]
    pub lines: LineRange,
}

/// What an annotation is attached to
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Target {
    Unit { id: String },
    Lines(LineRange),
    Selection(TextSelection),
}

impl Target {
    pub fn unit(id: impl Into<String>) -> Self {
        Target::Unit { id: id.into() }
    }

    pub fn lines(range: LineRange) -> Self {
        Target::Lines(range)
    }
}

/// Reviewer judgment attached to a unit or a range of lines
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub id: AnnotationId,
    pub target: Target,
    /// Only tracked for unit targets; line comments carry no approval
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved: Option<bool>,
    #[serde(default)]
    pub comment: String,
    pub created_order: u64,
}

impl Annotation {
    /// Default annotation for a block unit: approved, no comment
    pub fn for_unit(unit_id: impl Into<String>, created_order: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            target: Target::unit(unit_id),
            approved: Some(true),
            comment: String::new(),
            created_order,
        }
    }

    pub fn for_lines(range: LineRange, comment: String, created_order: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            target: Target::Lines(range),
            approved: None,
            comment,
            created_order,
        }
    }

    pub fn for_selection(selection: TextSelection, comment: String, created_order: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            target: Target::Selection(selection),
            approved: None,
            comment,
            created_order,
        }
    }

    pub fn is_approved(&self) -> bool {
        self.approved.unwrap_or(true)
    }

    pub fn unit_id(&self) -> Option<&str> {
        match &self.target {
            Target::Unit { id } => Some(id),
            _ => None,
        }
    }

    pub fn line_range(&self) -> Option<LineRange> {
        match &self.target {
            Target::Unit { .. } => None,
            Target::Lines(range) => Some(*range),
            Target::Selection(selection) => Some(selection.lines),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_range_bounds() {
        assert!(LineRange::checked(0, 0, 1).is_ok());
        assert!(LineRange::checked(2, 4, 5).is_ok());

        assert!(matches!(
            LineRange::checked(5, 2, 10),
            Err(ReviewError::InvalidRange { start: 5, end: 2, .. })
        ));
        assert!(LineRange::checked(-1, 2, 10).is_err());
        assert!(LineRange::checked(0, 10, 10).is_err());
        assert!(LineRange::checked(0, 0, 0).is_err());
    }

    #[test]
    fn test_spanning_orders_endpoints() {
        let range = LineRange::spanning(7, 3);
        assert_eq!(range.start_line, 3);
        assert_eq!(range.end_line, 7);
        assert_eq!(range.span(), 5);
        assert!(range.contains(3));
        assert!(range.contains(7));
        assert!(!range.contains(8));
    }

    #[test]
    fn test_line_range_serializes_camel_case() {
        let json = serde_json::to_string(&LineRange::single(4)).unwrap();
        assert_eq!(json, r#"{"startLine":4,"endLine":4}"#);
    }

    #[test]
    fn test_unit_annotation_defaults_to_approved() {
        let ann = Annotation::for_unit("block-0", 0);
        assert!(ann.is_approved());
        assert!(ann.comment.is_empty());
        assert_eq!(ann.unit_id(), Some("block-0"));
        assert_eq!(ann.line_range(), None);
    }

    #[test]
    fn test_selection_anchor_is_echoed_verbatim() {
        let token = serde_json::json!({"start": {"line": 1, "column": 3}, "opaque": [1, 2]});
        let selection = TextSelection {
            anchor: SelectionAnchor::new(token.clone()),
            selected_text: "abc".to_string(),
            lines: LineRange::single(1),
        };
        let ann = Annotation::for_selection(selection, "note".to_string(), 3);

        assert_eq!(ann.line_range(), Some(LineRange::single(1)));
        match &ann.target {
            Target::Selection(sel) => assert_eq!(sel.anchor.as_value(), &token),
            other => panic!("unexpected target {:?}", other),
        }
    }
}
