//! Review session: the single owner of all mutable review state
//!
//! A [`Session`] is created from raw markdown, accepts reviewer actions one
//! at a time while [`SessionState::Reviewing`], and closes for good on the
//! first submit or cancel.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{ReviewError, Result};
use crate::model::{
    Annotation, AnnotationId, AnnotationStore, LineRange, Target, TextSelection, Unit,
};
use crate::segment::SegmentationMode;
use crate::submission::{line_preview, BlockItem, Outbox, RangeItem, ReviewItem, SubmissionPayload};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Reviewing,
    Submitted,
    Cancelled,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Reviewing => "reviewing",
            SessionState::Submitted => "submitted",
            SessionState::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionState::Reviewing)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derived counts shown alongside the document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum Summary {
    #[serde(rename_all = "camelCase")]
    Block {
        approved_count: usize,
        rejected_count: usize,
    },
    #[serde(rename_all = "camelCase")]
    Line { comment_count: usize },
}

/// Read-only view handed to presenters after every mutation
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot<'a> {
    pub title: &'a str,
    pub mode: SegmentationMode,
    pub state: SessionState,
    pub units: &'a [Unit],
    pub annotations: Vec<&'a Annotation>,
    pub summary: Summary,
}

impl Snapshot<'_> {
    pub fn annotation_for_unit(&self, unit_id: &str) -> Option<&Annotation> {
        self.annotations
            .iter()
            .copied()
            .find(|a| a.unit_id() == Some(unit_id))
    }

    /// Same default as the session: untouched units are approved
    pub fn is_approved(&self, unit_id: &str) -> bool {
        self.annotation_for_unit(unit_id)
            .map(Annotation::is_approved)
            .unwrap_or(true)
    }
}

pub struct Session {
    id: Uuid,
    title: String,
    mode: SegmentationMode,
    units: Vec<Unit>,
    line_count: usize,
    store: AnnotationStore,
    state: SessionState,
    created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(title: impl Into<String>, content: &str, mode: SegmentationMode) -> Self {
        let title = title.into();
        let units = mode.segment(content);
        let line_count = content.split('\n').count();
        let id = Uuid::new_v4();

        info!(session = %id, title = %title, %mode, units = units.len(), "review session started");

        Self {
            id,
            title,
            mode,
            units,
            line_count,
            store: AnnotationStore::new(),
            state: SessionState::Reviewing,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn mode(&self) -> SegmentationMode {
        self.mode
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn unit(&self, id: &str) -> Option<&Unit> {
        self.units.iter().find(|u| u.id == id)
    }

    /// Physical lines in the source text
    pub fn line_count(&self) -> usize {
        self.line_count
    }

    pub fn annotation(&self, id: AnnotationId) -> Option<&Annotation> {
        self.store.get(id)
    }

    pub fn annotation_for_unit(&self, unit_id: &str) -> Option<&Annotation> {
        self.store.for_unit(unit_id)
    }

    /// All annotations in creation order
    pub fn annotations(&self) -> Vec<&Annotation> {
        self.store.sorted()
    }

    /// Approval of a unit; units never touched count as approved
    pub fn is_approved(&self, unit_id: &str) -> bool {
        self.store
            .for_unit(unit_id)
            .map(Annotation::is_approved)
            .unwrap_or(true)
    }

    pub fn summary(&self) -> Summary {
        match self.mode {
            SegmentationMode::Block => {
                let approved_count = self
                    .units
                    .iter()
                    .filter(|u| self.is_approved(&u.id))
                    .count();
                Summary::Block {
                    approved_count,
                    rejected_count: self.units.len() - approved_count,
                }
            }
            SegmentationMode::Line => Summary::Line {
                comment_count: self.store.len(),
            },
        }
    }

    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            title: &self.title,
            mode: self.mode,
            state: self.state,
            units: &self.units,
            annotations: self.store.sorted(),
            summary: self.summary(),
        }
    }

    /// Flip a block unit's approval, returning the new value
    pub fn toggle_approval(&mut self, unit_id: &str) -> Result<bool> {
        self.ensure_open("toggle approval")?;
        self.ensure_mode(SegmentationMode::Block, "toggle approval")?;
        self.ensure_unit(unit_id)?;

        let annotation = self.store.unit_entry(unit_id);
        let approved = !annotation.is_approved();
        annotation.approved = Some(approved);
        debug!(unit = unit_id, approved, "toggled approval");
        Ok(approved)
    }

    /// Create or replace the comment on a target.
    ///
    /// Unit targets in line mode address the single line with that index.
    pub fn set_comment(&mut self, target: &Target, text: impl Into<String>) -> Result<AnnotationId> {
        self.ensure_open("set comment")?;
        let text = text.into();

        let target = match (self.mode, target) {
            (SegmentationMode::Block, Target::Unit { id }) => {
                self.ensure_unit(id)?;
                let annotation = self.store.unit_entry(id);
                annotation.comment = text;
                debug!(unit = %id, "updated unit comment");
                return Ok(annotation.id);
            }
            (SegmentationMode::Block, _) => {
                return Err(self.mode_mismatch("comment on a line range"));
            }
            (SegmentationMode::Line, Target::Unit { id }) => {
                let line = self.line_index(id)?;
                Target::Lines(LineRange::single(line))
            }
            (SegmentationMode::Line, Target::Lines(range)) => {
                range.validate(self.line_count)?;
                target.clone()
            }
            (SegmentationMode::Line, Target::Selection(selection)) => {
                selection.lines.validate(self.line_count)?;
                target.clone()
            }
        };

        if let Some(annotation) = self.store.find_by_target_mut(&target) {
            annotation.comment = text;
            return Ok(annotation.id);
        }

        let order = self.store.next_order();
        let annotation = match target {
            Target::Lines(range) => Annotation::for_lines(range, text, order),
            Target::Selection(selection) => Annotation::for_selection(selection, text, order),
            Target::Unit { .. } => unreachable!("unit targets are rewritten to line ranges"),
        };
        Ok(self.store.insert(annotation))
    }

    /// Replace the comment of one existing annotation, addressed by id.
    ///
    /// Unlike [`Session::set_comment`] this never matches by target, so two
    /// comments on the same lines stay independent.
    pub fn update_comment(&mut self, id: AnnotationId, text: impl Into<String>) -> Result<()> {
        self.ensure_open("edit comment")?;
        let annotation = self
            .store
            .get_mut(id)
            .ok_or(ReviewError::UnknownAnnotation(id))?;
        annotation.comment = text.into();
        debug!(annotation = %id, "edited comment");
        Ok(())
    }

    pub fn approve_all(&mut self) -> Result<()> {
        self.set_all_approval(true, "approve all")
    }

    pub fn reject_all(&mut self) -> Result<()> {
        self.set_all_approval(false, "reject all")
    }

    /// Attach a new comment to an inclusive line range.
    ///
    /// Always creates a fresh annotation, even for a range already commented.
    pub fn add_range_comment(
        &mut self,
        start_line: i64,
        end_line: i64,
        text: impl Into<String>,
    ) -> Result<AnnotationId> {
        self.ensure_open("add range comment")?;
        self.ensure_mode(SegmentationMode::Line, "add range comment")?;

        let range = LineRange::checked(start_line, end_line, self.line_count).map_err(|err| {
            warn!(start_line, end_line, line_count = self.line_count, "rejected range comment");
            err
        })?;

        let order = self.store.next_order();
        let id = self
            .store
            .insert(Annotation::for_lines(range, text.into(), order));
        debug!(annotation = %id, start = range.start_line, end = range.end_line, "added range comment");
        Ok(id)
    }

    /// Attach a comment to a presenter-reported text selection
    pub fn add_text_selection_comment(
        &mut self,
        selection: TextSelection,
        text: impl Into<String>,
    ) -> Result<AnnotationId> {
        self.ensure_open("add selection comment")?;
        self.ensure_mode(SegmentationMode::Line, "add selection comment")?;
        selection.lines.validate(self.line_count)?;

        let order = self.store.next_order();
        let id = self
            .store
            .insert(Annotation::for_selection(selection, text.into(), order));
        debug!(annotation = %id, "added selection comment");
        Ok(id)
    }

    /// Remove one annotation; returns whether anything was removed
    pub fn delete_annotation(&mut self, id: AnnotationId) -> Result<bool> {
        self.ensure_open("delete annotation")?;
        let removed = self.store.remove(id).is_some();
        debug!(annotation = %id, removed, "delete annotation");
        Ok(removed)
    }

    /// Remove every line comment, returning how many were dropped
    pub fn clear_all(&mut self) -> Result<usize> {
        self.ensure_open("clear comments")?;
        self.ensure_mode(SegmentationMode::Line, "clear comments")?;
        let removed = self.store.clear();
        info!(removed, "cleared all comments");
        Ok(removed)
    }

    /// Close the session and serialize the reviewer's decisions
    pub fn submit(&mut self) -> Result<Outbox> {
        self.ensure_open("submit")?;
        let outbox = Outbox::new(SubmissionPayload::submitted(self.items()))?;
        self.state = SessionState::Submitted;
        info!(
            session = %self.id,
            items = outbox.payload().items.len(),
            elapsed_secs = self.elapsed_secs(),
            "review submitted"
        );
        Ok(outbox)
    }

    pub fn cancel(&mut self) -> Result<Outbox> {
        self.ensure_open("cancel")?;
        let outbox = Outbox::new(SubmissionPayload::cancelled())?;
        self.state = SessionState::Cancelled;
        info!(session = %self.id, elapsed_secs = self.elapsed_secs(), "review cancelled");
        Ok(outbox)
    }

    /// Give up on an undelivered payload after the reviewer chose not to retry.
    ///
    /// A submission that never arrived is recorded as a cancellation: the
    /// session moves from `Submitted` to `Cancelled` and the returned notice
    /// is the `cancelled` payload to attempt once. Abandoning an undelivered
    /// cancellation returns `None` and leaves the state as is.
    pub fn abandon_delivery(&mut self, outbox: &mut Outbox) -> Result<Option<Outbox>> {
        if !self.state.is_terminal() {
            return Err(ReviewError::InvalidStateTransition {
                state: self.state.as_str(),
                action: "abandon delivery",
            });
        }

        let notice = outbox.abandon()?;
        if notice.is_some() {
            self.state = SessionState::Cancelled;
            info!(session = %self.id, "undelivered submission recorded as cancelled");
        }
        Ok(notice)
    }

    fn elapsed_secs(&self) -> i64 {
        (Utc::now() - self.created_at).num_seconds()
    }

    fn items(&self) -> Vec<ReviewItem> {
        match self.mode {
            SegmentationMode::Block => self
                .units
                .iter()
                .map(|unit| {
                    let annotation = self.store.for_unit(&unit.id);
                    ReviewItem::Block(BlockItem {
                        id: unit.id.clone(),
                        text: unit.display_text.clone(),
                        checked: annotation.map(Annotation::is_approved).unwrap_or(true),
                        comment: annotation.map(|a| a.comment.clone()).unwrap_or_default(),
                    })
                })
                .collect(),
            SegmentationMode::Line => self
                .store
                .sorted()
                .into_iter()
                .filter_map(|annotation| {
                    let (range, text, anchor) = match &annotation.target {
                        Target::Lines(range) => (*range, self.lines_text(*range), None),
                        Target::Selection(selection) => (
                            selection.lines,
                            selection.selected_text.clone(),
                            Some(selection.anchor.clone()),
                        ),
                        Target::Unit { .. } => return None,
                    };
                    Some(ReviewItem::Range(RangeItem {
                        id: annotation.id.to_string(),
                        start_line: range.start_line,
                        end_line: range.end_line,
                        line_preview: line_preview(&text),
                        text,
                        checked: true,
                        comment: annotation.comment.clone(),
                        anchor,
                    }))
                })
                .collect(),
        }
    }

    fn lines_text(&self, range: LineRange) -> String {
        self.units[range.start_line..=range.end_line]
            .iter()
            .map(|u| u.raw_source.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn set_all_approval(&mut self, approved: bool, action: &'static str) -> Result<()> {
        self.ensure_open(action)?;
        self.ensure_mode(SegmentationMode::Block, action)?;
        for unit in &self.units {
            self.store.unit_entry(&unit.id).approved = Some(approved);
        }
        debug!(approved, units = self.units.len(), "set approval on all units");
        Ok(())
    }

    fn ensure_open(&self, action: &'static str) -> Result<()> {
        if self.state.is_terminal() {
            warn!(state = self.state.as_str(), action, "rejected action on closed session");
            return Err(ReviewError::InvalidStateTransition {
                state: self.state.as_str(),
                action,
            });
        }
        Ok(())
    }

    fn ensure_mode(&self, required: SegmentationMode, action: &'static str) -> Result<()> {
        if self.mode != required {
            return Err(self.mode_mismatch(action));
        }
        Ok(())
    }

    fn mode_mismatch(&self, action: &'static str) -> ReviewError {
        ReviewError::ModeMismatch {
            action,
            mode: self.mode.as_str(),
        }
    }

    fn ensure_unit(&self, unit_id: &str) -> Result<()> {
        if self.unit(unit_id).is_none() {
            return Err(ReviewError::UnknownUnit(unit_id.to_string()));
        }
        Ok(())
    }

    fn line_index(&self, unit_id: &str) -> Result<usize> {
        unit_id
            .parse::<usize>()
            .ok()
            .filter(|line| *line < self.line_count)
            .ok_or_else(|| ReviewError::UnknownUnit(unit_id.to_string()))
    }
}
