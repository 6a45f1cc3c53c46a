use serde_json::json;

use crate::cursor::DocumentCursor;
use crate::error::ReviewError;
use crate::model::{Annotation, AnnotationId, LineRange, SelectionAnchor, Target, TextSelection, Unit};
use crate::segment::SegmentationMode;
use crate::session::Session;
use crate::submission::{DeliveryState, Outbox, SubmissionPayload, Transport};

/// Application mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Visual,
    Input,
    Help,
    /// Delivery failed; waiting for retry or abandon
    DeliveryFailed,
    Finished,
}

/// Focus area
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Document,
    Sidebar,
}

/// How a visual selection is turned into a comment target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionKind {
    Lines,
    Text,
}

/// What the text being typed will be attached to
#[derive(Debug, Clone, PartialEq)]
pub enum InputTarget {
    /// Replace the comment on a target, creating it if needed
    Comment(Target),
    /// Edit one existing annotation
    Edit(AnnotationId),
    NewRange(LineRange),
    NewSelection(TextSelection),
}

/// Platform-agnostic interactive state around one review session
pub struct App {
    pub session: Session,
    pub cursor: DocumentCursor,
    pub mode: Mode,
    pub focus: Focus,
    pub running: bool,

    /// Block mode: index into the unit list
    pub selected_unit: usize,

    // Selection state
    pub selection_start: Option<(usize, usize)>,
    pub selection_kind: SelectionKind,

    // Sidebar state
    pub sidebar_selected: usize,

    // Input state
    pub input_buffer: String,
    pub input_target: Option<InputTarget>,

    pub status_message: Option<String>,

    outbox: Option<Outbox>,
}

impl App {
    pub fn new(session: Session, content: &str) -> Self {
        Self {
            session,
            cursor: DocumentCursor::new(content),
            mode: Mode::Normal,
            focus: Focus::Document,
            running: true,

            selected_unit: 0,

            selection_start: None,
            selection_kind: SelectionKind::Lines,

            sidebar_selected: 0,

            input_buffer: String::new(),
            input_target: None,

            status_message: None,

            outbox: None,
        }
    }

    pub fn is_block_mode(&self) -> bool {
        self.session.mode() == SegmentationMode::Block
    }

    pub fn title(&self) -> &str {
        self.session.title()
    }

    pub fn current_unit(&self) -> Option<&Unit> {
        self.session.units().get(self.selected_unit)
    }

    /// Payload of the finished session, once submit or cancel happened
    pub fn outcome(&self) -> Option<&SubmissionPayload> {
        self.outbox.as_ref().map(Outbox::payload)
    }

    pub fn outbox(&self) -> Option<&Outbox> {
        self.outbox.as_ref()
    }

    // Navigation

    pub fn move_down(&mut self) {
        if self.is_block_mode() {
            if self.selected_unit + 1 < self.session.units().len() {
                self.selected_unit += 1;
            }
        } else {
            self.cursor.move_down();
        }
    }

    pub fn move_up(&mut self) {
        if self.is_block_mode() {
            self.selected_unit = self.selected_unit.saturating_sub(1);
        } else {
            self.cursor.move_up();
        }
    }

    pub fn move_to_top(&mut self) {
        self.selected_unit = 0;
        self.cursor.move_to_top();
    }

    pub fn move_to_bottom(&mut self) {
        self.selected_unit = self.session.units().len().saturating_sub(1);
        self.cursor.move_to_bottom();
    }

    /// Navigate to next comment in the sidebar
    pub fn next_annotation(&mut self) {
        let count = self.session.annotations().len();
        if count > 0 {
            self.sidebar_selected = (self.sidebar_selected + 1) % count;
            self.jump_to_selected_annotation();
        }
    }

    /// Navigate to previous comment in the sidebar
    pub fn prev_annotation(&mut self) {
        let count = self.session.annotations().len();
        if count > 0 {
            self.sidebar_selected = if self.sidebar_selected == 0 {
                count - 1
            } else {
                self.sidebar_selected - 1
            };
            self.jump_to_selected_annotation();
        }
    }

    fn jump_to_selected_annotation(&mut self) {
        let start = self
            .selected_annotation()
            .and_then(Annotation::line_range)
            .map(|range| range.start_line);
        if let Some(row) = start {
            self.cursor.row = row;
            self.cursor.col = 0;
        }
    }

    pub fn selected_annotation(&self) -> Option<&Annotation> {
        self.session
            .annotations()
            .get(self.sidebar_selected)
            .copied()
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Document => Focus::Sidebar,
            Focus::Sidebar => Focus::Document,
        };
    }

    // Block review

    pub fn toggle_current(&mut self) {
        let Some(id) = self.current_unit().map(|u| u.id.clone()) else {
            return;
        };
        match self.session.toggle_approval(&id) {
            Ok(true) => self.set_status(&format!("Approved {}", id)),
            Ok(false) => self.set_status(&format!("Rejected {}", id)),
            Err(e) => self.report(e),
        }
    }

    pub fn approve_all(&mut self) {
        match self.session.approve_all() {
            Ok(()) => self.set_status("Approved all blocks"),
            Err(e) => self.report(e),
        }
    }

    pub fn reject_all(&mut self) {
        match self.session.reject_all() {
            Ok(()) => self.set_status("Rejected all blocks"),
            Err(e) => self.report(e),
        }
    }

    // Comments

    /// Open the comment editor for the unit or line under the cursor
    pub fn begin_comment(&mut self) {
        if self.is_block_mode() {
            let Some(id) = self.current_unit().map(|u| u.id.clone()) else {
                return;
            };
            let existing = self
                .session
                .annotation_for_unit(&id)
                .map(|a| a.comment.clone())
                .unwrap_or_default();
            self.open_input(InputTarget::Comment(Target::unit(id)), existing);
        } else {
            let row = self.cursor.row;
            self.open_input(InputTarget::NewRange(LineRange::single(row)), String::new());
        }
    }

    /// Re-open the selected sidebar comment for editing
    pub fn edit_selected_annotation(&mut self) {
        let Some((id, comment)) = self
            .selected_annotation()
            .map(|a| (a.id, a.comment.clone()))
        else {
            return;
        };
        self.open_input(InputTarget::Edit(id), comment);
    }

    fn open_input(&mut self, target: InputTarget, prefill: String) {
        self.input_buffer = prefill;
        self.input_target = Some(target);
        self.mode = Mode::Input;
    }

    pub fn cancel_input(&mut self) {
        self.input_buffer.clear();
        self.input_target = None;
        self.mode = Mode::Normal;
    }

    /// Commit the typed comment to its target
    pub fn complete_input(&mut self) -> bool {
        let Some(target) = self.input_target.take() else {
            self.mode = Mode::Normal;
            return false;
        };
        let text = std::mem::take(&mut self.input_buffer);
        self.mode = Mode::Normal;

        let result = match target {
            InputTarget::Comment(target) => self.session.set_comment(&target, text),
            InputTarget::Edit(id) => self.session.update_comment(id, text).map(|()| id),
            InputTarget::NewRange(range) => self.session.add_range_comment(
                range.start_line as i64,
                range.end_line as i64,
                text,
            ),
            InputTarget::NewSelection(selection) => {
                self.session.add_text_selection_comment(selection, text)
            }
        };

        match result {
            Ok(_) => {
                self.set_status("Comment saved");
                true
            }
            Err(e) => {
                self.report(e);
                false
            }
        }
    }

    pub fn enter_visual_mode(&mut self, kind: SelectionKind) {
        if self.is_block_mode() {
            return;
        }
        self.mode = Mode::Visual;
        self.selection_kind = kind;
        self.selection_start = Some(self.cursor.position());
    }

    pub fn exit_visual_mode(&mut self) {
        self.mode = Mode::Normal;
        self.selection_start = None;
    }

    /// Lines covered by the active selection, for highlighting
    pub fn selected_lines(&self) -> Option<LineRange> {
        if self.mode != Mode::Visual {
            return None;
        }
        let start = self.selection_start?;
        Some(LineRange::spanning(start.0, self.cursor.row))
    }

    /// Turn the visual selection into a pending comment
    pub fn start_selection_comment(&mut self) {
        let Some(start) = self.selection_start else {
            return;
        };
        let end = self.cursor.position();
        self.exit_visual_mode();

        let lines = LineRange::spanning(start.0, end.0);
        match self.selection_kind {
            SelectionKind::Lines => self.open_input(InputTarget::NewRange(lines), String::new()),
            SelectionKind::Text => {
                let selected_text = self.cursor.text_between(start, end);
                if selected_text.is_empty() {
                    self.set_status("Empty selection");
                    return;
                }
                let (from, to) = if start <= end { (start, end) } else { (end, start) };
                let anchor = SelectionAnchor::new(json!({
                    "start": { "line": from.0, "column": from.1 },
                    "end": { "line": to.0, "column": to.1 },
                }));
                let selection = TextSelection {
                    anchor,
                    selected_text,
                    lines,
                };
                self.open_input(InputTarget::NewSelection(selection), String::new());
            }
        }
    }

    /// Delete selected comment
    pub fn delete_selected_annotation(&mut self) -> bool {
        let id = match self.selected_annotation() {
            Some(a) => a.id,
            None => return false,
        };

        match self.session.delete_annotation(id) {
            Ok(true) => {
                let count = self.session.annotations().len();
                if self.sidebar_selected >= count && count > 0 {
                    self.sidebar_selected = count - 1;
                }
                self.set_status("Comment deleted");
                true
            }
            Ok(false) => false,
            Err(e) => {
                self.report(e);
                false
            }
        }
    }

    pub fn clear_all(&mut self) {
        match self.session.clear_all() {
            Ok(removed) => {
                self.sidebar_selected = 0;
                self.set_status(&format!("Cleared {} comments", removed));
            }
            Err(e) => self.report(e),
        }
    }

    // Terminal actions

    pub fn submit(&mut self, transport: &dyn Transport) {
        match self.session.submit() {
            Ok(outbox) => {
                self.outbox = Some(outbox);
                self.deliver(transport);
            }
            Err(e) => self.report(e),
        }
    }

    pub fn cancel(&mut self, transport: &dyn Transport) {
        match self.session.cancel() {
            Ok(outbox) => {
                self.outbox = Some(outbox);
                // a cancellation nobody heard still ends the session
                if self.deliver(transport).is_err() {
                    self.abandon(transport);
                }
            }
            Err(e) => self.report(e),
        }
    }

    /// Re-send the already serialized payload
    pub fn retry(&mut self, transport: &dyn Transport) {
        let _ = self.deliver(transport);
    }

    /// Give up after a failed delivery and close the session.
    ///
    /// An abandoned submission ends as a cancellation, so the notice
    /// replaces it as the outcome.
    pub fn abandon(&mut self, transport: &dyn Transport) {
        if let Some(outbox) = self.outbox.as_mut() {
            if outbox.state() != DeliveryState::Delivered {
                match self.session.abandon_delivery(outbox) {
                    Ok(Some(mut notice)) => {
                        // best effort only
                        let _ = notice.send(transport);
                        self.outbox = Some(notice);
                    }
                    Ok(None) => {}
                    Err(e) => self.report(e),
                }
            }
        }
        self.finish();
    }

    fn deliver(&mut self, transport: &dyn Transport) -> Result<(), ReviewError> {
        let Some(outbox) = self.outbox.as_mut() else {
            return Ok(());
        };
        match outbox.send(transport) {
            Ok(()) => {
                self.finish();
                Ok(())
            }
            Err(e) => {
                self.mode = Mode::DeliveryFailed;
                self.set_status(&format!("{} (r retry, a abandon)", e));
                Err(e)
            }
        }
    }

    fn finish(&mut self) {
        self.mode = Mode::Finished;
        self.running = false;
    }

    // Status

    pub fn set_status(&mut self, msg: &str) {
        self.status_message = Some(msg.to_string());
    }

    pub fn clear_status(&mut self) {
        self.status_message = None;
    }

    fn report(&mut self, err: ReviewError) {
        tracing::warn!(error = %err, "review action rejected");
        self.set_status(&format!("Error: {}", err));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder {
        fail: bool,
        bodies: RefCell<Vec<String>>,
    }

    impl Transport for Recorder {
        fn deliver(&self, body: &str) -> Result<()> {
            self.bodies.borrow_mut().push(body.to_string());
            if self.fail {
                Err(ReviewError::SubmissionTransportFailure("offline".into()))
            } else {
                Ok(())
            }
        }
    }

    const DOC: &str = "# Plan\n\nStep one.\n\n- a\n- b";

    fn block_app() -> App {
        App::new(Session::new("Plan", DOC, SegmentationMode::Block), DOC)
    }

    fn line_app() -> App {
        App::new(Session::new("Plan", DOC, SegmentationMode::Line), DOC)
    }

    #[test]
    fn test_block_comment_flow() {
        let mut app = block_app();
        app.move_down();
        app.begin_comment();
        assert_eq!(app.mode, Mode::Input);
        app.input_buffer.push_str("needs detail");
        assert!(app.complete_input());

        let ann = app.session.annotation_for_unit("block-1").unwrap();
        assert_eq!(ann.comment, "needs detail");

        // reopening prefills the existing comment
        app.begin_comment();
        assert_eq!(app.input_buffer, "needs detail");
        app.cancel_input();
        assert_eq!(app.mode, Mode::Normal);
    }

    #[test]
    fn test_line_selection_comment() {
        let mut app = line_app();
        app.move_down();
        app.move_down();
        app.enter_visual_mode(SelectionKind::Lines);
        app.move_down();
        app.move_down();
        assert_eq!(app.selected_lines(), Some(LineRange::spanning(2, 4)));

        app.start_selection_comment();
        app.input_buffer.push_str("restructure");
        assert!(app.complete_input());

        let ann = app.selected_annotation().unwrap();
        assert_eq!(ann.line_range(), Some(LineRange::spanning(2, 4)));
    }

    #[test]
    fn test_text_selection_comment_carries_anchor() {
        let mut app = line_app();
        app.move_down();
        app.move_down();
        app.enter_visual_mode(SelectionKind::Text);
        for _ in 0..4 {
            app.cursor.move_right();
        }
        app.start_selection_comment();
        match &app.input_target {
            Some(InputTarget::NewSelection(sel)) => {
                assert_eq!(sel.selected_text, "Step");
                assert_eq!(sel.lines, LineRange::single(2));
                assert_eq!(sel.anchor.as_value()["end"]["column"], 4);
            }
            other => panic!("unexpected input target {:?}", other),
        }
    }

    #[test]
    fn test_editing_second_comment_on_same_line() {
        let mut app = line_app();
        for text in ["first", "second"] {
            app.begin_comment();
            app.input_buffer.push_str(text);
            assert!(app.complete_input());
        }

        app.next_annotation();
        app.edit_selected_annotation();
        assert_eq!(app.input_buffer, "second");
        app.input_buffer.push_str(" edited");
        assert!(app.complete_input());

        let comments: Vec<_> = app
            .session
            .annotations()
            .iter()
            .map(|a| a.comment.clone())
            .collect();
        assert_eq!(comments, vec!["first", "second edited"]);
    }

    #[test]
    fn test_submit_delivers_once_and_finishes() {
        let mut app = block_app();
        app.toggle_current();
        let transport = Recorder::default();
        app.submit(&transport);

        assert!(!app.running);
        assert_eq!(app.mode, Mode::Finished);
        assert_eq!(transport.bodies.borrow().len(), 1);

        app.submit(&transport);
        assert_eq!(transport.bodies.borrow().len(), 1);
        assert!(app.status_message.as_deref().unwrap().contains("cannot submit"));
    }

    #[test]
    fn test_failed_delivery_can_be_retried_or_abandoned() {
        let mut app = block_app();
        let offline = Recorder {
            fail: true,
            ..Default::default()
        };
        app.submit(&offline);
        assert_eq!(app.mode, Mode::DeliveryFailed);
        assert!(app.running);

        // editing stays closed while the payload is pending
        app.toggle_current();
        assert!(app.status_message.as_deref().unwrap().starts_with("Error"));

        app.retry(&offline);
        assert_eq!(offline.bodies.borrow().len(), 2);

        app.abandon(&offline);
        assert!(!app.running);
        let bodies = offline.bodies.borrow();
        assert_eq!(bodies.len(), 3);
        assert!(bodies[2].contains("cancelled"));

        // the recorded outcome matches what was last sent
        assert_eq!(app.session.state(), crate::session::SessionState::Cancelled);
        let outcome = app.outcome().unwrap();
        assert_eq!(outcome.status, crate::submission::SubmissionStatus::Cancelled);
        assert!(outcome.items.is_empty());
    }

    #[test]
    fn test_cancel_ends_even_when_offline() {
        let mut app = line_app();
        let offline = Recorder {
            fail: true,
            ..Default::default()
        };
        app.cancel(&offline);
        assert!(!app.running);
        assert_eq!(
            app.outcome().map(|p| p.status),
            Some(crate::submission::SubmissionStatus::Cancelled)
        );
    }
}
