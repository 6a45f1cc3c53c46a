//! End-to-end review session behaviour.

use std::cell::RefCell;

use mdreview_core::{
    LineRange, ReviewError, ReviewItem, SegmentationMode, Session, SessionState,
    SubmissionStatus, Summary, Target, Transport,
};

const DOC: &str = "# Title\n\nSome text here.\n\n- item one\n- item two\n";
const THREE_BLOCKS: &str = "# Heading\n\nBody paragraph.\n\n- only item";

#[derive(Default)]
struct Collector {
    bodies: RefCell<Vec<String>>,
}

impl Transport for Collector {
    fn deliver(&self, body: &str) -> mdreview_core::Result<()> {
        self.bodies.borrow_mut().push(body.to_string());
        Ok(())
    }
}

fn counts(session: &Session) -> (usize, usize) {
    match session.summary() {
        Summary::Block {
            approved_count,
            rejected_count,
        } => (approved_count, rejected_count),
        other => panic!("expected block summary, got {:?}", other),
    }
}

#[test]
fn fresh_block_session_is_all_approved() {
    let session = Session::new("t", DOC, SegmentationMode::Block);
    assert_eq!(counts(&session), (session.units().len(), 0));
    assert_eq!(session.state(), SessionState::Reviewing);
}

#[test]
fn bulk_actions_override_toggle_history() {
    let mut session = Session::new("t", DOC, SegmentationMode::Block);
    let total = session.units().len();

    session.toggle_approval("block-0").unwrap();
    session.toggle_approval("block-3").unwrap();
    session.approve_all().unwrap();
    session.reject_all().unwrap();
    assert_eq!(counts(&session), (0, total));

    session.toggle_approval("block-2").unwrap();
    session.reject_all().unwrap();
    session.approve_all().unwrap();
    assert_eq!(counts(&session), (total, 0));
}

#[test]
fn invalid_ranges_do_not_mutate() {
    let text = "0\n1\n2\n3\n4\n5\n6";
    let mut session = Session::new("t", text, SegmentationMode::Line);
    let line_count = session.line_count() as i64;
    assert_eq!(line_count, 7);

    for (start, end) in [(5, 2), (-1, 3), (0, line_count), (-3, -1)] {
        let err = session.add_range_comment(start, end, "nope").unwrap_err();
        assert!(matches!(err, ReviewError::InvalidRange { .. }), "{:?}", err);
    }
    assert!(session.annotations().is_empty());
    assert_eq!(session.summary(), Summary::Line { comment_count: 0 });

    session.add_range_comment(0, line_count - 1, "whole doc").unwrap();
    assert_eq!(session.summary(), Summary::Line { comment_count: 1 });
}

#[test]
fn one_rejection_out_of_three() {
    let mut session = Session::new("t", THREE_BLOCKS, SegmentationMode::Block);
    assert_eq!(session.units().len(), 3);
    session.toggle_approval("block-1").unwrap();

    let outbox = session.submit().unwrap();
    let payload = outbox.payload();
    assert_eq!(payload.status, SubmissionStatus::Submitted);
    assert!(payload.timestamp.is_some());

    let checked: Vec<bool> = payload
        .items
        .iter()
        .map(|item| match item {
            ReviewItem::Block(block) => block.checked,
            other => panic!("unexpected {:?}", other),
        })
        .collect();
    assert_eq!(checked, vec![true, false, true]);
}

#[test]
fn closed_session_rejects_mutation() {
    let mut session = Session::new("t", THREE_BLOCKS, SegmentationMode::Block);
    session.set_comment(&Target::unit("block-0"), "keep").unwrap();
    let outbox = session.submit().unwrap();
    let body = outbox.body().to_string();

    assert!(matches!(
        session.set_comment(&Target::unit("block-0"), "changed"),
        Err(ReviewError::InvalidStateTransition { .. })
    ));
    assert!(matches!(
        session.toggle_approval("block-0"),
        Err(ReviewError::InvalidStateTransition { .. })
    ));
    assert!(session.submit().is_err());
    assert!(session.cancel().is_err());

    assert_eq!(outbox.body(), body);
    assert_eq!(session.annotation_for_unit("block-0").unwrap().comment, "keep");
}

#[test]
fn cancelled_session_is_closed_too() {
    let mut session = Session::new("t", "a\nb", SegmentationMode::Line);
    let outbox = session.cancel().unwrap();
    assert_eq!(outbox.body(), r#"{"status":"cancelled","items":[]}"#);
    assert_eq!(session.state(), SessionState::Cancelled);
    assert!(matches!(
        session.add_range_comment(0, 0, "late"),
        Err(ReviewError::InvalidStateTransition { .. })
    ));
}

#[test]
fn deleting_missing_annotation_is_noop() {
    let mut session = Session::new("t", "a\nb\nc", SegmentationMode::Line);
    let id = session.add_range_comment(0, 1, "x").unwrap();
    let before = session.summary();

    assert!(!session.delete_annotation(uuid_like_missing()).unwrap());
    assert_eq!(session.summary(), before);

    assert!(session.delete_annotation(id).unwrap());
    assert!(!session.delete_annotation(id).unwrap());
    assert_eq!(session.summary(), Summary::Line { comment_count: 0 });
}

fn uuid_like_missing() -> mdreview_core::AnnotationId {
    "00000000-0000-4000-8000-000000000000".parse().unwrap()
}

#[test]
fn line_payload_orders_by_creation_and_echoes_anchor() {
    let mut session = Session::new("t", "one\ntwo\nthree\nfour", SegmentationMode::Line);
    session.add_range_comment(3, 3, "last line first").unwrap();
    let selection = mdreview_core::TextSelection {
        anchor: mdreview_core::SelectionAnchor::new(serde_json::json!({"node": "p:3", "offset": [1, 4]})),
        selected_text: "wo\nthr".to_string(),
        lines: LineRange::spanning(1, 2),
    };
    session.add_text_selection_comment(selection, "odd split").unwrap();

    let transport = Collector::default();
    let mut outbox = session.submit().unwrap();
    outbox.send(&transport).unwrap();

    let sent: serde_json::Value = serde_json::from_str(&transport.bodies.borrow()[0]).unwrap();
    let items = sent["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["startLine"], 3);
    assert_eq!(items[0]["text"], "four");
    assert_eq!(items[0]["comment"], "last line first");
    assert_eq!(items[1]["text"], "wo\nthr");
    assert_eq!(items[1]["linePreview"], "wo");
    assert_eq!(items[1]["anchor"]["node"], "p:3");
    assert!(items.iter().all(|item| item["checked"] == true));
}

#[test]
fn selection_outside_document_is_rejected() {
    let mut session = Session::new("t", "one\ntwo", SegmentationMode::Line);
    let selection = mdreview_core::TextSelection {
        anchor: mdreview_core::SelectionAnchor::new(serde_json::json!("opaque")),
        selected_text: "x".to_string(),
        lines: LineRange::spanning(1, 5),
    };
    assert!(matches!(
        session.add_text_selection_comment(selection, "x"),
        Err(ReviewError::InvalidRange { .. })
    ));
    assert!(session.annotations().is_empty());
}
