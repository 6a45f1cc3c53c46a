//! mdreview core - markdown review sessions
//!
//! Segments markdown into reviewable units, tracks reviewer decisions
//! against them and produces the final decision payload. Nothing in this
//! crate touches the terminal or the network; presenters and transports
//! plug in from outside.

pub mod app;
pub mod cursor;
pub mod error;
pub mod export;
pub mod model;
pub mod segment;
pub mod session;
pub mod submission;

pub use app::{App, Focus, InputTarget, Mode, SelectionKind};
pub use cursor::DocumentCursor;
pub use error::{Result, ReviewError};
pub use export::{render_feedback, to_json};
pub use model::{
    Annotation, AnnotationId, AnnotationStore, LineRange, SelectionAnchor, Target, TextSelection,
    Unit, UnitKind,
};
pub use segment::{segment_blocks, segment_lines, SegmentationMode};
pub use session::{Session, SessionState, Snapshot, Summary};
pub use submission::{
    BlockItem, DeliveryState, Outbox, RangeItem, ReviewItem, SubmissionPayload, SubmissionStatus,
    Transport,
};
