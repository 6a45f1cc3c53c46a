//! Final decision payload and its one-shot delivery
//!
//! A session is turned into a [`SubmissionPayload`] exactly once. The
//! payload is serialized immediately into an [`Outbox`]; retries resend the
//! stored body and never rebuild it from session state.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ReviewError, Result};
use crate::model::SelectionAnchor;

const PREVIEW_CHARS: usize = 60;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Submitted,
    Cancelled,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Submitted => "submitted",
            SubmissionStatus::Cancelled => "cancelled",
        }
    }
}

/// Block-mode decision for one unit
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlockItem {
    pub id: String,
    pub text: String,
    pub checked: bool,
    pub comment: String,
}

/// Line-mode comment on a range or text selection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RangeItem {
    pub id: String,
    pub start_line: usize,
    pub end_line: usize,
    pub text: String,
    pub line_preview: String,
    pub checked: bool,
    pub comment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor: Option<SelectionAnchor>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ReviewItem {
    // Range first: a range item also carries every block item field
    Range(RangeItem),
    Block(BlockItem),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubmissionPayload {
    pub status: SubmissionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    pub items: Vec<ReviewItem>,
}

impl SubmissionPayload {
    pub fn submitted(items: Vec<ReviewItem>) -> Self {
        Self {
            status: SubmissionStatus::Submitted,
            timestamp: Some(Utc::now()),
            items,
        }
    }

    pub fn cancelled() -> Self {
        Self {
            status: SubmissionStatus::Cancelled,
            timestamp: None,
            items: Vec::new(),
        }
    }

    /// Items that were rejected or commented on
    pub fn flagged(&self) -> impl Iterator<Item = &ReviewItem> {
        self.items.iter().filter(|item| match item {
            ReviewItem::Block(block) => !block.checked || !block.comment.is_empty(),
            ReviewItem::Range(_) => true,
        })
    }
}

/// First covered line, trimmed and shortened for list display
pub fn line_preview(text: &str) -> String {
    let first = text.lines().next().unwrap_or("").trim();
    if first.chars().count() > PREVIEW_CHARS {
        let cut: String = first.chars().take(PREVIEW_CHARS).collect();
        format!("{}...", cut)
    } else {
        first.to_string()
    }
}

/// Outbound channel to the collaborator that receives the payload
pub trait Transport {
    /// Deliver a serialized JSON body. Any error is reported as
    /// [`ReviewError::SubmissionTransportFailure`].
    fn deliver(&self, body: &str) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryState {
    Pending,
    Failed,
    Delivered,
    Abandoned,
}

impl DeliveryState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryState::Pending => "pending",
            DeliveryState::Failed => "failed",
            DeliveryState::Delivered => "delivered",
            DeliveryState::Abandoned => "abandoned",
        }
    }
}

impl fmt::Display for DeliveryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A serialized payload waiting to be delivered
#[derive(Debug, Clone)]
pub struct Outbox {
    payload: SubmissionPayload,
    body: String,
    state: DeliveryState,
    attempts: u32,
    last_error: Option<String>,
}

impl Outbox {
    pub fn new(payload: SubmissionPayload) -> Result<Self> {
        let body = serde_json::to_string(&payload)?;
        Ok(Self {
            payload,
            body,
            state: DeliveryState::Pending,
            attempts: 0,
            last_error: None,
        })
    }

    pub fn payload(&self) -> &SubmissionPayload {
        &self.payload
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn status(&self) -> SubmissionStatus {
        self.payload.status
    }

    pub fn state(&self) -> DeliveryState {
        self.state
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Attempt delivery of the stored body.
    ///
    /// Allowed while pending or after a failure; once delivered or
    /// abandoned the outbox refuses further calls.
    pub fn send(&mut self, transport: &dyn Transport) -> Result<()> {
        if matches!(self.state, DeliveryState::Delivered | DeliveryState::Abandoned) {
            return Err(ReviewError::InvalidStateTransition {
                state: self.state.as_str(),
                action: "send payload",
            });
        }

        self.attempts += 1;
        match transport.deliver(&self.body) {
            Ok(()) => {
                self.state = DeliveryState::Delivered;
                self.last_error = None;
                info!(
                    status = self.payload.status.as_str(),
                    attempts = self.attempts,
                    "review payload delivered"
                );
                Ok(())
            }
            Err(err) => {
                let err = match err {
                    ReviewError::SubmissionTransportFailure(msg) => msg,
                    other => other.to_string(),
                };
                warn!(attempts = self.attempts, error = %err, "review payload delivery failed");
                self.state = DeliveryState::Failed;
                self.last_error = Some(err.clone());
                Err(ReviewError::SubmissionTransportFailure(err))
            }
        }
    }

    /// Give up on an undelivered payload.
    ///
    /// Returns the cancellation notice the presenter may try once, or
    /// `None` when the abandoned payload was itself a cancellation.
    pub fn abandon(&mut self) -> Result<Option<Outbox>> {
        if matches!(self.state, DeliveryState::Delivered | DeliveryState::Abandoned) {
            return Err(ReviewError::InvalidStateTransition {
                state: self.state.as_str(),
                action: "abandon payload",
            });
        }

        self.state = DeliveryState::Abandoned;
        info!(status = self.payload.status.as_str(), "review payload abandoned");
        match self.payload.status {
            SubmissionStatus::Submitted => Outbox::new(SubmissionPayload::cancelled()).map(Some),
            SubmissionStatus::Cancelled => Ok(None),
        }
    }
}
