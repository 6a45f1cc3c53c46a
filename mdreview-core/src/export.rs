use crate::submission::{ReviewItem, SubmissionPayload, SubmissionStatus};

/// Pretty JSON for writing a payload to disk
pub fn to_json(payload: &SubmissionPayload) -> serde_json::Result<String> {
    serde_json::to_string_pretty(payload)
}

/// Render a payload as a markdown digest for whoever asked for the review.
///
/// Only rejected or commented items are listed; approved blocks without a
/// comment are summarized by count.
pub fn render_feedback(title: &str, payload: &SubmissionPayload) -> String {
    let mut out = String::new();

    out.push_str(&format!("## Review: {}\n\n", title));

    if payload.status == SubmissionStatus::Cancelled {
        out.push_str("The reviewer cancelled the review. No decisions were recorded.\n");
        return out;
    }

    let (mut approved, mut rejected, mut ranges) = (0, 0, 0);
    for item in &payload.items {
        match item {
            ReviewItem::Block(block) if block.checked => approved += 1,
            ReviewItem::Block(_) => rejected += 1,
            ReviewItem::Range(_) => ranges += 1,
        }
    }

    if ranges > 0 {
        out.push_str(&format!("### Comments ({} items)\n\n", ranges));
    } else {
        out.push_str(&format!(
            "{} approved, {} rejected.\n\n",
            approved, rejected
        ));
    }

    let flagged: Vec<_> = payload.flagged().collect();
    if flagged.is_empty() {
        out.push_str("Everything was approved without comments.\n");
        return out;
    }

    for item in flagged {
        match item {
            ReviewItem::Block(block) => {
                let verdict = if block.checked { "Approved" } else { "Rejected" };
                out.push_str(&format!("**{}** `{}`: {}\n", verdict, block.id, block.text));
                if !block.comment.is_empty() {
                    out.push_str(&format!("- Feedback: {}\n", block.comment));
                }
                out.push('\n');
            }
            ReviewItem::Range(range) => {
                let lines = if range.start_line == range.end_line {
                    format!("Line {}", range.start_line + 1)
                } else {
                    format!("Lines {}-{}", range.start_line + 1, range.end_line + 1)
                };
                out.push_str(&format!("**{}** \"{}\"\n", lines, range.line_preview));
                out.push_str(&format!("- Feedback: {}\n\n", range.comment));
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::submission::{BlockItem, RangeItem};

    #[test]
    fn test_block_feedback_lists_rejections() {
        let payload = SubmissionPayload::submitted(vec![
            ReviewItem::Block(BlockItem {
                id: "block-0".into(),
                text: "Title".into(),
                checked: true,
                comment: String::new(),
            }),
            ReviewItem::Block(BlockItem {
                id: "block-1".into(),
                text: "Drop this paragraph".into(),
                checked: false,
                comment: "out of scope".into(),
            }),
        ]);

        let feedback = render_feedback("Plan", &payload);
        assert!(feedback.starts_with("## Review: Plan"));
        assert!(feedback.contains("1 approved, 1 rejected."));
        assert!(feedback.contains("**Rejected** `block-1`: Drop this paragraph"));
        assert!(feedback.contains("- Feedback: out of scope"));
        assert!(!feedback.contains("block-0"));
    }

    #[test]
    fn test_range_feedback_uses_one_based_lines() {
        let payload = SubmissionPayload::submitted(vec![ReviewItem::Range(RangeItem {
            id: "x".into(),
            start_line: 2,
            end_line: 4,
            text: "c\nd\ne".into(),
            line_preview: "c".into(),
            checked: true,
            comment: "reword".into(),
            anchor: None,
        })]);

        let feedback = render_feedback("Notes", &payload);
        assert!(feedback.contains("### Comments (1 items)"));
        assert!(feedback.contains("**Lines 3-5** \"c\""));
    }

    #[test]
    fn test_cancelled_feedback() {
        let feedback = render_feedback("Plan", &SubmissionPayload::cancelled());
        assert!(feedback.contains("cancelled"));
    }

    #[test]
    fn test_pretty_json_roundtrip_fields() {
        let json = to_json(&SubmissionPayload::cancelled()).unwrap();
        assert!(json.contains("\"status\": \"cancelled\""));
    }
}
