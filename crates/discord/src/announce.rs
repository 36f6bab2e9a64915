//! Announcement rendering for the planning channel.

use chrono::{DateTime, FixedOffset};
use huddle_core::when::format_when;

use crate::components::{MessageBuilder, MessagePayload};
use crate::confirm::ProposalCandidate;

/// RSVP markers attached to every announcement, in posting order.
pub const RSVP_REACTIONS: [&str; 3] = ["✅", "❓", "❌"];

pub fn announcement_message(
    candidate: &ProposalCandidate,
    when: Option<DateTime<FixedOffset>>,
) -> MessagePayload {
    let when_line =
        when.map(|when| format!("**When:** {}\n", format_when(when))).unwrap_or_default();

    MessageBuilder::new(format!(
        "📚 **Proposed Study Session**\n\
         **From:** <@{author}>\n\
         **Details (original):** {details}\n\
         {when_line}\n\
         React below to RSVP:\n\
         ✅ Going   ❓ Maybe   ❌ Not going",
        author = candidate.author_id,
        details = candidate.text,
    ))
    .build()
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, NaiveDate};

    use super::{announcement_message, RSVP_REACTIONS};
    use crate::confirm::ProposalCandidate;

    fn candidate() -> ProposalCandidate {
        ProposalCandidate {
            author_id: "42".to_string(),
            channel_id: "100".to_string(),
            text: "want to study together tomorrow at 4 PM".to_string(),
        }
    }

    #[test]
    fn announcement_contains_mention_original_text_and_when_line() {
        let when = NaiveDate::from_ymd_opt(2025, 11, 22)
            .and_then(|date| date.and_hms_opt(16, 0, 0))
            .and_then(|naive| {
                naive.and_local_timezone(FixedOffset::west_opt(5 * 3600).expect("offset")).single()
            })
            .expect("valid instant");

        let payload = announcement_message(&candidate(), Some(when));

        assert!(payload.content.contains("<@42>"));
        assert!(payload.content.contains("want to study together tomorrow at 4 PM"));
        assert!(payload.content.contains("**When:** Saturday, November 22, 2025 at 4:00 PM (ET)"));
        assert!(payload.content.contains("React below to RSVP"));
        assert!(payload.components.is_empty());
    }

    #[test]
    fn when_line_is_omitted_when_no_time_was_determined() {
        let payload = announcement_message(&candidate(), None);

        assert!(!payload.content.contains("**When:**"));
        assert!(payload.content.contains("React below to RSVP"));
    }

    #[test]
    fn rsvp_order_is_going_maybe_not_going() {
        assert_eq!(RSVP_REACTIONS, ["✅", "❓", "❌"]);
    }
}
