//! Study-session proposal detection.
//!
//! Plain substring matching over lowercased text plus one compiled
//! clock-time pattern. No tokenization, no stemming.

use regex::Regex;

/// Matches "4pm", "7:30 pm", "16:00" and similar clock-time tokens.
pub const CLOCK_TIME_PATTERN: &str = r"\b(\d{1,2}(:\d{2})?\s?(am|pm)|\d{1,2}:\d{2})\b";

const INTENT_KEYWORDS: &[&str] = &[
    "study",
    "studying",
    "study together",
    "study group",
    "review",
    "go over",
    "look over",
    "practice",
    "run through",
    "go through",
    "session",
    "meet",
    "meet up",
    "link up",
    "group up",
];

const SCHEDULE_KEYWORDS: &[&str] = &[
    "today",
    "tomorrow",
    "tonight",
    "later",
    "this weekend",
    "weekend",
    "after class",
    "after lecture",
    "after lab",
    "this afternoon",
    "this evening",
    "morning",
    "afternoon",
    "evening",
    "night",
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
];

/// Keyword lists and the clock-time pattern, injected into the detector so
/// tests and deployments can swap vocabularies without touching the logic.
#[derive(Clone, Debug)]
pub struct DetectorConfig {
    pub intent_keywords: Vec<String>,
    pub schedule_keywords: Vec<String>,
    pub clock_time: Regex,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            intent_keywords: INTENT_KEYWORDS.iter().map(|kw| (*kw).to_string()).collect(),
            schedule_keywords: SCHEDULE_KEYWORDS.iter().map(|kw| (*kw).to_string()).collect(),
            clock_time: Regex::new(CLOCK_TIME_PATTERN).expect("clock-time pattern is valid"),
        }
    }
}

/// Decides whether free text looks like a study-session proposal.
///
/// A positive match requires an intent keyword ("study", "review", "meet up")
/// plus either a clock-time token ("4pm", "18:00") or a schedule keyword
/// ("tomorrow", "saturday", "after class").
pub struct SessionDetector {
    config: DetectorConfig,
}

impl Default for SessionDetector {
    fn default() -> Self {
        Self::new(DetectorConfig::default())
    }
}

impl SessionDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    pub fn looks_like_session(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();

        let has_intent =
            self.config.intent_keywords.iter().any(|keyword| lowered.contains(keyword.as_str()));
        if !has_intent {
            return false;
        }

        let has_time = self.config.clock_time.is_match(&lowered);
        let has_schedule_word =
            self.config.schedule_keywords.iter().any(|keyword| lowered.contains(keyword.as_str()));

        has_time || has_schedule_word
    }
}
