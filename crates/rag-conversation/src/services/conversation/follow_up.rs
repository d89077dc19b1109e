use tracing::debug;

/// Phrases marking a question as depending on earlier turns.
///
/// Matched as case-insensitive substrings, so short words such as "itu" or
/// "detail" also fire inside unrelated sentences. Kept as-is for parity with
/// the deployed behavior.
pub const FOLLOW_UP_INDICATORS: [&str; 11] = [
    "lanjut",
    "selanjutnya",
    "lebih detail",
    "contoh",
    "bagaimana",
    "jelaskan lebih",
    "detail",
    "itu",
    "tersebut",
    "tadi",
    "sebelumnya",
];

pub struct FollowUpDetector;

impl FollowUpDetector {
    /// A question can only be a follow-up when there is prior context.
    pub fn is_follow_up(question: &str, have_context: bool) -> bool {
        if !have_context {
            return false;
        }

        let question_lower = question.to_lowercase();
        match Self::matched_indicator(&question_lower) {
            Some(indicator) => {
                debug!("Detected follow-up question: matched '{}'", indicator);
                true
            }
            None => false,
        }
    }

    fn matched_indicator(question_lower: &str) -> Option<&'static str> {
        FOLLOW_UP_INDICATORS
            .iter()
            .copied()
            .find(|indicator| question_lower.contains(indicator))
    }
}
