use tracing::debug;

use super::follow_up::FollowUpDetector;
use super::session::Session;
use super::types::PreparedQuery;

pub const DEFAULT_FOLLOW_UP_TEMPLATE: &str =
    "Based on the previous question '{last_question}', {question}";

/// Same rewrite in the deployment's working language
pub const INDONESIAN_FOLLOW_UP_TEMPLATE: &str =
    "Berdasarkan pertanyaan sebelumnya '{last_question}', {question}";

const LAST_QUESTION: &str = "{last_question}";
const QUESTION: &str = "{question}";

/// Rewrites follow-up questions into self-contained queries.
#[derive(Debug, Clone)]
pub struct QueryEnhancer {
    template: String,
}

impl QueryEnhancer {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Pure: the session is only read.
    pub fn enhance(&self, question: &str, session: &Session) -> PreparedQuery {
        let context = session.context(None);
        if context.is_empty() {
            return PreparedQuery {
                enhanced_question: question.to_string(),
                context_used: false,
                follow_up: false,
                context,
            };
        }

        let follow_up = FollowUpDetector::is_follow_up(question, true);
        let enhanced_question = if follow_up {
            debug!("Enhancing follow-up question with previous turn");
            self.render(session.last_question(), question)
        } else {
            question.to_string()
        };

        PreparedQuery {
            enhanced_question,
            context_used: true,
            follow_up,
            context,
        }
    }

    /// Single pass, so placeholder text inside the questions is left alone.
    fn render(&self, last_question: &str, question: &str) -> String {
        let mut out = String::with_capacity(self.template.len() + last_question.len() + question.len());
        let mut rest = self.template.as_str();

        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let tail = &rest[start..];

            if let Some(after) = tail.strip_prefix(LAST_QUESTION) {
                out.push_str(last_question);
                rest = after;
            } else if let Some(after) = tail.strip_prefix(QUESTION) {
                out.push_str(question);
                rest = after;
            } else {
                out.push('{');
                rest = &tail[1..];
            }
        }

        out.push_str(rest);
        out
    }
}

impl Default for QueryEnhancer {
    fn default() -> Self {
        Self::new(DEFAULT_FOLLOW_UP_TEMPLATE)
    }
}
