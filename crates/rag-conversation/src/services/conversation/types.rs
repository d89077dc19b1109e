use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque conversation key
pub type SessionId = String;

pub const DEFAULT_MAX_HISTORY: usize = 10;
pub const DEFAULT_CONTEXT_WINDOW: usize = 3;
pub const MIN_CONTEXT_WINDOW: usize = 1;
pub const MAX_CONTEXT_WINDOW: usize = 10;

/// One recorded question/answer turn. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    pub question: String,
    /// Model answer or an error placeholder
    pub answer: String,
    /// Source identifiers (e.g. file names), distinct, first-seen order
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(with = "iso8601")]
    pub timestamp: DateTime<Utc>,
}

/// Durable form of a session: the only externally owned format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSnapshot {
    pub session_id: SessionId,
    pub history: Vec<Exchange>,
    #[serde(with = "iso8601")]
    pub saved_at: DateTime<Utc>,
}

/// Listing entry for a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationSummary {
    pub session_id: SessionId,
    pub turn_count: usize,
    pub last_question: String,
    /// Timestamp of the oldest retained exchange
    pub created_at: Option<DateTime<Utc>>,
}

/// Result of preparing a raw question for retrieval/generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreparedQuery {
    /// What downstream retrieval/generation must consume
    pub enhanced_question: String,
    /// Whether prior exchanges were available as context
    pub context_used: bool,
    pub follow_up: bool,
    /// Rendered transcript of the context window (empty when none)
    #[serde(skip)]
    pub context: String,
}

/// ISO-8601 timestamps.
///
/// Serializes RFC 3339 in UTC with full sub-second precision. Deserializes
/// RFC 3339 or a naive `YYYY-MM-DDTHH:MM:SS[.fff]` date-time, read as UTC.
pub(crate) mod iso8601 {
    use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| de::Error::custom(format!("invalid ISO-8601 timestamp: {}", raw)))
    }

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(ts.with_timezone(&Utc));
        }

        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }
}
