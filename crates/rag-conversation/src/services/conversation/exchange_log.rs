use chrono::Utc;
use std::collections::VecDeque;

use super::types::Exchange;

/// Append-only, capacity-bounded log of exchanges for one session.
///
/// Invariant: `len() <= max_history` after every mutation. The oldest
/// exchanges are evicted first.
#[derive(Debug, Clone)]
pub struct ExchangeLog {
    entries: VecDeque<Exchange>,
    max_history: usize,
}

impl ExchangeLog {
    pub fn new(max_history: usize) -> Self {
        let max_history = max_history.max(1);
        Self {
            entries: VecDeque::with_capacity(max_history + 1),
            max_history,
        }
    }

    /// Append one exchange stamped with the current time and enforce capacity.
    /// Returns the log length afterwards.
    pub fn append(&mut self, question: String, answer: String, sources: Vec<String>) -> usize {
        // Keep timestamps non-decreasing even if the wall clock steps back
        let now = Utc::now();
        let timestamp = match self.entries.back() {
            Some(last) if last.timestamp > now => last.timestamp,
            _ => now,
        };

        self.entries.push_back(Exchange {
            question,
            answer,
            sources: dedup_sources(sources),
            timestamp,
        });
        self.enforce_capacity();

        self.entries.len()
    }

    /// Most recent question, or "" when empty
    pub fn last_question(&self) -> &str {
        self.entries.back().map(|e| e.question.as_str()).unwrap_or("")
    }

    /// Most recent answer, or "" when empty
    pub fn last_answer(&self) -> &str {
        self.entries.back().map(|e| e.answer.as_str()).unwrap_or("")
    }

    /// Owned copy of every exchange, oldest first
    pub fn all(&self) -> Vec<Exchange> {
        self.entries.iter().cloned().collect()
    }

    /// The last `min(n, len)` exchanges, oldest first
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &Exchange> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(skip)
    }

    pub fn first(&self) -> Option<&Exchange> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Replace the whole log, keeping only the newest `max_history` entries.
    /// Returns how many entries were dropped.
    pub fn replace(&mut self, history: Vec<Exchange>) -> usize {
        let incoming = history.len();
        self.entries = history.into();
        self.enforce_capacity();
        incoming - self.entries.len()
    }

    fn enforce_capacity(&mut self) {
        while self.entries.len() > self.max_history {
            self.entries.pop_front();
        }
    }
}

fn dedup_sources(sources: Vec<String>) -> Vec<String> {
    let mut seen = Vec::with_capacity(sources.len());
    for source in sources {
        if !seen.contains(&source) {
            seen.push(source);
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(log: &mut ExchangeLog, count: usize) {
        for i in 1..=count {
            log.append(format!("q{}", i), format!("a{}", i), vec![]);
        }
    }

    #[test]
    fn test_capacity_keeps_last_ten_oldest_first() {
        let mut log = ExchangeLog::new(10);
        for i in 1..=15 {
            let len = log.append(format!("q{}", i), format!("a{}", i), vec![]);
            assert!(len <= 10);
        }

        let questions: Vec<String> = log.all().into_iter().map(|e| e.question).collect();
        let expected: Vec<String> = (6..=15).map(|i| format!("q{}", i)).collect();
        assert_eq!(questions, expected);
    }

    #[test]
    fn test_last_question_and_answer() {
        let mut log = ExchangeLog::new(10);
        assert_eq!(log.last_question(), "");
        assert_eq!(log.last_answer(), "");

        fill(&mut log, 2);
        assert_eq!(log.last_question(), "q2");
        assert_eq!(log.last_answer(), "a2");
    }

    #[test]
    fn test_timestamps_non_decreasing() {
        let mut log = ExchangeLog::new(10);
        fill(&mut log, 5);

        let all = log.all();
        for pair in all.windows(2) {
            assert!(pair[0].timestamp <= pair[1].timestamp);
        }
    }

    #[test]
    fn test_append_after_future_timestamp_keeps_order() {
        let future = Utc::now() + chrono::Duration::hours(1);
        let mut log = ExchangeLog::new(10);
        log.replace(vec![Exchange {
            question: "dari masa depan".to_string(),
            answer: "a".to_string(),
            sources: vec![],
            timestamp: future,
        }]);

        log.append("q".to_string(), "a".to_string(), vec![]);

        let all = log.all();
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].timestamp, future);
        assert!(all[0].timestamp <= all[1].timestamp);
    }

    #[test]
    fn test_sources_deduplicated_in_order() {
        let mut log = ExchangeLog::new(10);
        log.append(
            "q".to_string(),
            "a".to_string(),
            vec!["b.pdf".to_string(), "a.pdf".to_string(), "b.pdf".to_string()],
        );
        assert_eq!(log.all()[0].sources, vec!["b.pdf", "a.pdf"]);
    }

    #[test]
    fn test_recent_takes_tail() {
        let mut log = ExchangeLog::new(10);
        fill(&mut log, 5);

        let recent: Vec<&str> = log.recent(2).map(|e| e.question.as_str()).collect();
        assert_eq!(recent, vec!["q4", "q5"]);
        assert_eq!(log.recent(50).count(), 5);
        assert_eq!(log.recent(0).count(), 0);
    }

    #[test]
    fn test_replace_truncates_to_capacity() {
        let mut source = ExchangeLog::new(20);
        fill(&mut source, 12);

        let mut log = ExchangeLog::new(10);
        let dropped = log.replace(source.all());
        assert_eq!(dropped, 2);
        assert_eq!(log.len(), 10);
        assert_eq!(log.first().unwrap().question, "q3");
    }
}
