use super::exchange_log::ExchangeLog;

/// Renders the most recent exchanges as a flat Q/A transcript.
pub struct ContextWindow;

impl ContextWindow {
    /// Take the last `min(n, len)` exchanges, oldest first, and emit
    /// `Q{i}: ..` / `A{i}: ..` lines numbered from 1 within the selection.
    ///
    /// An empty log (or `n == 0`) yields an empty string, meaning
    /// "no context available".
    pub fn render(log: &ExchangeLog, n: usize) -> String {
        log.recent(n)
            .enumerate()
            .flat_map(|(i, exchange)| {
                let turn = i + 1;
                [
                    format!("Q{}: {}", turn, exchange.question),
                    format!("A{}: {}", turn, exchange.answer),
                ]
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log_with(count: usize) -> ExchangeLog {
        let mut log = ExchangeLog::new(10);
        for i in 1..=count {
            log.append(format!("question {}", i), format!("answer {}", i), vec![]);
        }
        log
    }

    #[test]
    fn test_empty_log_renders_empty() {
        assert_eq!(ContextWindow::render(&ExchangeLog::new(10), 3), "");
    }

    #[test]
    fn test_golden_transcript() {
        let log = log_with(5);
        let rendered = ContextWindow::render(&log, 3);
        assert_eq!(
            rendered,
            "Q1: question 3\nA1: answer 3\nQ2: question 4\nA2: answer 4\nQ3: question 5\nA3: answer 5"
        );
    }

    #[test]
    fn test_window_larger_than_log() {
        let log = log_with(2);
        let rendered = ContextWindow::render(&log, 10);
        assert_eq!(rendered.lines().count(), 4);
        assert!(rendered.starts_with("Q1: question 1"));
    }

    #[test]
    fn test_numbering_restarts_each_call() {
        let log = log_with(4);
        assert!(ContextWindow::render(&log, 1).starts_with("Q1: question 4"));
        assert!(ContextWindow::render(&log, 2).starts_with("Q1: question 3"));
    }
}
