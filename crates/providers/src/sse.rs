//! Replay of server-push event streams.
//!
//! The task-queue provider sometimes frames a response body as an SSE-style
//! stream of `data: <json>` lines instead of a single JSON document. The
//! replay walks every record and prefers the last one reporting a terminal
//! status; when none is terminal the last parseable record wins.

use serde_json::Value;

/// Line prefix of an SSE data record.
pub const DATA_LINE_PREFIX: &str = "data:";

/// True if a response body is SSE-framed rather than plain JSON.
pub fn is_event_stream(body: &str) -> bool {
    body.trim_start().starts_with(DATA_LINE_PREFIX)
}

/// Replay an SSE-framed body and pick the authoritative record.
///
/// Unparseable lines are skipped; `None` means nothing in the stream was
/// valid JSON.
pub fn replay(body: &str) -> Option<Value> {
    let mut last: Option<Value> = None;
    let mut terminal: Option<Value> = None;

    for line in body.lines() {
        let line = line.trim();
        let Some(json_str) = line.strip_prefix(DATA_LINE_PREFIX) else {
            continue;
        };
        let json_str = json_str.trim();
        if json_str.is_empty() {
            continue;
        }

        let record: Value = match serde_json::from_str(json_str) {
            Ok(v) => v,
            Err(e) => {
                tracing::debug!(error = %e, "Skipping unparseable event-stream line");
                continue;
            }
        };

        if matches!(record["status"].as_str(), Some("succeeded" | "failed")) {
            terminal = Some(record.clone());
        }
        last = Some(record);
    }

    terminal.or(last)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_record_wins_over_later_progress() {
        let body = "data: {\"status\":\"running\",\"progress\":40}\n\
                    data: {\"status\":\"succeeded\",\"results\":[{\"url\":\"https://cdn/x.png\"}]}\n\
                    \n   ";
        let record = replay(body).unwrap();
        assert_eq!(record["status"], "succeeded");
        assert_eq!(record["results"][0]["url"], "https://cdn/x.png");
    }

    #[test]
    fn last_terminal_record_wins_among_several() {
        let body = "data: {\"status\":\"failed\",\"error\":\"first\"}\n\
                    data: {\"status\":\"succeeded\",\"id\":\"t1\"}";
        let record = replay(body).unwrap();
        assert_eq!(record["status"], "succeeded");
    }

    #[test]
    fn falls_back_to_last_record_without_terminal_status() {
        let body = "data: {\"status\":\"queued\"}\ndata: {\"status\":\"running\",\"progress\":80}";
        let record = replay(body).unwrap();
        assert_eq!(record["progress"], 80);
    }

    #[test]
    fn unparseable_lines_are_skipped() {
        let body = "data: not-json\ndata: {\"status\":\"running\"}";
        let record = replay(body).unwrap();
        assert_eq!(record["status"], "running");
    }

    #[test]
    fn empty_stream_yields_none() {
        assert!(replay("").is_none());
        assert!(replay(": keepalive\n\n").is_none());
    }

    #[test]
    fn leading_whitespace_does_not_hide_framing() {
        assert!(is_event_stream("  data: {\"status\":\"running\"}"));
        assert!(!is_event_stream("{\"status\":\"running\"}"));
    }
}
