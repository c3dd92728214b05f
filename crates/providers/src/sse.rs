//! Shared SSE draining helper, ported from `sa_providers::sse`.
//!
//! Both concrete providers stream chunked HTTP bodies; each buffers bytes,
//! splits on blank-line-delimited `data:` events, and hands complete
//! payloads to a provider-specific parser.

/// Extract complete `data:` payloads from an SSE buffer. The buffer is
/// drained in place; any trailing partial event remains for next call.
pub(crate) fn drain_data_lines(buffer: &mut String) -> Vec<String> {
    let mut data_lines = Vec::new();

    while let Some(pos) = buffer.find("\n\n") {
        let block: String = buffer.drain(..pos).collect();
        buffer.drain(..2);

        for line in block.lines() {
            let line = line.trim();
            if let Some(data) = line.strip_prefix("data:") {
                let data = data.trim();
                if !data.is_empty() {
                    data_lines.push(data.to_string());
                }
            }
        }
    }

    data_lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drains_complete_events() {
        let mut buf = String::from("data: first\n\ndata: second\n\n");
        let lines = drain_data_lines(&mut buf);
        assert_eq!(lines, vec!["first", "second"]);
        assert!(buf.is_empty());
    }

    #[test]
    fn partial_event_stays_buffered() {
        let mut buf = String::from("data: complete\n\ndata: partial");
        let lines = drain_data_lines(&mut buf);
        assert_eq!(lines, vec!["complete"]);
        assert_eq!(buf, "data: partial");
    }

    #[test]
    fn skips_non_data_lines() {
        let mut buf = String::from("event: ping\nid: 1\ndata: payload\n\n");
        let lines = drain_data_lines(&mut buf);
        assert_eq!(lines, vec!["payload"]);
    }

    #[test]
    fn skips_empty_data() {
        let mut buf = String::from("data: \n\n");
        assert!(drain_data_lines(&mut buf).is_empty());
    }
}
