//! Output/transport sinks (§6, §5): the VM never owns a socket or a terminal. It holds only a
//! send capability through these two traits; the embedding collaborator owns the real thing.

/// User-visible text (`echo`/`clientMessage`/`displayText`, `*` already expanded to CRLF).
pub trait OutputSink: Send {
    fn output(&mut self, text: &str);
}

/// Outbound bytes destined for the game server (`send`, `*` expanded to a single CR). A single
/// FIFO queue regardless of whether the call came from the foreground script or a trigger
/// handler (§4.7, §9).
pub trait TransportSink: Send {
    fn send(&mut self, bytes: &str);
}

/// An in-memory sink pair for tests and the CLI harness: every write is appended to a `Vec`/
/// `VecDeque` the caller can drain.
#[derive(Debug, Default)]
pub struct BufferSink {
    pub output: Vec<String>,
    pub outbound: std::collections::VecDeque<String>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain_output(&mut self) -> Vec<String> {
        std::mem::take(&mut self.output)
    }

    pub fn drain_outbound(&mut self) -> Vec<String> {
        self.outbound.drain(..).collect()
    }
}

impl OutputSink for BufferSink {
    fn output(&mut self, text: &str) {
        self.output.push(text.to_string());
    }
}

impl TransportSink for BufferSink {
    fn send(&mut self, bytes: &str) {
        self.outbound.push_back(bytes.to_string());
    }
}

/// Expand the TWX `*` output-control character: CRLF in user-visible text, a single CR on the
/// wire (§4.4).
pub fn expand_star_crlf(text: &str) -> String {
    text.replace('*', "\r\n")
}

pub fn expand_star_cr(text: &str) -> String {
    text.replace('*', "\r")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_sink_records_and_drains() {
        let mut sink = BufferSink::new();
        sink.output("hello");
        sink.send("move 1");
        assert_eq!(sink.drain_output(), vec!["hello".to_string()]);
        assert_eq!(sink.drain_outbound(), vec!["move 1".to_string()]);
        assert!(sink.output.is_empty());
    }

    #[test]
    fn star_expansion_differs_between_sinks() {
        assert_eq!(expand_star_crlf("a*b"), "a\r\nb");
        assert_eq!(expand_star_cr("a*b"), "a\rb");
    }
}
