//! Diagnostic output accumulation for calibration runs.
//!
//! The sink owns two append-only buffers, one per output channel of the
//! engine. Buffers grow for the lifetime of the process and are never
//! truncated, so the concatenated snapshot observed by one poll is always a
//! prefix of the snapshot observed by the next.

use std::sync::Mutex;

#[derive(Default)]
struct Buffers {
    out: String,
    err: String,
}

/// One sink per session, injected wherever job diagnostic text is produced.
#[derive(Default)]
pub(crate) struct LogSink {
    buffers: Mutex<Buffers>,
}

impl LogSink {
    pub(crate) fn append_out(&self, text: &str) {
        self.buffers.lock().unwrap().out.push_str(text);
    }

    pub(crate) fn append_err(&self, text: &str) {
        self.buffers.lock().unwrap().err.push_str(text);
    }

    /// Both channels in a single consistent view, out first.
    pub(crate) fn snapshot(&self) -> String {
        let buffers = self.buffers.lock().unwrap();
        let mut text = String::with_capacity(buffers.out.len() + buffers.err.len());
        text.push_str(&buffers.out);
        text.push_str(&buffers.err);
        text
    }

    /// The periodic poll: the client sends what it currently displays. When
    /// that text is non-empty and differs from the snapshot, the reply is the
    /// client text with the snapshot appended; otherwise the snapshot alone.
    /// Repeating a poll with no writes in between yields the same text.
    pub(crate) fn poll(&self, client_text: &str) -> String {
        let current = self.snapshot();
        if !client_text.is_empty() && client_text != current {
            let mut text = String::with_capacity(client_text.len() + current.len());
            text.push_str(client_text);
            text.push_str(&current);
            text
        } else {
            current
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_is_idempotent_without_new_output() {
        let sink = LogSink::default();
        sink.append_out("line one\n");
        let first = sink.poll("");
        let second = sink.poll(&first);
        assert_eq!(first, second);
    }

    #[test]
    fn appends_are_order_preserving() {
        let sink = LogSink::default();
        sink.append_out("A");
        sink.append_out("B");
        assert!(sink.poll("").contains("AB"));
    }

    #[test]
    fn snapshots_grow_by_suffix_only() {
        let sink = LogSink::default();
        sink.append_out("first\n");
        let before = sink.snapshot();
        sink.append_out("second\n");
        let after = sink.snapshot();
        assert!(after.starts_with(&before));
        assert!(after.len() > before.len());
    }

    #[test]
    fn stale_client_text_gets_the_snapshot_appended() {
        let sink = LogSink::default();
        sink.append_out("fresh\n");
        assert_eq!(sink.poll("shown\n"), "shown\nfresh\n");
    }

    #[test]
    fn err_channel_appends_after_out_channel() {
        let sink = LogSink::default();
        sink.append_err("warning\n");
        sink.append_out("progress\n");
        assert_eq!(sink.snapshot(), "progress\nwarning\n");
    }
}
