//! Sentence-boundary buffering so the engine can stream LLM tokens to the
//! TTS client without sacrificing prosody (spec §4.3).

use rc_domain::config::TtsConfig;

/// Accumulates incoming token text and decides when a fragment is ready
/// to flush to the TTS client: on sentence-ending punctuation, on a comma
/// once enough has accumulated, or once the buffer grows past a hard cap.
#[derive(Debug, Clone)]
pub struct SentenceBuffer {
    buf: String,
    max_buffer_chars: usize,
    min_comma_chars: usize,
}

impl SentenceBuffer {
    pub fn new(config: &TtsConfig) -> Self {
        Self {
            buf: String::new(),
            max_buffer_chars: config.max_buffer_chars,
            min_comma_chars: config.min_comma_chars,
        }
    }

    /// Feed a token. Returns `Some(fragment)` when a natural boundary
    /// (or the hard cap) is reached, draining the buffer.
    pub fn push(&mut self, token: &str) -> Option<String> {
        self.buf.push_str(token);

        let should_flush = match self.buf.chars().last() {
            Some('.') | Some('!') | Some('?') => true,
            Some(',') => self.buf.chars().count() >= self.min_comma_chars,
            _ => self.buf.chars().count() > self.max_buffer_chars,
        };

        if should_flush && !self.buf.is_empty() {
            Some(std::mem::take(&mut self.buf))
        } else {
            None
        }
    }

    /// Drain whatever remains, for end-of-turn or cancellation.
    pub fn drain(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.buf))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer() -> SentenceBuffer {
        SentenceBuffer::new(&TtsConfig::default())
    }

    #[test]
    fn flushes_on_period() {
        let mut b = buffer();
        assert!(b.push("Hello there").is_none());
        assert_eq!(b.push(".").unwrap(), "Hello there.");
    }

    #[test]
    fn comma_only_flushes_past_min_chars() {
        let mut b = buffer();
        assert!(b.push("Hi").is_none());
        assert!(b.push(",").is_none()); // "Hi," is 3 chars, below min of 10
    }

    #[test]
    fn comma_flushes_once_min_chars_reached() {
        let mut b = buffer();
        b.push("One moment please");
        assert_eq!(b.push(",").unwrap(), "One moment please,");
    }

    #[test]
    fn flushes_past_hard_cap_without_punctuation() {
        let mut b = buffer();
        let long = "a".repeat(51);
        assert_eq!(b.push(&long).unwrap(), long);
    }

    #[test]
    fn drain_returns_none_when_empty() {
        let mut b = buffer();
        assert!(b.drain().is_none());
    }

    #[test]
    fn drain_returns_partial_fragment() {
        let mut b = buffer();
        b.push("partial thought");
        assert_eq!(b.drain().unwrap(), "partial thought");
    }
}
