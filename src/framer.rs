//! NMEA sentence reassembly from an unbounded byte stream
//!
//! TCP reads arrive at arbitrary boundaries: one read can carry several
//! sentences, or a sentence can span several reads. `SentenceFramer`
//! carries the undelimited tail between `feed` calls and yields each
//! complete CRLF-terminated sentence exactly once, delimiter stripped.
//!
//! The carry buffer is unbounded. A peer that never sends a delimiter
//! grows it without limit; AIS transponders delimit every sentence, and a
//! cap would truncate a sentence that straddles it, so none is imposed.

/// Two-byte sentence delimiter used by NMEA 0183
const DELIMITER: &[u8] = b"\r\n";

/// Stateful reassembler turning arbitrary-sized reads into sentences
#[derive(Debug, Default)]
pub struct SentenceFramer {
    buf: Vec<u8>,
}

impl SentenceFramer {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Append `bytes` and iterate over the complete sentences now available.
    ///
    /// Adjacent delimiters yield empty sentences; the filter downstream
    /// discards them. Trailing bytes after the last delimiter stay
    /// buffered for the next call.
    pub fn feed<'a>(&'a mut self, bytes: &[u8]) -> Sentences<'a> {
        self.buf.extend_from_slice(bytes);
        Sentences { framer: self }
    }

    /// Discard all buffered bytes.
    ///
    /// Called whenever the connection this framer reads from is replaced:
    /// a partial sentence from a dead connection must never be stitched
    /// to data from a new one.
    pub fn reset(&mut self) {
        self.buf.clear();
    }

    /// Number of bytes still waiting for a delimiter
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    fn pop_sentence(&mut self) -> Option<Vec<u8>> {
        let pos = self
            .buf
            .windows(DELIMITER.len())
            .position(|w| w == DELIMITER)?;
        let sentence = self.buf[..pos].to_vec();
        self.buf.drain(..pos + DELIMITER.len());
        Some(sentence)
    }
}

/// Draining iterator returned by [`SentenceFramer::feed`]
pub struct Sentences<'a> {
    framer: &'a mut SentenceFramer,
}

impl Iterator for Sentences<'_> {
    type Item = Vec<u8>;

    fn next(&mut self) -> Option<Vec<u8>> {
        self.framer.pop_sentence()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(framer: &mut SentenceFramer, bytes: &[u8]) -> Vec<Vec<u8>> {
        framer.feed(bytes).collect()
    }

    #[test]
    fn test_single_feed_multiple_sentences() {
        let mut framer = SentenceFramer::new();
        let out = collect(&mut framer, b"!AIVDM,1,1,,A,abc\r\nJUNK\r\n!AIVDO,..\r\n");
        assert_eq!(out.len(), 3);
        assert_eq!(out[0], b"!AIVDM,1,1,,A,abc");
        assert_eq!(out[1], b"JUNK");
        assert_eq!(out[2], b"!AIVDO,..");
        assert_eq!(framer.pending(), 0);
    }

    #[test]
    fn test_sentence_split_across_feeds() {
        let mut framer = SentenceFramer::new();
        assert!(collect(&mut framer, b"!AIVDM,1").is_empty());
        assert_eq!(framer.pending(), 8);

        let out = collect(&mut framer, b",1,,A,abc\r\n");
        assert_eq!(out, vec![b"!AIVDM,1,1,,A,abc".to_vec()]);
        assert_eq!(framer.pending(), 0);
    }

    #[test]
    fn test_delimiter_split_across_feeds() {
        let mut framer = SentenceFramer::new();
        assert!(collect(&mut framer, b"abc\r").is_empty());
        let out = collect(&mut framer, b"\ndef\r\n");
        assert_eq!(out, vec![b"abc".to_vec(), b"def".to_vec()]);
    }

    #[test]
    fn test_chunking_invariance() {
        // Any split of the input yields the same sentences as one feed
        let input = b"!AIVDM,1,1,,A,abc\r\n\r\nJUNK\r\npartial-tail";
        let mut whole = SentenceFramer::new();
        let expected: Vec<Vec<u8>> = whole.feed(input).collect();

        for chunk_size in 1..input.len() {
            let mut framer = SentenceFramer::new();
            let mut out = Vec::new();
            for chunk in input.chunks(chunk_size) {
                out.extend(framer.feed(chunk));
            }
            assert_eq!(out, expected, "chunk size {}", chunk_size);
            assert_eq!(framer.pending(), whole.pending());
        }
    }

    #[test]
    fn test_adjacent_delimiters_yield_empty_sentence() {
        let mut framer = SentenceFramer::new();
        let out = collect(&mut framer, b"\r\n\r\nx\r\n");
        assert_eq!(out, vec![Vec::new(), Vec::new(), b"x".to_vec()]);
    }

    #[test]
    fn test_reset_discards_partial_data() {
        let mut framer = SentenceFramer::new();
        assert!(collect(&mut framer, b"!AIVDM,stale-partial").is_empty());
        assert!(framer.pending() > 0);

        framer.reset();
        assert_eq!(framer.pending(), 0);

        // After reset the framer behaves exactly like a fresh one
        let out = collect(&mut framer, b"!AIVDO,fresh\r\n");
        assert_eq!(out, vec![b"!AIVDO,fresh".to_vec()]);
    }

    #[test]
    fn test_lone_cr_or_lf_is_not_a_delimiter() {
        let mut framer = SentenceFramer::new();
        assert!(collect(&mut framer, b"abc\rdef\nghi").is_empty());
        let out = collect(&mut framer, b"\r\n");
        assert_eq!(out, vec![b"abc\rdef\nghi".to_vec()]);
    }
}
