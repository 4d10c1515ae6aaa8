/// Splits a byte stream into lines, carrying the trailing partial line over
/// to the next chunk.
#[derive(Debug, Default)]
pub struct LineBuffer {
    partial: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return every line it completed, in order
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &byte in chunk {
            if byte == b'\n' {
                let raw = std::mem::take(&mut self.partial);
                lines.push(decode(raw));
            } else {
                self.partial.push(byte);
            }
        }
        lines
    }

    /// Flush whatever partial line remains once the stream has ended
    pub fn finish(&mut self) -> Option<String> {
        if self.partial.is_empty() {
            None
        } else {
            Some(decode(std::mem::take(&mut self.partial)))
        }
    }

    pub fn has_partial(&self) -> bool {
        !self.partial.is_empty()
    }
}

fn decode(mut raw: Vec<u8>) -> String {
    if raw.last() == Some(&b'\r') {
        raw.pop();
    }
    match String::from_utf8(raw) {
        Ok(s) => s,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_line_across_chunks() {
        let mut buf = LineBuffer::new();
        let mut lines = buf.push(b"foo\nbar\nba");
        assert!(buf.has_partial());
        lines.extend(buf.push(b"z\n"));
        assert_eq!(lines, vec!["foo", "bar", "baz"]);
        assert_eq!(buf.finish(), None);
    }

    #[test]
    fn test_finish_flushes_partial() {
        let mut buf = LineBuffer::new();
        assert_eq!(buf.push(b"first\nlast"), vec!["first"]);
        assert_eq!(buf.finish(), Some("last".to_string()));
        assert_eq!(buf.finish(), None);
    }

    #[test]
    fn test_crlf_and_empty_lines() {
        let mut buf = LineBuffer::new();
        assert_eq!(buf.push(b"a\r\n\nb\r"), vec!["a", ""]);
        assert_eq!(buf.push(b"\n"), vec!["b"]);
    }

    #[test]
    fn test_multibyte_char_split_across_chunks() {
        let bytes = "é\n".as_bytes();
        let mut buf = LineBuffer::new();
        assert!(buf.push(&bytes[..1]).is_empty());
        assert_eq!(buf.push(&bytes[1..]), vec!["é"]);
    }
}
