//! Streaming codec for controller reply lines

use crate::command::ControllerReply;

/// Maximum reply line length (reasonable limit to prevent buffer growth)
const MAX_LINE_LEN: usize = 128;

/// Streaming line codec
///
/// Accumulates raw bytes from the serial link and yields complete,
/// newline-terminated [`ControllerReply`]s. Handles partial reads and
/// multiple lines per read.
pub struct LineCodec {
    buffer: Vec<u8>,
}

impl LineCodec {
    /// Create an empty codec
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(MAX_LINE_LEN),
        }
    }

    /// Push raw bytes into the codec's buffer
    pub fn push_bytes(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);

        // Prevent unbounded growth when the device streams garbage
        if self.buffer.len() > MAX_LINE_LEN * 4 {
            let start = self.buffer.len() - MAX_LINE_LEN;
            self.buffer = self.buffer[start..].to_vec();
        }
    }

    /// Try to extract the next complete reply from the buffer
    ///
    /// Blank lines are consumed silently; anything else parses to some
    /// [`ControllerReply`] variant (unrecognized lines become `Unknown`).
    pub fn next_reply(&mut self) -> Option<ControllerReply> {
        loop {
            let term_pos = self.buffer.iter().position(|&b| b == b'\n')?;
            let line_bytes: Vec<u8> = self.buffer.drain(..=term_pos).collect();

            let line = String::from_utf8_lossy(&line_bytes);
            let line = line.trim_end_matches(['\r', '\n']).trim();
            if line.is_empty() {
                continue;
            }

            return Some(ControllerReply::parse(line));
        }
    }

    /// Clear the internal buffer
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::switch::{SwitchId, SwitchPosition};

    #[test]
    fn test_streaming_parse() {
        let mut codec = LineCodec::new();

        codec.push_bytes(b"STATE S1=1 ");
        assert!(codec.next_reply().is_none());

        codec.push_bytes(b"S2=2 S3=1\n");
        let Some(ControllerReply::State(snapshot)) = codec.next_reply() else {
            panic!("expected State reply");
        };
        assert_eq!(snapshot.position(SwitchId::S3), Some(SwitchPosition::P1));
    }

    #[test]
    fn test_multiple_lines_per_push() {
        let mut codec = LineCodec::new();
        codec.push_bytes(b"OK STATE S1=1 S2=1 S3=1\nSTATE S1=2 S2=1 S3=1\n");

        assert!(matches!(
            codec.next_reply(),
            Some(ControllerReply::Ack { state: Some(_) })
        ));
        assert!(matches!(codec.next_reply(), Some(ControllerReply::State(_))));
        assert!(codec.next_reply().is_none());
    }

    #[test]
    fn test_crlf_and_blank_lines() {
        let mut codec = LineCodec::new();
        codec.push_bytes(b"\r\n\nERROR Format\r\n");

        assert_eq!(
            codec.next_reply(),
            Some(ControllerReply::Error("Format".to_string()))
        );
    }

    #[test]
    fn test_debug_noise_parses_as_unknown() {
        let mut codec = LineCodec::new();
        codec.push_bytes(b"DEBUG pulsing GPIO 20\n");

        assert!(matches!(codec.next_reply(), Some(ControllerReply::Unknown(_))));
    }

    #[test]
    fn test_buffer_cap_keeps_tail() {
        let mut codec = LineCodec::new();
        codec.push_bytes(&vec![b'x'; MAX_LINE_LEN * 8]);
        codec.push_bytes(b"\nSTATE S1=1 S2=1 S3=1\n");

        // Garbage line plus the valid line both survive truncation
        assert!(matches!(codec.next_reply(), Some(ControllerReply::Unknown(_))));
        assert!(matches!(codec.next_reply(), Some(ControllerReply::State(_))));
    }
}
