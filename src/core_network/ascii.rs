//! Telnet end-of-line conversion for TYPE A transfers.
//!
//! Files keep their local `LF` line endings; the wire carries `CRLF`.

/// Converts local text to the wire form. A `CRLF` already present in the
/// file is passed through untouched.
#[derive(Debug, Default)]
pub struct AsciiEncoder {
    last_was_cr: bool,
}

impl AsciiEncoder {
    pub fn encode(&mut self, input: &[u8], output: &mut Vec<u8>) {
        output.reserve(input.len() + input.len() / 16);
        for &byte in input {
            if byte == b'\n' && !self.last_was_cr {
                output.push(b'\r');
            }
            output.push(byte);
            self.last_was_cr = byte == b'\r';
        }
    }
}

/// Converts wire text back to local line endings. A `CR` at the end of one
/// chunk is held until the next chunk shows whether an `LF` follows.
#[derive(Debug, Default)]
pub struct AsciiDecoder {
    pending_cr: bool,
}

impl AsciiDecoder {
    pub fn decode(&mut self, input: &[u8], output: &mut Vec<u8>) {
        output.reserve(input.len() + 1);
        for &byte in input {
            if self.pending_cr {
                self.pending_cr = false;
                if byte != b'\n' {
                    output.push(b'\r');
                }
            }
            if byte == b'\r' {
                self.pending_cr = true;
            } else {
                output.push(byte);
            }
        }
    }

    /// Flushes a trailing lone `CR` once the stream has ended.
    pub fn finish(&mut self, output: &mut Vec<u8>) {
        if self.pending_cr {
            self.pending_cr = false;
            output.push(b'\r');
        }
    }
}
