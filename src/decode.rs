//! Incremental JSON element framing.
//!
//! Splits a chunked byte stream into complete top-level JSON values
//! without buffering the whole body, so downstream consumers can decode
//! records as they arrive. Accepts either a top-level array of values
//! (`[{..},{..}]`) or a bare concatenated / newline-delimited sequence.
//!
//! Framing only looks at string boundaries and brace/bracket depth; each
//! emitted element is handed to `serde_json` whole, so a malformed record
//! fails at deserialization without poisoning its neighbors.

/// Streaming splitter for top-level JSON values.
#[derive(Debug)]
pub(crate) struct JsonArrayDecoder {
    mode: Mode,
    element: Vec<u8>,
    depth: u32,
    in_string: bool,
    escaped: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Nothing but whitespace seen yet.
    Start,
    /// Inside a top-level array, splitting elements at depth-0 commas.
    Array,
    /// Bare sequence of values (concatenated or newline-delimited).
    Stream,
    /// Top-level array closed; remaining input is ignored.
    Done,
}

impl JsonArrayDecoder {
    pub fn new() -> Self {
        Self {
            mode: Mode::Start,
            element: Vec::new(),
            depth: 0,
            in_string: false,
            escaped: false,
        }
    }

    /// Feed a chunk, returning the raw bytes of each element completed by it.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        let mut complete = Vec::new();

        for &byte in chunk {
            match self.mode {
                Mode::Start => {
                    if byte.is_ascii_whitespace() {
                        continue;
                    }
                    if byte == b'[' {
                        self.mode = Mode::Array;
                    } else {
                        self.mode = Mode::Stream;
                        self.consume(byte, &mut complete);
                    }
                }
                Mode::Array | Mode::Stream => self.consume(byte, &mut complete),
                Mode::Done => break,
            }
        }

        complete
    }

    /// Flush any trailing element once the input ends.
    ///
    /// A truncated element is emitted as-is; it fails at deserialization
    /// like any other malformed record.
    pub fn finish(&mut self) -> Option<Vec<u8>> {
        self.mode = Mode::Done;
        if self.element.iter().all(u8::is_ascii_whitespace) {
            self.element.clear();
            return None;
        }
        Some(std::mem::take(&mut self.element))
    }

    fn consume(&mut self, byte: u8, complete: &mut Vec<Vec<u8>>) {
        if self.in_string {
            self.element.push(byte);
            if self.escaped {
                self.escaped = false;
            } else if byte == b'\\' {
                self.escaped = true;
            } else if byte == b'"' {
                self.in_string = false;
            }
            return;
        }

        match byte {
            b'"' => {
                self.in_string = true;
                self.element.push(byte);
            }
            b'{' | b'[' => {
                self.depth += 1;
                self.element.push(byte);
            }
            b'}' | b']' if self.depth > 0 => {
                self.depth -= 1;
                self.element.push(byte);
                // In a bare sequence a value is complete as soon as its
                // outermost container closes
                if self.mode == Mode::Stream && self.depth == 0 {
                    self.emit(complete);
                }
            }
            b']' => {
                // Closing bracket of the top-level array
                self.emit(complete);
                self.mode = Mode::Done;
            }
            b',' if self.depth == 0 && self.mode == Mode::Array => {
                self.emit(complete);
            }
            b'\n' if self.depth == 0 && self.mode == Mode::Stream => {
                // Newline-delimited scalars (objects already emitted above)
                self.emit(complete);
            }
            _ => {
                if !(self.element.is_empty() && byte.is_ascii_whitespace()) {
                    self.element.push(byte);
                }
            }
        }
    }

    fn emit(&mut self, complete: &mut Vec<Vec<u8>>) {
        while self.element.last().is_some_and(u8::is_ascii_whitespace) {
            self.element.pop();
        }
        if !self.element.is_empty() {
            complete.push(std::mem::take(&mut self.element));
        }
    }
}
