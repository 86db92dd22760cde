use std::io::Write;

use serde::Serialize;

use crate::subtitle::SubtitleEntry;
use crate::subtitle_encoder::SubtitleEncoder;
use crate::{Error, Result};

/// A `SubtitleEncoder` that writes entries as a single JSON array.
///
/// Design:
/// - We stream output directly to a `Write` implementation to avoid buffering
///   all entries in memory.
/// - Timestamps are written as fractional seconds.
///
/// Example output:
/// ```json
/// [
///   { "index": 1, "start_seconds": 0.0, "end_seconds": 1.2, "text": "hello" },
///   { "index": 2, "start_seconds": 1.2, "end_seconds": 2.5, "text": "world" }
/// ]
/// ```
pub struct JsonArrayEncoder<W: Write> {
    /// The underlying writer we stream JSON into.
    w: W,

    /// Whether we have written the opening `[` of the JSON array.
    started: bool,

    /// Whether the next element will be the first element in the array.
    first: bool,

    /// Whether the encoder has been closed.
    closed: bool,
}

#[derive(Serialize)]
struct JsonCue<'a> {
    index: usize,
    start_seconds: f64,
    end_seconds: f64,
    text: &'a str,
}

impl<W: Write> JsonArrayEncoder<W> {
    pub fn new(w: W) -> Self {
        Self {
            w,
            started: false,
            first: true,
            closed: false,
        }
    }

    /// Write the opening `[` lazily so empty output is still `[]`.
    fn start_if_needed(&mut self) -> Result<()> {
        if !self.started {
            self.w.write_all(b"[")?;
            self.started = true;
        }
        Ok(())
    }
}

impl<W: Write> SubtitleEncoder for JsonArrayEncoder<W> {
    fn write_entry(&mut self, entry: &SubtitleEntry) -> Result<()> {
        if self.closed {
            return Err(Error::msg("cannot write entry: encoder is already closed"));
        }

        self.start_if_needed()?;

        if !self.first {
            self.w.write_all(b",")?;
        }
        self.first = false;

        let cue = JsonCue {
            index: entry.index,
            start_seconds: entry.start.as_secs_f64(),
            end_seconds: entry.end.as_secs_f64(),
            text: &entry.text,
        };
        serde_json::to_writer(&mut self.w, &cue)?;

        Ok(())
    }

    /// Finalize the JSON array and flush the underlying writer. Idempotent.
    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }

        self.start_if_needed()?;
        self.w.write_all(b"]")?;
        self.w.flush()?;

        self.closed = true;
        Ok(())
    }
}
