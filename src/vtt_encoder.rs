use std::io::Write;

use crate::subtitle::SubtitleEntry;
use crate::subtitle_encoder::{SubtitleEncoder, cue_text, format_timestamp};
use crate::{Error, Result};

/// A `SubtitleEncoder` that writes entries in WebVTT format.
///
/// Design:
/// - We stream output directly to a `Write` implementation.
/// - We write the WebVTT header lazily on the first entry, so an empty run writes nothing.
/// - Entry indices become cue identifiers.
pub struct VttEncoder<W: Write> {
    /// The underlying writer we stream VTT into.
    w: W,

    /// Whether we've written the `WEBVTT` header.
    started: bool,

    /// Whether the encoder has been closed.
    closed: bool,
}

impl<W: Write> VttEncoder<W> {
    /// Create a new VTT encoder that writes to the provided writer.
    pub fn new(w: W) -> Self {
        Self {
            w,
            started: false,
            closed: false,
        }
    }

    fn start_if_needed(&mut self) -> Result<()> {
        if !self.started {
            // WebVTT files begin with a mandatory header line followed by a blank line.
            self.w.write_all(b"WEBVTT\n\n")?;
            self.started = true;
        }
        Ok(())
    }
}

impl<W: Write> SubtitleEncoder for VttEncoder<W> {
    fn write_entry(&mut self, entry: &SubtitleEntry) -> Result<()> {
        if self.closed {
            return Err(Error::msg("cannot write entry: encoder is already closed"));
        }

        self.start_if_needed()?;

        writeln!(&mut self.w, "{}", entry.index)?;
        writeln!(
            &mut self.w,
            "{} --> {}",
            format_timestamp(entry.start, '.'),
            format_timestamp(entry.end, '.')
        )?;
        writeln!(&mut self.w, "{}", cue_text(&entry.text))?;
        writeln!(&mut self.w)?;

        Ok(())
    }

    /// Flush the underlying writer. This is idempotent.
    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }

        self.w.flush()?;
        self.closed = true;

        Ok(())
    }
}
