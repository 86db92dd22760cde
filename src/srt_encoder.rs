use std::io::Write;

use crate::subtitle::SubtitleEntry;
use crate::subtitle_encoder::{SubtitleEncoder, cue_text, format_timestamp};
use crate::{Error, Result};

/// A `SubtitleEncoder` that writes entries in SubRip (`.srt`) format.
///
/// Each cue is the entry index, a `HH:MM:SS,mmm --> HH:MM:SS,mmm` timing line, the text, and a
/// blank separator line. SubRip has no header, so closing an empty encoder writes nothing.
pub struct SrtEncoder<W: Write> {
    w: W,
    closed: bool,
}

impl<W: Write> SrtEncoder<W> {
    pub fn new(w: W) -> Self {
        Self { w, closed: false }
    }
}

impl<W: Write> SubtitleEncoder for SrtEncoder<W> {
    fn write_entry(&mut self, entry: &SubtitleEntry) -> Result<()> {
        if self.closed {
            return Err(Error::msg("cannot write entry: encoder is already closed"));
        }

        writeln!(&mut self.w, "{}", entry.index)?;
        writeln!(
            &mut self.w,
            "{} --> {}",
            format_timestamp(entry.start, ','),
            format_timestamp(entry.end, ',')
        )?;
        writeln!(&mut self.w, "{}", cue_text(&entry.text))?;
        writeln!(&mut self.w)?;

        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }

        self.w.flush()?;
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn entry(index: usize, start_ms: u64, end_ms: u64, text: &str) -> SubtitleEntry {
        SubtitleEntry {
            index,
            start: Duration::from_millis(start_ms),
            end: Duration::from_millis(end_ms),
            text: text.to_owned(),
        }
    }

    #[test]
    fn srt_writes_numbered_cues() -> anyhow::Result<()> {
        let mut out = Vec::new();
        let mut enc = SrtEncoder::new(&mut out);

        enc.write_entry(&entry(1, 0, 1_500, " hello"))?;
        enc.write_entry(&entry(2, 61_200, 3_600_000, "< No Speech >"))?;
        enc.close()?;

        assert_eq!(
            std::str::from_utf8(&out)?,
            "1\n00:00:00,000 --> 00:00:01,500\nhello\n\n\
             2\n00:01:01,200 --> 01:00:00,000\n< No Speech >\n\n"
        );
        Ok(())
    }

    #[test]
    fn srt_close_without_entries_emits_nothing() -> anyhow::Result<()> {
        let mut out = Vec::new();
        let mut enc = SrtEncoder::new(&mut out);
        enc.close()?;
        enc.close()?;
        assert!(out.is_empty());
        Ok(())
    }

    #[test]
    fn srt_write_after_close_errors() -> anyhow::Result<()> {
        let mut out = Vec::new();
        let mut enc = SrtEncoder::new(&mut out);
        enc.close()?;
        let err = enc.write_entry(&entry(1, 0, 1_000, "nope")).unwrap_err();
        assert!(err.to_string().contains("already closed"));
        Ok(())
    }
}
