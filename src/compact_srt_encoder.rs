//! Compact SubRip: one `HH:MM:SS,mmm --> HH:MM:SS,mmm text` line per entry.
//!
//! The compact form drops indices and blank separators so a transcript can be proofread and
//! edited line by line, then turned back into regular entries with [`parse_compact_srt`].

use std::io::Write;
use std::time::Duration;

use crate::subtitle::SubtitleEntry;
use crate::subtitle_encoder::{SubtitleEncoder, format_timestamp};
use crate::{Error, Result};

pub struct CompactSrtEncoder<W: Write> {
    w: W,
    closed: bool,
}

impl<W: Write> CompactSrtEncoder<W> {
    pub fn new(w: W) -> Self {
        Self { w, closed: false }
    }
}

impl<W: Write> SubtitleEncoder for CompactSrtEncoder<W> {
    fn write_entry(&mut self, entry: &SubtitleEntry) -> Result<()> {
        if self.closed {
            return Err(Error::msg("cannot write entry: encoder is already closed"));
        }

        // Multi-line text is folded onto the single cue line.
        let text = entry.text.split_whitespace().collect::<Vec<_>>().join(" ");

        writeln!(
            &mut self.w,
            "{} --> {} {}",
            format_timestamp(entry.start, ','),
            format_timestamp(entry.end, ','),
            text
        )?;
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

/// Parse compact lines back into entries numbered from 1.
///
/// Lines with fewer than four space-separated fields (blank lines, lines without text) are
/// skipped. A line with a malformed timestamp is an error.
pub fn parse_compact_srt(input: &str) -> Result<Vec<SubtitleEntry>> {
    let mut entries = Vec::new();

    for (line_no, line) in input.lines().enumerate() {
        let items: Vec<&str> = line.split(' ').collect();
        if items.len() < 4 {
            continue;
        }

        let bad_line = |what: &str| Error::msg(format!("line {}: {what}", line_no + 1));

        if items[1] != "-->" {
            return Err(bad_line("expected `-->` between timestamps"));
        }
        let start = parse_timestamp(items[0]).ok_or_else(|| bad_line("invalid start timestamp"))?;
        let end = parse_timestamp(items[2]).ok_or_else(|| bad_line("invalid end timestamp"))?;

        entries.push(SubtitleEntry {
            index: entries.len() + 1,
            start,
            end,
            text: items[3..].join(" ").trim().to_owned(),
        });
    }

    Ok(entries)
}

/// Parse `HH:MM:SS,mmm` (a `.` separator is accepted too).
fn parse_timestamp(s: &str) -> Option<Duration> {
    let (hms, ms) = s.split_once([',', '.'])?;
    let mut parts = hms.split(':');

    let h: u64 = parts.next()?.parse().ok()?;
    let m: u64 = parts.next()?.parse().ok()?;
    let sec: u64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() || m >= 60 || sec >= 60 {
        return None;
    }

    let ms: u64 = ms.trim_end().parse().ok()?;
    if ms >= 1000 {
        return None;
    }

    Some(Duration::from_millis(((h * 60 + m) * 60 + sec) * 1000 + ms))
}
