use std::time::Duration;

use crate::Result;
use crate::subtitle::SubtitleEntry;

/// Streaming sink for assembled subtitle entries.
///
/// Encoders write entries in the order they receive them and must preserve index, timing and
/// text exactly; `close` finalizes the output and is idempotent.
pub trait SubtitleEncoder {
    fn write_entry(&mut self, entry: &SubtitleEntry) -> Result<()>;
    fn close(&mut self) -> Result<()>;
}

/// Format a duration as `HH:MM:SS{sep}mmm`, rounding to the nearest millisecond.
///
/// SubRip uses `,` as the millisecond separator; WebVTT uses `.`.
pub(crate) fn format_timestamp(d: Duration, ms_separator: char) -> String {
    let total_ms = (d.as_nanos() + 500_000) / 1_000_000;

    let ms = total_ms % 1000;
    let total_s = total_ms / 1000;

    let s = total_s % 60;
    let total_m = total_s / 60;

    let m = total_m % 60;
    let h = total_m / 60;

    format!("{h:02}:{m:02}:{s:02}{ms_separator}{ms:03}")
}

/// Cue text with surrounding whitespace and blank lines removed.
///
/// A blank line terminates a cue in both SubRip and WebVTT, so it can never appear inside one.
pub(crate) fn cue_text(text: &str) -> String {
    text.trim()
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
