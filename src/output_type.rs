use serde::Deserialize;

/// The supported output formats for subtitle entries.
///
/// Each variant maps to a concrete `SubtitleEncoder` implementation. With the `cli` feature the
/// enum doubles as a `clap` value (`srt`, `compact-srt`, `vtt`, `json`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "kebab-case")]
pub enum OutputType {
    /// SubRip subtitles.
    #[default]
    Srt,

    /// One `start --> end text` line per entry.
    CompactSrt,

    /// WebVTT subtitles.
    Vtt,

    /// A JSON array of entries.
    Json,
}

impl OutputType {
    /// Suffix appended to the input's file stem when writing output next to it.
    pub fn file_suffix(self) -> &'static str {
        match self {
            OutputType::Srt => ".srt",
            OutputType::CompactSrt => "_compact.srt",
            OutputType::Vtt => ".vtt",
            OutputType::Json => ".json",
        }
    }
}
