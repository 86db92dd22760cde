use std::cmp::Ordering;
use std::time::Duration;

use serde::Serialize;

use crate::align::GlobalRecord;
use crate::{Error, Result};

/// One numbered subtitle cue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubtitleEntry {
    /// 1-based position in emission order.
    pub index: usize,
    pub start: Duration,
    pub end: Duration,
    pub text: String,
}

/// Number `records` `1..=n` in input order.
///
/// Every record must satisfy `0 <= start < end`; anything else means an upstream stage broke
/// its ordering contract, so the whole run fails instead of skipping the record. Text is passed
/// through unchanged.
pub fn assemble(records: &[GlobalRecord]) -> Result<Vec<SubtitleEntry>> {
    records
        .iter()
        .enumerate()
        .map(|(position, record)| {
            let invalid = || Error::InvalidRecord {
                position,
                start: record.start_seconds,
                end: record.end_seconds,
            };

            if record.start_seconds.partial_cmp(&record.end_seconds) != Some(Ordering::Less) {
                return Err(invalid());
            }

            let start = Duration::try_from_secs_f64(record.start_seconds).map_err(|_| invalid())?;
            let end = Duration::try_from_secs_f64(record.end_seconds).map_err(|_| invalid())?;

            Ok(SubtitleEntry {
                index: position + 1,
                start,
                end,
                text: record.text.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_are_one_based_and_text_is_untouched() -> anyhow::Result<()> {
        let records = [
            GlobalRecord::speech(0.0, 1.5, " hello "),
            GlobalRecord::silence(1.5, 4.0),
            GlobalRecord::speech(4.0, 5.25, "world"),
        ];

        let entries = assemble(&records)?;

        let indices: Vec<_> = entries.iter().map(|e| e.index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
        assert_eq!(entries[0].text, " hello ");
        assert_eq!(entries[1].text, crate::align::NO_SPEECH_MARKER);
        assert_eq!(entries[2].start, Duration::from_secs(4));
        assert_eq!(entries[2].end, Duration::from_millis(5_250));
        Ok(())
    }

    #[test]
    fn empty_input_is_fine() -> anyhow::Result<()> {
        assert!(assemble(&[])?.is_empty());
        Ok(())
    }

    #[test]
    fn zero_length_record_is_fatal() {
        let records = [
            GlobalRecord::speech(0.0, 1.0, "ok"),
            GlobalRecord::speech(2.0, 2.0, "bad"),
        ];
        let err = assemble(&records).unwrap_err();
        assert!(matches!(err, Error::InvalidRecord { position: 1, .. }));
    }

    #[test]
    fn negative_or_non_finite_times_are_fatal() {
        let negative = [GlobalRecord::speech(-1.0, 1.0, "bad")];
        assert!(matches!(
            assemble(&negative),
            Err(Error::InvalidRecord { position: 0, .. })
        ));

        let nan = [GlobalRecord::speech(f64::NAN, 1.0, "bad")];
        assert!(assemble(&nan).is_err());
    }
}
