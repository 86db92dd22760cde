//! Post-processing passes over speech interval lists.
//!
//! Each pass is a pure `&[SpeechInterval] -> Vec<SpeechInterval>` transform over a sorted,
//! non-overlapping list. Expansion may let two neighbours grow into the same gap; merging
//! coalesces them, so [`refine`] (filter → expand → merge) always returns a sorted,
//! non-overlapping list.

use tracing::debug;

use crate::interval::SpeechInterval;

/// Refinement parameters in samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RefineParams {
    /// Padding negotiated between neighbouring raw intervals by [`pad_speech`].
    pub speech_pad: usize,
    /// Intervals no longer than this are removed.
    pub short_threshold: usize,
    pub expand_head: usize,
    pub expand_tail: usize,
    pub merge_gap: usize,
}

/// Pad raw segmenter output, splitting narrow gaps evenly between neighbours.
///
/// When two consecutive intervals are closer than `2 * pad`, each side grows by half the gap;
/// otherwise each side grows by `pad`. The first start and the last end pad unconditionally,
/// clamped to `[0, total_length]`.
pub fn pad_speech(
    intervals: &[SpeechInterval],
    pad: usize,
    total_length: usize,
) -> Vec<SpeechInterval> {
    let mut out: Vec<SpeechInterval> = intervals.to_vec();
    let n = out.len();

    for k in 0..n {
        let cur = intervals[k];
        if k == 0 {
            out[k].start = cur.start.saturating_sub(pad);
        }

        if k + 1 < n {
            let next = intervals[k + 1];
            let silence = next.start.saturating_sub(cur.end);
            let grow = if silence < pad.saturating_mul(2) {
                silence / 2
            } else {
                pad
            };
            out[k].end = cur.end.saturating_add(grow).min(total_length);
            out[k + 1].start = next.start.saturating_sub(grow);
        } else {
            out[k].end = cur.end.saturating_add(pad).min(total_length).max(cur.end);
        }
    }

    out
}

/// Drop intervals whose length is at most `threshold` samples.
pub fn remove_short_segments(intervals: &[SpeechInterval], threshold: usize) -> Vec<SpeechInterval> {
    intervals
        .iter()
        .copied()
        .filter(|iv| iv.len() > threshold)
        .collect()
}

/// Grow each interval by `head` / `tail`, never past a neighbour's original boundary.
///
/// Bounds come from the unexpanded neighbours, so the result does not depend on processing
/// order.
pub fn expand_segments(
    intervals: &[SpeechInterval],
    head: usize,
    tail: usize,
    total_length: usize,
) -> Vec<SpeechInterval> {
    let n = intervals.len();
    intervals
        .iter()
        .enumerate()
        .map(|(k, iv)| {
            let lower = if k > 0 { intervals[k - 1].end } else { 0 };
            let upper = if k + 1 < n {
                intervals[k + 1].start
            } else {
                total_length.max(iv.end)
            };

            SpeechInterval::new(
                iv.start.saturating_sub(head).max(lower).min(iv.start),
                iv.end.saturating_add(tail).min(upper).max(iv.end),
            )
        })
        .collect()
}

/// Merge intervals that start less than `gap` samples after the running merged end.
///
/// Merging is transitive: each candidate is compared against the end of the accumulator as
/// extended by earlier merges.
pub fn merge_adjacent_segments(intervals: &[SpeechInterval], gap: usize) -> Vec<SpeechInterval> {
    let mut out: Vec<SpeechInterval> = Vec::with_capacity(intervals.len());

    for &iv in intervals {
        match out.last_mut() {
            Some(acc) if iv.start < acc.end.saturating_add(gap) => {
                acc.end = acc.end.max(iv.end)
            }
            _ => out.push(iv),
        }
    }

    out
}

/// Filter → expand → merge.
///
/// Filtering first keeps noise from being padded into real speech; merging last coalesces
/// intervals that expansion pushed together.
pub fn refine(
    intervals: &[SpeechInterval],
    params: &RefineParams,
    total_length: usize,
) -> Vec<SpeechInterval> {
    let filtered = remove_short_segments(intervals, params.short_threshold);
    let expanded = expand_segments(
        &filtered,
        params.expand_head,
        params.expand_tail,
        total_length,
    );
    let merged = merge_adjacent_segments(&expanded, params.merge_gap);

    debug!(
        input = intervals.len(),
        filtered = filtered.len(),
        merged = merged.len(),
        "refined speech intervals"
    );

    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iv(start: usize, end: usize) -> SpeechInterval {
        SpeechInterval::new(start, end)
    }

    #[test]
    fn merge_within_gap() {
        let input = [iv(0, 100), iv(150, 200)];
        assert_eq!(merge_adjacent_segments(&input, 60), vec![iv(0, 200)]);
        assert_eq!(merge_adjacent_segments(&input, 40), input.to_vec());
    }

    #[test]
    fn merge_gap_comparison_is_strict() {
        let input = [iv(0, 100), iv(150, 200)];
        assert_eq!(merge_adjacent_segments(&input, 50), input.to_vec());
        assert_eq!(merge_adjacent_segments(&input, 51), vec![iv(0, 200)]);
    }

    #[test]
    fn merge_chains_against_extended_end() {
        // 300 is 100 past the original first end but only 40 past the merged end.
        let input = [iv(0, 100), iv(150, 260), iv(300, 400), iv(500, 600)];
        assert_eq!(
            merge_adjacent_segments(&input, 60),
            vec![iv(0, 400), iv(500, 600)]
        );
    }

    #[test]
    fn merge_is_idempotent() {
        let input = [iv(0, 100), iv(150, 260), iv(300, 400), iv(500, 600), iv(900, 950)];
        for gap in [0, 40, 60, 150, 1_000] {
            let once = merge_adjacent_segments(&input, gap);
            assert_eq!(merge_adjacent_segments(&once, gap), once, "gap {gap}");
        }
    }

    #[test]
    fn filter_drops_intervals_at_or_below_threshold() {
        let input = [iv(0, 10), iv(20, 31), iv(40, 50)];
        assert_eq!(remove_short_segments(&input, 10), vec![iv(20, 31)]);
    }

    #[test]
    fn expand_clamps_to_original_neighbours() {
        let input = [iv(100, 200), iv(250, 300), iv(900, 950)];
        let out = expand_segments(&input, 80, 30, 960);
        assert_eq!(out, vec![iv(20, 230), iv(200, 330), iv(820, 960)]);
    }

    #[test]
    fn expand_uses_unexpanded_neighbours() {
        // The middle interval may grow back to 200 even though the first one grew to 230.
        let input = [iv(100, 200), iv(250, 300)];
        let out = expand_segments(&input, 100, 100, 1_000);
        assert_eq!(out, vec![iv(0, 250), iv(200, 400)]);
    }

    #[test]
    fn expand_never_goes_negative_or_past_the_end() {
        let out = expand_segments(&[iv(5, 95)], 10, 10, 100);
        assert_eq!(out, vec![iv(0, 100)]);
    }

    #[test]
    fn pad_splits_narrow_gaps_evenly() {
        let out = pad_speech(&[iv(1_000, 2_000), iv(2_100, 3_000)], 480, 10_000);
        assert_eq!(out, vec![iv(520, 2_050), iv(2_050, 3_480)]);
    }

    #[test]
    fn pad_grows_both_sides_of_wide_gaps() {
        let out = pad_speech(&[iv(1_000, 2_000), iv(5_000, 6_000)], 480, 6_200);
        assert_eq!(out, vec![iv(520, 2_480), iv(4_520, 6_200)]);
    }

    #[test]
    fn pad_clamps_at_the_edges() {
        let out = pad_speech(&[iv(100, 900)], 480, 1_000);
        assert_eq!(out, vec![iv(0, 1_000)]);
    }

    #[test]
    fn pad_of_zero_is_identity() {
        let input = [iv(10, 20), iv(21, 30)];
        assert_eq!(pad_speech(&input, 0, 100), input.to_vec());
    }

    #[test]
    fn refine_filters_before_expanding_and_merges_last() {
        let params = RefineParams {
            speech_pad: 0,
            short_threshold: 50,
            expand_head: 20,
            expand_tail: 20,
            merge_gap: 10,
        };
        // The short middle interval is dropped, so the outer ones expand toward each other
        // only by 20 each and stay apart.
        let input = [iv(100, 200), iv(230, 260), iv(300, 400)];
        assert_eq!(
            refine(&input, &params, 1_000),
            vec![iv(80, 220), iv(280, 420)]
        );

        // With a wider merge gap the expanded intervals coalesce.
        let merged = RefineParams {
            merge_gap: 70,
            ..params
        };
        assert_eq!(refine(&input, &merged, 1_000), vec![iv(80, 420)]);
    }

    #[test]
    fn huge_sample_counts_saturate() {
        let input = [iv(100, 200), iv(250, 300), iv(900, 950)];

        assert_eq!(
            merge_adjacent_segments(&input, usize::MAX),
            vec![iv(100, 950)]
        );
        assert_eq!(
            expand_segments(&input, usize::MAX, usize::MAX, 1_000),
            vec![iv(0, 250), iv(200, 900), iv(300, 1_000)]
        );
        assert_eq!(
            pad_speech(&input, usize::MAX, 1_000),
            vec![iv(0, 225), iv(225, 600), iv(600, 1_000)]
        );

        let params = RefineParams {
            speech_pad: 0,
            short_threshold: 0,
            expand_head: usize::MAX,
            expand_tail: usize::MAX,
            merge_gap: usize::MAX,
        };
        assert_eq!(refine(&input, &params, 1_000), vec![iv(0, 1_000)]);
    }

    #[test]
    fn refine_of_empty_is_empty() {
        assert!(refine(&[], &RefineParams::default(), 0).is_empty());
    }
}
