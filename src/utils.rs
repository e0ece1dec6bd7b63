use std::ops::Range;
use std::time::Duration;

pub fn to_millis(duration: Duration) -> u64 {
    (duration.as_secs() * 1_000) + (duration.subsec_nanos() / 1_000_000) as u64
}

/// Splits `0..len` into `workers` contiguous ranges of `len / workers` entries
/// each, with the remainder folded into the last range. Callers must ensure
/// `workers >= 1`; a range may be empty when `len < workers`.
pub fn contiguous_ranges(len: usize, workers: usize) -> Vec<Range<usize>> {
    let chunk = len / workers;

    (0..workers)
        .map(|worker| {
            let start = worker * chunk;
            let end = if worker == workers - 1 { len } else { start + chunk };
            start..end
        })
        .collect()
}

#[cfg(test)]
mod tests {

    use super::contiguous_ranges;

    fn assert_exact_cover(len: usize, workers: usize) {
        let ranges = contiguous_ranges(len, workers);

        assert_eq!(ranges.len(), workers);
        assert_eq!(ranges[0].start, 0);
        assert_eq!(ranges[workers - 1].end, len);

        // contiguity gives us both "no gaps" and "no overlaps"
        for pair in ranges.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
    }

    #[test]
    fn single_worker_takes_everything() {
        let ranges = contiguous_ranges(10, 1);
        assert_eq!(ranges, vec![0..10]);
    }

    #[test]
    fn remainder_folds_into_last_range() {
        let ranges = contiguous_ranges(10, 3);
        assert_eq!(ranges, vec![0..3, 3..6, 6..10]);
    }

    #[test]
    fn covers_larger_work_sequences() {
        // 100 items give 4950 unordered pairs
        assert_exact_cover(4950, 7);
        assert_exact_cover(10, 1);
        assert_exact_cover(10, 3);
    }

    #[test]
    fn tolerates_more_workers_than_work() {
        let ranges = contiguous_ranges(1, 2);
        assert_eq!(ranges, vec![0..0, 0..1]);
        assert_exact_cover(1, 2);
    }
}
