//! Progress callbacks that report through `tracing`.

use tracing::info;

/// Percentage of `processed` over `total`, rounded down. An empty run is 100%.
pub fn percent(processed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((processed.min(total) as u128 * 100) / total as u128) as u8
}

/// Build an `on_progress` callback that logs each slice.
///
/// Only slices that move the percentage forward are logged, so a run with
/// thousands of tiny slices emits at most 101 records.
pub fn log_progress(label: impl Into<String>) -> impl FnMut(usize, usize) + 'static {
    let label = label.into();
    let mut last: Option<u8> = None;
    move |processed, total| {
        let pct = percent(processed, total);
        if last.map_or(true, |prev| pct > prev) {
            last = Some(pct);
            info!(label = %label, processed, total, percent = pct, "Progress");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_rounds_down_and_clamps() {
        assert_eq!(percent(0, 5), 0);
        assert_eq!(percent(2, 5), 40);
        assert_eq!(percent(5, 5), 100);
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(9, 5), 100);
        assert_eq!(percent(0, 0), 100);
    }

    #[test]
    fn log_progress_is_callable_repeatedly() {
        let mut cb = log_progress("test");
        for n in [2, 4, 4, 5] {
            cb(n, 5);
        }
    }
}
