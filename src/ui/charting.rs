use tapline::time_series::TimeSeriesPoint;

/// Compute X (seconds) and Y (WPM) bounds for the results chart
pub fn compute_chart_params(points: &[TimeSeriesPoint], elapsed_secs: u64) -> (f64, f64) {
    let highest_wpm = points.iter().map(|p| p.wpm).fold(0.0, f64::max);

    let overall_duration = points
        .last()
        .map_or(elapsed_secs as f64, |p| p.t)
        .max(1.0);

    (overall_duration, highest_wpm.round())
}

/// Format a simple numeric label consistently
pub fn format_label(val: f64) -> String {
    if (val - val.round()).abs() < f64::EPSILON {
        format!("{}", val.round())
    } else {
        format!("{val:.2}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_series_spans_elapsed_time() {
        assert_eq!(compute_chart_params(&[], 5), (5.0, 0.0));
        assert_eq!(compute_chart_params(&[], 0), (1.0, 0.0));
    }

    #[test]
    fn bounds_follow_last_sample_and_peak() {
        let points = [
            TimeSeriesPoint::new(1.0, 12.4),
            TimeSeriesPoint::new(2.0, 48.6),
            TimeSeriesPoint::new(3.0, 40.0),
        ];
        assert_eq!(compute_chart_params(&points, 9), (3.0, 49.0));
    }

    #[test]
    fn labels_drop_trailing_zeros() {
        assert_eq!(format_label(60.0), "60");
        assert_eq!(format_label(1.2345), "1.23");
    }
}
