/// Characters per word in the standard WPM convention.
pub const CHARS_PER_WORD: f64 = 5.0;

/// `round((chars / 5) / (secs / 60))`, or 0 when no time has elapsed.
pub fn calculate_wpm(chars_typed: usize, elapsed_secs: u64) -> u32 {
    if elapsed_secs == 0 {
        return 0;
    }
    let words = chars_typed as f64 / CHARS_PER_WORD;
    let minutes = elapsed_secs as f64 / 60.0;
    (words / minutes).round() as u32
}

/// Share of keystrokes that matched, based on the cumulative error count.
/// An untouched session reports 100. Clamped to `[0, 100]` since backspace can
/// leave more errors than typed positions.
pub fn calculate_accuracy(chars_typed: usize, errors: usize) -> u32 {
    if chars_typed == 0 {
        return 100;
    }
    let ratio = (chars_typed as f64 - errors as f64) / chars_typed as f64;
    (ratio * 100.0).round().clamp(0.0, 100.0) as u32
}

pub fn words_typed(chars_typed: usize) -> u32 {
    (chars_typed as f64 / CHARS_PER_WORD).round() as u32
}

/// `mm:ss`
pub fn format_time(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

pub fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    Some(data.iter().sum::<f64>() / data.len() as f64)
}

/// Population standard deviation.
pub fn std_dev(data: &[f64]) -> Option<f64> {
    let avg = mean(data)?;
    let variance = data
        .iter()
        .map(|value| {
            let diff = avg - value;
            diff * diff
        })
        .sum::<f64>()
        / data.len() as f64;
    Some(variance.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wpm_uses_five_char_words() {
        assert_eq!(calculate_wpm(7, 6), 14);
        assert_eq!(calculate_wpm(300, 60), 60);
        assert_eq!(calculate_wpm(150, 30), 60);
    }

    #[test]
    fn wpm_is_zero_without_elapsed_time() {
        assert_eq!(calculate_wpm(100, 0), 0);
        assert_eq!(calculate_wpm(0, 0), 0);
    }

    #[test]
    fn accuracy_rounds_to_nearest() {
        assert_eq!(calculate_accuracy(3, 1), 67);
        assert_eq!(calculate_accuracy(7, 0), 100);
        assert_eq!(calculate_accuracy(4, 1), 75);
    }

    #[test]
    fn accuracy_untouched_session_is_perfect() {
        assert_eq!(calculate_accuracy(0, 0), 100);
        assert_eq!(calculate_accuracy(0, 5), 100);
    }

    #[test]
    fn accuracy_never_negative() {
        assert_eq!(calculate_accuracy(1, 3), 0);
    }

    #[test]
    fn words_typed_rounds() {
        assert_eq!(words_typed(0), 0);
        assert_eq!(words_typed(7), 1);
        assert_eq!(words_typed(8), 2);
    }

    #[test]
    fn format_time_pads() {
        assert_eq!(format_time(0), "00:00");
        assert_eq!(format_time(65), "01:05");
        assert_eq!(format_time(300), "05:00");
    }

    #[test]
    fn mean_of_samples() {
        assert_eq!(mean(&[10., 20., 30., 15., 22.]), Some(19.4));
        assert_eq!(mean(&[42.0]), Some(42.0));
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn std_dev_of_samples() {
        assert_eq!(std_dev(&[15., 7., 55.]), Some(20.997354330698162));
        assert_eq!(std_dev(&[5.0, 5.0, 5.0]), Some(0.0));
        assert_eq!(std_dev(&[]), None);
    }
}
