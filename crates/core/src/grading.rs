//! Percentage math and score presentation shared by progress and quiz views.

/// Completion or score percentage, rounded half-up.
///
/// Returns 0 when `total` is zero so callers never divide by zero for
/// empty topics, subjects, or quizzes.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn percentage(part: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((part as f64 / total as f64) * 100.0).round() as u32
}

/// Maps a score percentage onto its display color band.
///
/// Thresholds are evaluated top-down and the first match wins.
#[must_use]
pub fn score_color(percent: u32) -> &'static str {
    if percent >= 100 {
        "#05A000"
    } else if percent >= 90 {
        "#07D100"
    } else if percent >= 80 {
        "#08FB00"
    } else if percent >= 75 {
        "#51FF00"
    } else if percent >= 60 {
        "#ECC100"
    } else if percent >= 50 {
        "#EC8B00"
    } else if percent >= 40 {
        "#BF5700"
    } else if percent >= 30 {
        "#F73100"
    } else {
        "#FF0000"
    }
}
