//! Elapsed/remaining time text and progress fill.

/// `M:SS`, minutes without a leading zero, seconds floored and zero-padded.
///
/// Durations that are not yet known arrive as NaN or infinity from some
/// hosts; those, and negative values, render as `0:00`.
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "0:00".to_string();
    }
    let whole = seconds.floor() as u64;
    format!("{}:{:02}", whole / 60, whole % 60)
}

/// Text, fill and raw numbers for one progress refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressView {
    /// Fill of the progress bar, `0.0..=100.0`.
    pub percent: f64,
    pub elapsed: String,
    pub remaining: String,
    pub position_secs: f64,
    pub duration_secs: Option<f64>,
}

impl ProgressView {
    pub fn compute(position_secs: f64, duration_secs: Option<f64>) -> Self {
        let position = if position_secs.is_finite() { position_secs.max(0.0) } else { 0.0 };
        let duration = duration_secs.filter(|d| d.is_finite() && *d > 0.0);

        let (percent, remaining) = match duration {
            Some(d) => (
                (position / d * 100.0).clamp(0.0, 100.0),
                (d - position).max(0.0),
            ),
            None => (0.0, 0.0),
        };

        Self {
            percent,
            elapsed: format_time(position),
            remaining: format!("- {}", format_time(remaining)),
            position_secs: position,
            duration_secs: duration,
        }
    }

    /// Display before anything has been sampled.
    pub fn zero() -> Self {
        Self::compute(0.0, None)
    }
}
