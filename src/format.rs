//! Playback position formatting for the overlay text.

/// Slack applied before truncating the tenths digit. Positions such as
/// `12.7` are stored as `12.6999...` and would otherwise render one tenth low.
const TENTHS_EPSILON: f64 = 1e-6;

/// Render a playback position as `MM:SS.T`, or `H:MM:SS.T` past the first hour.
///
/// Minutes and seconds are zero-padded to two digits, the hour field grows
/// without padding and the tenths digit is truncated, never rounded.
/// Callers are expected to pass a finite, non-negative value (see
/// [`sanitize_position`]).
pub fn format_time(total_seconds: f64) -> String {
    let hours = (total_seconds / 3600.0).floor() as u64;
    let minutes = ((total_seconds % 3600.0) / 60.0).floor() as u64;
    let seconds_with_fraction = total_seconds % 60.0;
    let whole_seconds = seconds_with_fraction.floor();
    let tenths = ((seconds_with_fraction - whole_seconds) * 10.0 + TENTHS_EPSILON)
        .floor()
        .min(9.0) as u64;
    let whole_seconds = whole_seconds as u64;

    if hours > 0 {
        format!("{hours}:{minutes:02}:{whole_seconds:02}.{tenths}")
    } else {
        format!("{minutes:02}:{whole_seconds:02}.{tenths}")
    }
}

/// Clamp a position reported by a host into the range `format_time` accepts.
pub fn sanitize_position(p: f64) -> f64 {
    if p.is_finite() && p > 0.0 { p } else { 0.0 }
}
