//! Timecode and duration formatting helpers.
//!
//! Frame/timecode conversions shared by the timeline, the render queue
//! and the headless helper processes. Fractional frame rates (like
//! 23.976) are rounded to integer fps for display math, otherwise the
//! timecode would slowly drift over long material.

use crate::{Frame, Ratio, TimeSec};

/// Parses a frame rate given either as a decimal (`23.976`) or as the
/// `num/den` rational MLT profiles carry (`30000/1001`). Returns `None`
/// for unparsable or non-positive rates.
pub fn parse_fps(s: &str) -> Option<f64> {
    let fps = if s.contains('/') {
        s.parse::<Ratio>().ok()?.as_f64()
    } else {
        s.trim().parse::<f64>().ok()?
    };
    (fps > 0.0).then_some(fps)
}

/// Returns `hh:mm:ss:ff` timecode for a frame position.
pub fn tc_string(frame: Frame, fps: f64) -> String {
    let (hours, mins, sec, fr) = split_frame(frame, fps);
    format!("{:02}:{:02}:{:02}:{:02}", hours, mins, sec, fr)
}

/// Returns `hh-mm-ss-ff`, safe for use in file names.
pub fn tc_string_for_filename(frame: Frame, fps: f64) -> String {
    let (hours, mins, sec, fr) = split_frame(frame, fps);
    format!("{:02}-{:02}-{:02}-{:02}", hours, mins, sec, fr)
}

/// Returns timecode with leading zero fields stripped, keeping at least
/// four characters (`00:00:12:03` becomes `12:03`).
pub fn tc_string_short(frame: Frame, fps: f64) -> String {
    let mut tc = tc_string(frame, fps);
    while tc.len() > 4 {
        if tc.starts_with('0') || tc.starts_with(':') {
            tc.remove(0);
        } else {
            break;
        }
    }
    tc
}

/// Parses an `hh:mm:ss:ff` timecode back into a frame position.
///
/// Uses base-60 accumulation over the fields and then corrects the
/// seconds portion for the actual frame rate. Unparsable input yields
/// frame 0 rather than an error, matching how the editor treats typed
/// timecodes.
pub fn tc_frame(tc: &str, fps: f64) -> Frame {
    let mut sum: i64 = 0;
    let mut last: i64 = 0;
    for part in tc.split(':') {
        let num = match part.trim().parse::<i64>() {
            Ok(n) => n,
            Err(_) => return 0,
        };
        sum = sum * 60 + num;
        last = num;
    }

    // The accumulated sum assumes 60 fps; rescale everything except the
    // frames field, which is already in frames.
    sum -= last;
    sum = (sum as f64 / (60.0 / fps.round())) as i64;
    sum + last
}

/// Returns a compact length string for a clip length in frames,
/// e.g. `1h2m3s`, `45s`, or `12fr` for sub-second lengths.
pub fn clip_length_string(length: Frame, fps: f64) -> String {
    let whole_fps = fps.round() as i64;
    let fr = if whole_fps > 0 { length % whole_fps } else { 0 };
    let total_sec = length as f64 / fps;
    let total_mins = total_sec / 60.0;
    let sec = (total_sec % 60.0).floor() as i64;
    let hours = (total_mins / 60.0).floor() as i64;
    let mins = (total_mins % 60.0).floor() as i64;

    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{}h", hours));
    }
    if mins > 0 || hours > 0 {
        out.push_str(&format!("{}m", mins));
    }
    if sec > 0 || !out.is_empty() {
        out.push_str(&format!("{}s", sec));
    } else {
        out.push_str(&format!("{}fr", fr));
    }
    out
}

/// Returns an elapsed-time string for fractional seconds, e.g.
/// `45s`, `2m 5s`, `1h 2m 5s`, extending to days past 24 hours.
pub fn duration_string(seconds: TimeSec) -> String {
    let total_mins = seconds / 60.0;
    let sec = (seconds % 60.0) as i64;
    let total_hours = total_mins / 60.0;
    let mins = (total_mins % 60.0) as i64;

    if total_hours >= 24.0 {
        let days = (total_hours / 24.0) as i64;
        let hours = (total_hours % 24.0) as i64;
        return format!("{} days {}h {}m {}s", days, hours, mins, sec);
    }
    if total_hours >= 1.0 {
        return format!("{}h {}m {}s", total_hours as i64, mins, sec);
    }
    if total_mins >= 1.0 {
        return format!("{}m {}s", total_mins as i64, sec);
    }
    format!("{}s", sec)
}

/// Truncates an fps string to two decimals (`"23.976023"` -> `"23.97"`).
pub fn fps_string_two_decimals(fps_str: &str) -> String {
    match fps_str.split_once('.') {
        Some((whole, decimals)) => {
            let decimals = &decimals[..decimals.len().min(2)];
            format!("{}.{}", whole, decimals)
        }
        None => fps_str.to_string(),
    }
}

fn split_frame(frame: Frame, fps: f64) -> (i64, i64, i64, i64) {
    let whole_fps = fps.round() as i64;
    if whole_fps <= 0 {
        return (0, 0, 0, 0);
    }
    let fr = frame % whole_fps;
    let total_sec = frame / whole_fps;
    let total_mins = total_sec / 60;
    let sec = total_sec % 60;
    let hours = total_mins / 60;
    let mins = total_mins % 60;
    (hours, mins, sec, fr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tc_string_basic() {
        assert_eq!(tc_string(0, 25.0), "00:00:00:00");
        // 1h 2m 3s 4fr at 25 fps
        let frame = 25 * (3600 + 2 * 60 + 3) + 4;
        assert_eq!(tc_string(frame, 25.0), "01:02:03:04");
    }

    #[test]
    fn test_tc_string_rounds_fractional_fps() {
        // 23.976 is displayed with integer 24 fps fields
        assert_eq!(tc_string(24, 23.976), "00:00:01:00");
    }

    #[test]
    fn test_tc_frame_round_trip() {
        let frame = 25 * (3600 + 2 * 60 + 3) + 4;
        assert_eq!(tc_frame("01:02:03:04", 25.0), frame);
        assert_eq!(tc_frame(&tc_string(frame, 25.0), 25.0), frame);
    }

    #[test]
    fn test_tc_frame_invalid_input_is_zero() {
        assert_eq!(tc_frame("garbage", 25.0), 0);
        assert_eq!(tc_frame("00:xx:00:00", 25.0), 0);
    }

    #[test]
    fn test_tc_string_short_strips_leading_fields() {
        let frame = 12 * 25 + 3; // 12s 3fr
        assert_eq!(tc_string_short(frame, 25.0), "12:03");
        assert_eq!(tc_string_short(0, 25.0), "0:00");
    }

    #[test]
    fn test_tc_string_for_filename() {
        let frame = 25 * 61 + 1;
        assert_eq!(tc_string_for_filename(frame, 25.0), "00-01-01-01");
    }

    #[test]
    fn test_clip_length_string() {
        assert_eq!(clip_length_string(12, 25.0), "12fr");
        assert_eq!(clip_length_string(30, 25.0), "1s");
        let frames = 25 * (2 * 3600 + 3 * 60 + 4);
        assert_eq!(clip_length_string(frames, 25.0), "2h3m4s");
        // Minutes are shown once an hour is present, even when zero
        assert_eq!(clip_length_string(25 * 3600, 25.0), "1h0m0s");
    }

    #[test]
    fn test_duration_string() {
        assert_eq!(duration_string(45.0), "45s");
        assert_eq!(duration_string(125.0), "2m 5s");
        assert_eq!(duration_string(3725.0), "1h 2m 5s");
        assert_eq!(duration_string(90061.0), "1 days 1h 1m 1s");
    }

    #[test]
    fn test_parse_fps() {
        assert_eq!(parse_fps("25"), Some(25.0));
        let ntsc = parse_fps("30000/1001").unwrap();
        assert!((ntsc - 29.97).abs() < 0.01);
        assert_eq!(parse_fps("0"), None);
        assert_eq!(parse_fps("24/0"), None);
        assert_eq!(parse_fps("fast"), None);
    }

    #[test]
    fn test_fps_string_two_decimals() {
        assert_eq!(fps_string_two_decimals("23.976023"), "23.97");
        assert_eq!(fps_string_two_decimals("25"), "25");
        assert_eq!(fps_string_two_decimals("29.9"), "29.9");
    }
}
