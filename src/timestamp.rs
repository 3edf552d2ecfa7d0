/// Formats seconds as `HH:MM:SS.mmm`; hours widen past 99.
pub fn time_str(sec: f64) -> String {
    let total_ms = (sec.max(0.0) * 1000.0) as u64;

    let (hours, rest) = (total_ms / 3_600_000, total_ms % 3_600_000);
    let (minutes, rest) = (rest / 60_000, rest % 60_000);
    let (seconds, milliseconds) = (rest / 1000, rest % 1000);

    format!("{hours:02}:{minutes:02}:{seconds:02}.{milliseconds:03}")
}

#[test]
fn formats_durations() {
    assert_eq!(time_str(0.0), "00:00:00.000");
    assert_eq!(time_str(61.5), "00:01:01.500");
    assert_eq!(time_str(3600.0 * 123.0 + 0.25), "123:00:00.250");
}
