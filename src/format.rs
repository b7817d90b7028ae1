const UNITS: [&str; 7] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB", "EiB"];

/// Format a byte count with binary (1024-based) units.
///
/// Below 10 bytes the value is printed as is; otherwise it is scaled to the
/// largest unit not exceeding it and rounded to one decimal, which is only
/// shown while the scaled value is under 10 ("1.5 KiB", "10 KiB", "300 B").
pub fn format_bytes(bytes: u64) -> String {
    if bytes < 10 {
        return format!("{} B", bytes);
    }

    let mut exp = 0;
    let mut scale: u64 = 1;
    while exp + 1 < UNITS.len() && bytes / scale >= 1024 {
        scale *= 1024;
        exp += 1;
    }

    let val = ((bytes as f64 / scale as f64) * 10.0 + 0.5).floor() / 10.0;
    if val < 10.0 {
        format!("{:.1} {}", val, UNITS[exp])
    } else {
        format!("{:.0} {}", val, UNITS[exp])
    }
}
