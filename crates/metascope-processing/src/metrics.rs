//! Derived metrics for decoded images.
//!
//! All functions are total: any integer input yields a value, never a panic.

/// Width over height with three decimals, or `"N/A"` when the height is zero.
pub fn aspect_ratio_decimal(width: i64, height: i64) -> String {
    if height == 0 {
        return "N/A".to_string();
    }
    format!("{:.3}", width as f64 / height as f64)
}

/// Reduced `W:H` ratio, or an empty string when either side is not positive.
pub fn aspect_ratio_fraction(width: i64, height: i64) -> String {
    if width <= 0 || height <= 0 {
        return String::new();
    }
    let divisor = gcd(width, height);
    format!("{}:{}", width / divisor, height / divisor)
}

/// Pixel count in millions.
pub fn megapixels(width: i64, height: i64) -> f64 {
    (width as f64 * height as f64) / 1_000_000.0
}

/// Base-1024 size with one decimal (`1.5 KiB`), capped at TiB.
pub fn human_bytes(size: i64) -> String {
    const UNIT: i64 = 1024;
    const SUFFIXES: [char; 4] = ['K', 'M', 'G', 'T'];

    if size < 0 {
        return "unknown".to_string();
    }
    if size < UNIT {
        return format!("{} B", size);
    }

    let mut div = UNIT;
    let mut exp = 0;
    let mut n = size / UNIT;
    while n >= UNIT && exp < SUFFIXES.len() - 1 {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }

    format!("{:.1} {}iB", size as f64 / div as f64, SUFFIXES[exp])
}

// Never returns 0, so callers can always divide by the result.
fn gcd(a: i64, b: i64) -> i64 {
    let (mut a, mut b) = (a.unsigned_abs(), b.unsigned_abs());
    while b != 0 {
        (a, b) = (b, a % b);
    }
    match i64::try_from(a) {
        Ok(0) => 1,
        Ok(value) => value,
        Err(_) => 1,
    }
}
