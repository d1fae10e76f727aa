use std::cmp::Ordering;

const BYTE_UNITS: [&str; 6] = ["KiB", "MiB", "GiB", "TiB", "PiB", "EiB"];

pub fn format_padded(input: &str, length: usize) -> String {
    let input_length = input.chars().count();

    match input_length.cmp(&length) {
        Ordering::Equal => input.to_string(),
        Ordering::Less => format!("{:padded_length$}", input, padded_length = length),
        Ordering::Greater => {
            let truncated: String = input.chars().take(length.saturating_sub(3)).collect();
            format!("{}...", truncated)
        }
    }
}

/// Human-readable size in IEC units.
pub fn format_bytes(bytes: i64) -> String {
    const UNIT: i64 = 1024;
    if bytes < UNIT {
        return format!("{} B", bytes);
    }

    let mut div = UNIT;
    let mut exp = 0;
    let mut n = bytes / UNIT;
    while n >= UNIT && exp < BYTE_UNITS.len() - 1 {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }

    format!("{:.2} {}", bytes as f64 / div as f64, BYTE_UNITS[exp])
}

/// Thousands separators, plus a short suffix for large values.
pub fn format_number(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        grouped.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let value = n as f64;
    if n >= 1_000_000_000_000 {
        format!("{} ({:.2}T)", grouped, value / 1e12)
    } else if n >= 1_000_000_000 {
        format!("{} ({:.2}B)", grouped, value / 1e9)
    } else if n >= 1_000_000 {
        format!("{} ({:.2}M)", grouped, value / 1e6)
    } else if n >= 1_000 {
        format!("{} ({:.2}K)", grouped, value / 1e3)
    } else {
        grouped
    }
}
