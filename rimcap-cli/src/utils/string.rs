pub fn pretty_bytes(n: u64) -> String {
    const UNITS: [&str; 7] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB", "EiB"];
    let mut val = n as f64;
    let mut idx = 0usize;
    while val >= 1024.0 && idx + 1 < UNITS.len() {
        val /= 1024.0;
        idx += 1;
    }
    if idx == 0 {
        format!("{} {}", sep_u64(n), UNITS[idx])
    } else {
        format!("{:.1} {}", val, UNITS[idx])
    }
}

pub fn sep_u64(mut n: u64) -> String {
    // thousands separator: 12 345 678
    if n < 1_000 {
        return n.to_string();
    }
    let mut parts: Vec<String> = Vec::new();
    while n >= 1_000 {
        parts.push(format!("{:03}", (n % 1_000)));
        n /= 1_000;
    }
    parts.push(n.to_string());
    parts.reverse();
    parts.join(" ")
}

pub fn pretty_rate(mb_per_sec: f64) -> String {
    format!("{mb_per_sec:.1} MiB/s")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pretty_bytes() {
        assert_eq!(pretty_bytes(999), "999 B");
        assert_eq!(pretty_bytes(1023), "1 023 B");
        assert_eq!(pretty_bytes(16 * 1024 * 1024), "16.0 MiB");
        assert_eq!(pretty_bytes(3 * 1024 * 1024 * 1024 / 2), "1.5 GiB");
    }

    #[test]
    fn test_sep_u64() {
        assert_eq!(sep_u64(0), "0");
        assert_eq!(sep_u64(1_000), "1 000");
        assert_eq!(sep_u64(12_345_678), "12 345 678");
    }

    #[test]
    fn test_pretty_rate() {
        assert_eq!(pretty_rate(12.345), "12.3 MiB/s");
    }
}
