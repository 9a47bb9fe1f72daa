/// Round to `decimals` places on the exact binary value, ties to even
pub fn round_to(value: f64, decimals: usize) -> f64 {
    format!("{:.*}", decimals, value).parse().unwrap_or(value)
}

pub fn round2(value: f64) -> f64 {
    round_to(value, 2)
}

/// Render a float the way the solver's reader expects: integral values keep a
/// trailing `.0`.
pub fn format_float(value: f64) -> String {
    let text = format!("{}", value);
    if value.is_finite() && !text.contains('.') && !text.contains('e') {
        format!("{}.0", text)
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round2() {
        assert_eq!(round2(1.23456), 1.23);
        assert_eq!(round2(-0.987), -0.99);
        assert_eq!(round2(147.0), 147.0);
    }

    #[test]
    fn test_round2_ties_to_even() {
        // Exactly representable halves
        assert_eq!(round2(150.125), 150.12);
        assert_eq!(round2(150.375), 150.38);
        assert_eq!(round2(-2.625), -2.62);
        // 0.125 and 0.375 below are exact; 1.005 is stored just under the half
        assert_eq!(round_to(0.125, 2), 0.12);
        assert_eq!(round_to(1.005, 2), 1.0);
    }

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(-99.0), "-99.0");
        assert_eq!(format_float(1.48), "1.48");
        assert_eq!(format_float(16.107), "16.107");
        assert_eq!(format_float(0.0), "0.0");
    }
}
