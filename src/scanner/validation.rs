/// Lengths accepted by the decoder filter: EAN-13 and EAN-8.
pub const VALID_CODE_LENGTHS: [usize; 2] = [13, 8];

/// A decoded code is usable only if it is exactly 13 or 8 decimal digits.
pub fn is_valid_code(code: &str) -> bool {
    VALID_CODE_LENGTHS.contains(&code.len()) && code.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ean13_and_ean8() {
        assert!(is_valid_code("4006381333931"));
        assert!(is_valid_code("96385074"));
    }

    #[test]
    fn rejects_wrong_lengths() {
        assert!(!is_valid_code(""));
        assert!(!is_valid_code("1234567"));
        assert!(!is_valid_code("123456789"));
        assert!(!is_valid_code("036000291452")); // 12-digit UPC-A
        assert!(!is_valid_code("40063813339310"));
    }

    #[test]
    fn rejects_non_digits() {
        assert!(!is_valid_code("400638133393X"));
        assert!(!is_valid_code("9638507 "));
        assert!(!is_valid_code("-9638507"));
        // Non-ASCII digits are not decimal digits for this filter.
        assert!(!is_valid_code("٠١٢٣٤٥٦٧"));
    }
}
