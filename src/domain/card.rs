// ============================================================================
// Card-Number Validator
// ============================================================================
//
// Stateless well-formedness check for card numbers plus the display-safe
// suffix helper. Only the suffix ever reaches storage; the raw number is
// dropped after validation.
//
// ============================================================================

/// Minimum digit count for a card number to even be considered.
const MIN_CARD_DIGITS: usize = 12;

/// Returns true iff the input, after stripping non-digit characters, has at
/// least 12 digits and passes the Luhn mod-10 check.
pub fn validate(number: &str) -> bool {
    let digits: Vec<u32> = number.chars().filter_map(|c| c.to_digit(10)).collect();

    if digits.len() < MIN_CARD_DIGITS {
        return false;
    }

    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                d
            }
        })
        .sum();

    sum % 10 == 0
}

/// Last 4 digits of the input after stripping non-digit characters.
///
/// A display helper, not a validator: inputs with fewer than 4 digits yield
/// a shorter string rather than an error.
pub fn last_four(number: &str) -> String {
    let digits: Vec<char> = number.chars().filter(|c| c.is_ascii_digit()).collect();
    let start = digits.len().saturating_sub(4);
    digits[start..].iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_luhn_number() {
        assert!(validate("4111111111111111"));
    }

    #[test]
    fn test_invalid_check_digit() {
        assert!(!validate("4111111111111112"));
    }

    #[test]
    fn test_separators_are_stripped() {
        assert!(validate("4111 1111 1111 1111"));
        assert!(validate("4111-1111-1111-1111"));
    }

    #[test]
    fn test_too_few_digits_rejected() {
        assert!(!validate("26"));
        assert!(!validate(""));
    }

    #[test]
    fn test_non_numeric_rejected() {
        assert!(!validate("not-a-card-number"));
    }

    #[test]
    fn test_last_four() {
        assert_eq!(last_four("4111 1111 1111 1111"), "1111");
        assert_eq!(last_four("4111111111111234"), "1234");
    }

    #[test]
    fn test_last_four_short_input() {
        assert_eq!(last_four("42"), "42");
        assert_eq!(last_four(""), "");
    }
}
