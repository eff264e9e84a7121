//! Phone number validation and normalization.
//!
//! Local Egyptian numbers normalize to E.164 (+20…); international numbers
//! are accepted as-is, with a warning when the country code is unrecognized.
//! Branch order matters: an earlier successful match must not be overridden
//! by a later rule.

/// Country codes we recognize without a warning.
const KNOWN_COUNTRY_CODES: &[&str] = &[
    "1", "7", "20", "27", "30", "31", "32", "33", "34", "36", "39", "40", "41", "43", "44", "45",
    "46", "47", "48", "49", "51", "52", "53", "54", "55", "56", "57", "58", "60", "61", "62", "63",
    "64", "65", "66", "81", "82", "84", "86", "90", "91", "92", "93", "94", "95", "98", "971",
    "972", "973", "974", "975", "976", "977", "994", "995", "996", "998",
];

#[derive(Debug, Clone, PartialEq)]
pub struct PhoneValidation {
    pub normalized: Option<String>,
    pub warning: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum PhoneError {
    Empty,
    TooFewDigits,
    TooManyDigits,
    BadInternationalFormat,
    Unrecognized,
}

impl std::fmt::Display for PhoneError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PhoneError::Empty => write!(f, "phone number cannot be empty"),
            PhoneError::TooFewDigits => write!(f, "phone number must contain at least 7 digits"),
            PhoneError::TooManyDigits => write!(f, "phone number cannot exceed 15 digits"),
            PhoneError::BadInternationalFormat => write!(
                f,
                "invalid international phone number format, use +[country code][number]"
            ),
            PhoneError::Unrecognized => write!(
                f,
                "invalid phone number format, use international format \
                 +[country code][number] or a local number"
            ),
        }
    }
}

pub fn validate_phone(raw: &str) -> Result<PhoneValidation, PhoneError> {
    let clean: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    if clean.is_empty() {
        return Err(PhoneError::Empty);
    }

    let digit_count = clean.chars().filter(char::is_ascii_digit).count();
    if digit_count < 7 {
        return Err(PhoneError::TooFewDigits);
    }
    if digit_count > 15 {
        return Err(PhoneError::TooManyDigits);
    }

    if let Some(rest) = clean.strip_prefix('+') {
        return validate_international(&clean, rest);
    }

    if let Some(normalized) = normalize_egyptian(&clean) {
        return Ok(PhoneValidation {
            normalized: Some(normalized),
            warning: None,
        });
    }

    // Permissive fallback: common separator characters, plausible length.
    // A leading `+` was already handled by the international branch.
    let generic = clean
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '-' | '(' | ')' | '.'));
    if generic && (7..=15).contains(&clean.len()) {
        return Ok(PhoneValidation {
            normalized: Some(clean),
            warning: Some(
                "phone number accepted but could not be normalized, consider using \
                 international format +[country code][number]"
                    .to_string(),
            ),
        });
    }

    Err(PhoneError::Unrecognized)
}

fn validate_international(clean: &str, rest: &str) -> Result<PhoneValidation, PhoneError> {
    let well_formed = (2..=15).contains(&rest.len())
        && !rest.starts_with('0')
        && rest.chars().all(|c| c.is_ascii_digit());
    if !well_formed {
        return Err(PhoneError::BadInternationalFormat);
    }

    // Country codes are 1-3 digits; any prefix length on the allow-list counts.
    let known = (1..=3.min(rest.len())).any(|n| KNOWN_COUNTRY_CODES.contains(&&rest[..n]));
    if known {
        Ok(PhoneValidation {
            normalized: Some(clean.to_string()),
            warning: None,
        })
    } else {
        let prefix = &rest[..3.min(rest.len())];
        Ok(PhoneValidation {
            normalized: None,
            warning: Some(format!(
                "unrecognized country code +{prefix}, but format appears valid"
            )),
        })
    }
}

/// Egyptian shapes: `01[0125]` + 8 digits (mobile), `02` + 8 digits
/// (landline), or the same mobile number without its leading zero.
fn normalize_egyptian(clean: &str) -> Option<String> {
    let all_digits = clean.chars().all(|c| c.is_ascii_digit());

    if clean.starts_with('0') && all_digits {
        if is_egyptian_mobile(clean) {
            return Some(format!("+20{}", &clean[1..]));
        }
        if clean.len() == 10 && clean.starts_with("02") {
            return Some(format!("+20{}", &clean[1..]));
        }
    }

    if (10..=11).contains(&clean.len()) {
        let digits: String = clean.chars().filter(char::is_ascii_digit).collect();
        if digits.len() == 10 && is_egyptian_mobile(&format!("0{digits}")) {
            return Some(format!("+20{digits}"));
        }
        if digits.len() == 11 && is_egyptian_mobile(&digits) {
            return Some(format!("+20{}", &digits[1..]));
        }
    }

    None
}

fn is_egyptian_mobile(digits: &str) -> bool {
    digits.len() == 11
        && digits.starts_with("01")
        && matches!(digits.as_bytes()[2], b'0' | b'1' | b'2' | b'5')
        && digits[3..].chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_international_known_code_unchanged() {
        let result = validate_phone("+201012345678").unwrap();
        assert_eq!(result.normalized.as_deref(), Some("+201012345678"));
        assert!(result.warning.is_none());
    }

    #[test]
    fn test_international_strips_whitespace() {
        let result = validate_phone("+20 101 234 5678").unwrap();
        assert_eq!(result.normalized.as_deref(), Some("+201012345678"));
    }

    #[test]
    fn test_international_unknown_code_warns() {
        let result = validate_phone("+99912345678").unwrap();
        assert!(result.normalized.is_none());
        assert!(result.warning.unwrap().contains("unrecognized country code"));
    }

    #[test]
    fn test_international_leading_zero_rejected() {
        assert_eq!(
            validate_phone("+0123456789"),
            Err(PhoneError::BadInternationalFormat)
        );
    }

    #[test]
    fn test_egyptian_mobile_normalized() {
        let result = validate_phone("01012345678").unwrap();
        assert_eq!(result.normalized.as_deref(), Some("+201012345678"));
        assert!(result.warning.is_none());
    }

    #[test]
    fn test_egyptian_mobile_prefixes() {
        for prefix in ["010", "011", "012", "015"] {
            let result = validate_phone(&format!("{prefix}12345678")).unwrap();
            assert_eq!(
                result.normalized,
                Some(format!("+20{}12345678", &prefix[1..]))
            );
        }
    }

    #[test]
    fn test_egyptian_mobile_without_leading_zero() {
        let result = validate_phone("1012345678").unwrap();
        assert_eq!(result.normalized.as_deref(), Some("+201012345678"));
    }

    #[test]
    fn test_egyptian_landline_normalized() {
        let result = validate_phone("0212345678").unwrap();
        assert_eq!(result.normalized.as_deref(), Some("+20212345678"));
    }

    #[test]
    fn test_too_few_digits() {
        assert_eq!(validate_phone("123"), Err(PhoneError::TooFewDigits));
    }

    #[test]
    fn test_too_many_digits() {
        assert_eq!(
            validate_phone("1234567890123456"),
            Err(PhoneError::TooManyDigits)
        );
    }

    #[test]
    fn test_empty_rejected() {
        assert_eq!(validate_phone("   "), Err(PhoneError::Empty));
    }

    #[test]
    fn test_generic_fallback_warns() {
        let result = validate_phone("(555)123-4567").unwrap();
        assert_eq!(result.normalized.as_deref(), Some("(555)123-4567"));
        assert!(result.warning.unwrap().contains("could not be normalized"));
    }

    #[test]
    fn test_letters_rejected() {
        assert_eq!(validate_phone("123x4567"), Err(PhoneError::Unrecognized));
    }
}
