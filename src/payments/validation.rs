use crate::config::PhoneConfig;
use crate::payments::error::{PaymentError, PaymentResult};

pub const INVALID_PHONE: &str = "invalid phone";
pub const INVALID_AMOUNT: &str = "invalid amount";

/// Normalize a phone number to the gateway's `<country code><subscriber>` form.
///
/// Non-digits are stripped first. A number already carrying the country code
/// is kept as is; otherwise a leading trunk `0` is dropped and the code
/// prepended.
pub fn normalize_phone(raw: &str, rules: &PhoneConfig) -> PaymentResult<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < rules.min_digits {
        return Err(PaymentError::validation(INVALID_PHONE, "phone"));
    }

    if digits.starts_with(&rules.country_code) {
        return Ok(digits);
    }

    let subscriber = digits.trim_start_matches('0');
    if subscriber.is_empty() {
        return Err(PaymentError::validation(INVALID_PHONE, "phone"));
    }
    Ok(format!("{}{}", rules.country_code, subscriber))
}

pub fn validate_amount(amount: i64) -> PaymentResult<u64> {
    if amount < 1 {
        return Err(PaymentError::validation(INVALID_AMOUNT, "amount"));
    }
    Ok(amount as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> PhoneConfig {
        PhoneConfig::default()
    }

    #[test]
    fn local_numbers_get_country_code() {
        assert_eq!(normalize_phone("0712345678", &rules()).unwrap(), "254712345678");
        assert_eq!(normalize_phone("712345678", &rules()).unwrap(), "254712345678");
        assert_eq!(normalize_phone("0110 123 456", &rules()).unwrap(), "254110123456");
    }

    #[test]
    fn international_numbers_are_kept() {
        assert_eq!(normalize_phone("254712345678", &rules()).unwrap(), "254712345678");
        assert_eq!(
            normalize_phone("+254 712-345-678", &rules()).unwrap(),
            "254712345678"
        );
    }

    #[test]
    fn short_numbers_are_rejected() {
        for raw in ["", "   ", "07123", "12345678", "+254-12"] {
            let err = normalize_phone(raw, &rules()).expect_err("should reject");
            assert_eq!(err.user_message(), INVALID_PHONE);
        }
    }

    #[test]
    fn all_zero_number_is_rejected() {
        assert!(normalize_phone("000000000", &rules()).is_err());
    }

    #[test]
    fn non_positive_amounts_are_rejected() {
        for amount in [0, -1, -500, i64::MIN] {
            let err = validate_amount(amount).expect_err("should reject");
            assert!(matches!(
                err,
                PaymentError::ValidationError { ref field, .. } if field.as_deref() == Some("amount")
            ));
        }
        assert_eq!(validate_amount(1).unwrap(), 1);
        assert_eq!(validate_amount(2500).unwrap(), 2500);
    }
}
