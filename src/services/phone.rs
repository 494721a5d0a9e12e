use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::models::payment::PaymentMethod;

/// Canonical local mobile number: `07` followed by eight digits.
pub static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^07\d{8}$").expect("valid phone pattern"));

/// Why a number was refused for a mobile-money operator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PhoneError {
    #[error("Phone number must be exactly 10 digits")]
    WrongLength,

    #[error("Phone number must start with 07")]
    WrongPrefix,

    #[error("{operator} numbers must start with {}", .prefixes.join(", "))]
    OperatorMismatch {
        operator: &'static str,
        prefixes: &'static [&'static str],
    },

    #[error("{0} does not take a mobile-money phone number")]
    NotMobileMoney(PaymentMethod),
}

pub fn is_canonical_local(phone: &str) -> bool {
    PHONE_RE.is_match(phone)
}

/// Normalizes `+250XXXXXXXXX`, `250XXXXXXXXX`, `7XXXXXXXX` and `07XXXXXXXX`
/// to `07XXXXXXXX`. Anything else is returned unchanged.
pub fn format_phone_number(input: &str) -> String {
    let compact: String = input
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '-' | '(' | ')' | '.'))
        .collect();

    let national = compact
        .strip_prefix("+250")
        .or_else(|| compact.strip_prefix("250"))
        .unwrap_or(compact.as_str());

    let all_digits = !national.is_empty() && national.chars().all(|c| c.is_ascii_digit());
    if !all_digits {
        return input.to_string();
    }

    match national.len() {
        9 if national.starts_with('7') => format!("0{}", national),
        10 if national.starts_with("07") && national.len() == compact.len() => national.to_string(),
        _ => input.to_string(),
    }
}

/// Checks an already-formatted number against the operator behind `method`.
pub fn validate_operator_phone(method: PaymentMethod, phone: &str) -> Result<(), PhoneError> {
    let operator = method
        .operator_name()
        .ok_or(PhoneError::NotMobileMoney(method))?;

    if phone.len() != 10 || !phone.chars().all(|c| c.is_ascii_digit()) {
        return Err(PhoneError::WrongLength);
    }
    if !phone.starts_with("07") {
        return Err(PhoneError::WrongPrefix);
    }

    let prefixes = method.operator_prefixes();
    if prefixes.iter().any(|prefix| phone.starts_with(prefix)) {
        Ok(())
    } else {
        Err(PhoneError::OperatorMismatch { operator, prefixes })
    }
}

/// Keeps the last three digits for log output.
pub fn mask_phone(phone: &str) -> String {
    let digits: Vec<char> = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() <= 3 {
        return "***".to_string();
    }
    let tail: String = digits[digits.len() - 3..].iter().collect();
    format!("{}{}", "*".repeat(digits.len() - 3), tail)
}
