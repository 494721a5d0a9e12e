use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::checkout_form::{CheckoutForm, FormErrors, FormField};
use crate::models::payment::PaymentMethod;
use crate::services::phone::{format_phone_number, validate_operator_phone};

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email pattern"));

/// Field-level checkout validation. Pure; an empty result means the form is valid.
///
/// Operator-specific phone rules only apply to mobile-money methods. Cash and
/// card payments accept any non-empty phone.
pub fn validate_checkout_form(form: &CheckoutForm, method: PaymentMethod) -> FormErrors {
    let mut errors = FormErrors::new();

    let email = form.email.trim();
    if email.is_empty() {
        errors.add(FormField::Email, "Email is required");
    } else if !EMAIL_RE.is_match(email) {
        errors.add(FormField::Email, "Please enter a valid email address");
    }

    if form.address.trim().is_empty() {
        errors.add(FormField::Address, "Delivery address is required");
    }

    let phone = form.phone.trim();
    if phone.is_empty() {
        errors.add(FormField::Phone, "Phone number is required");
    } else if method.is_mobile_money() {
        if let Err(e) = validate_operator_phone(method, &format_phone_number(phone)) {
            errors.add(FormField::Phone, e.to_string());
        }
    }

    errors
}
