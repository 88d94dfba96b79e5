use validator::ValidateEmail;

/// Validates that the input looks like a valid email address
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    !email.is_empty() && email.validate_email()
}

/// Canonical form used as the account key.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Normalizes and validates an email from a request body.
pub fn parse_email(email: &str) -> Result<String, crate::app_error::AppError> {
    let normalized = normalize_email(email);
    if !is_valid_email(&normalized) {
        return Err(crate::app_error::AppError::InvalidInput(
            "A valid email is required".into(),
        ));
    }
    Ok(normalized)
}
