//! Signup rules: institutional email domain and password strength.

const SPECIAL_CHARS: &str = "!@#$%^&*(),.?\":{}|<>";

/// True if `email` is a plausible address on `domain` (case-insensitive).
pub fn is_allowed_email(email: &str, domain: &str) -> bool {
    let email = email.trim().to_lowercase();
    match email.rsplit_once('@') {
        Some((local, host)) => !local.is_empty() && host == domain.to_lowercase(),
        None => false,
    }
}

/// Unmet password requirements, empty when the password is acceptable.
pub fn password_problems(password: &str) -> Vec<&'static str> {
    let mut problems = Vec::new();
    if password.chars().count() < 8 {
        problems.push("at least 8 characters");
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        problems.push("one uppercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        problems.push("one lowercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        problems.push("one number");
    }
    if !password.chars().any(|c| SPECIAL_CHARS.contains(c)) {
        problems.push("one special character");
    }
    problems
}
