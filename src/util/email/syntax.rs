use std::sync::LazyLock;

use regex::Regex;

// Practical subset of RFC 5322: dotted local part, at least one dot in the domain,
// alphabetic TLD of two or more letters.
static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .expect("email regex is a valid literal")
});

pub fn validate_email_syntax(email: &str) -> bool {
    !email.is_empty() && EMAIL_REGEX.is_match(email)
}

/// Domain part of an address that already passed `validate_email_syntax`.
pub fn email_domain(email: &str) -> Option<&str> {
    email
        .split_once('@')
        .map(|(_, domain)| domain)
        .filter(|domain| !domain.is_empty())
}
