use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// Registry for the PII redaction patterns.
///
/// All patterns are vetted literals; construction cannot fail at runtime.
pub struct PiiRegexRegistry;

impl PiiRegexRegistry {
    /// Email pattern: matches standard email addresses
    pub fn email() -> &'static Regex {
        static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
            #[allow(clippy::unwrap_used)]
            Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{1,}\b").unwrap()
        });
        &EMAIL_REGEX
    }

    /// Opaque token pattern: standard or URL-safe base64 runs (>= 16 chars)
    pub fn opaque_token() -> &'static Regex {
        static TOKEN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
            #[allow(clippy::unwrap_used)]
            Regex::new(r"[A-Za-z0-9+/_-]{16,}={0,2}").unwrap()
        });
        &TOKEN_REGEX
    }
}

/// Redacts sensitive information from a string.
///
/// - Emails: keeps first character of local part, replaces rest with ***, keeps full domain
/// - Opaque tokens (session/confirmation values): replaced with [REDACTED_TOKEN]
///
/// Emails are handled first so their domains are not mistaken for tokens.
pub fn redact(input: &str) -> String {
    let email_redacted = PiiRegexRegistry::email().replace_all(input, |caps: &regex::Captures| {
        let full_match = &caps[0];
        match full_match.split_once('@') {
            Some((local_part, domain)) if !local_part.is_empty() => {
                let first_char: String = local_part.chars().take(1).collect();
                format!("{first_char}***@{domain}")
            }
            _ => full_match.to_string(),
        }
    });

    PiiRegexRegistry::opaque_token()
        .replace_all(&email_redacted, "[REDACTED_TOKEN]")
        .to_string()
}

/// A wrapper that redacts sensitive strings when displayed.
pub struct Redacted<'a>(pub &'a str);

impl fmt::Display for Redacted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", redact(self.0))
    }
}

impl fmt::Debug for Redacted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", redact(self.0))
    }
}
