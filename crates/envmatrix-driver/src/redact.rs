//! Secret redaction for externally sourced text
//!
//! Every CLI message is passed through [`redact_sensitive_text`] before it is
//! logged, stored, or returned.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Replacement marker
pub const REDACTED: &str = "[REDACTED]";

static SECRET_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(TOKEN|SECRET|PASSWORD|PRIVATE|API_KEY|ACCESS_KEY|AUTH|KEY)")
        .expect("secret key regex is valid")
});

// `KEY=value` at the start of a line; the value runs to end of line
static LINE_ASSIGNMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^([A-Za-z_][A-Za-z0-9_]*)=([^\n]*)").expect("line assignment regex is valid")
});

// `KEY=value` inside a line; the value stops at whitespace, quotes and list
// separators so a plain `a=b&` cannot swallow a following secret
static INLINE_ASSIGNMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([^A-Za-z0-9_=])([A-Za-z_][A-Za-z0-9_]*)=([^\s&,;'"]+)"#)
        .expect("inline assignment regex is valid")
});

static TOKEN_ARG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(--token\s+)(\S+)").expect("token arg regex is valid"));

static BEARER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(Bearer\s+)(\S+)").expect("bearer regex is valid"));

/// True when a variable name looks like it holds a credential
#[must_use]
pub fn is_secret_key(key: &str) -> bool {
    SECRET_KEY.is_match(key)
}

/// Mask secret-looking assignments, `--token` arguments and bearer tokens
#[must_use]
pub fn redact_sensitive_text(input: &str) -> String {
    let text = LINE_ASSIGNMENT.replace_all(input, |caps: &Captures<'_>| {
        let key = &caps[1];
        if is_secret_key(key) {
            format!("{key}={REDACTED}")
        } else {
            caps[0].to_string()
        }
    });
    let text = INLINE_ASSIGNMENT.replace_all(&text, |caps: &Captures<'_>| {
        let key = &caps[2];
        if is_secret_key(key) {
            format!("{}{key}={REDACTED}", &caps[1])
        } else {
            caps[0].to_string()
        }
    });
    let text = TOKEN_ARG.replace_all(&text, format!("${{1}}{REDACTED}").as_str());
    BEARER
        .replace_all(&text, format!("${{1}}{REDACTED}").as_str())
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_assignment_is_masked() {
        assert_eq!(
            redact_sensitive_text("Command failed: API_KEY=super-secret-value"),
            "Command failed: API_KEY=[REDACTED]"
        );
    }

    #[test]
    fn line_assignment_masks_rest_of_line() {
        let input = "Error\nDB_PASSWORD=hunter 2 words\nPORT=8080";
        assert_eq!(
            redact_sensitive_text(input),
            "Error\nDB_PASSWORD=[REDACTED]\nPORT=8080"
        );
    }

    #[test]
    fn plain_assignment_does_not_hide_a_following_secret() {
        assert_eq!(
            redact_sensitive_text(
                "request failed: GET https://api.example.com/v1?project=web&API_KEY=zqsupersecret1"
            ),
            "request failed: GET https://api.example.com/v1?project=web&API_KEY=[REDACTED]"
        );
        assert_eq!(
            redact_sensitive_text("Error: NODE_ENV=production,DB_PASSWORD=zqhunter22"),
            "Error: NODE_ENV=production,DB_PASSWORD=[REDACTED]"
        );
    }

    #[test]
    fn non_secret_keys_pass_through() {
        let input = "NODE_ENV=production REGION=iad1";
        assert_eq!(redact_sensitive_text(input), input);
    }

    #[test]
    fn token_args_and_bearer_are_masked() {
        assert_eq!(
            redact_sensitive_text("vercel env ls --token abc123 --no-color"),
            "vercel env ls --token [REDACTED] --no-color"
        );
        assert_eq!(
            redact_sensitive_text("Authorization: bearer eyJhbGci"),
            "Authorization: bearer [REDACTED]"
        );
    }
}
