//! Account validation.

use super::model::{AccountDraft, NewAccount};

/// Validation error for account creation input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    /// Email address is missing.
    MissingEmail,
    /// Email address format is invalid.
    InvalidEmail,
    /// IMAP host is missing.
    MissingImapHost,
    /// IMAP port is missing.
    MissingImapPort,
    /// IMAP port is out of range.
    InvalidImapPort,
    /// Login username is missing.
    MissingUsername,
    /// Login password is missing.
    MissingPassword,
}

impl ValidationError {
    /// Get human-readable error message.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::MissingEmail => "Email address is required",
            Self::InvalidEmail => "Invalid email address format",
            Self::MissingImapHost => "IMAP server is required",
            Self::MissingImapPort => "IMAP port is required",
            Self::InvalidImapPort => "IMAP port must be 1-65535",
            Self::MissingUsername => "Username is required",
            Self::MissingPassword => "Password is required",
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ValidationError {}

/// Result of validating account input.
pub type ValidationResult<T> = Result<T, Vec<ValidationError>>;

/// Validate account creation input.
///
/// Returns the validated account, or every problem found. `use_ssl`
/// defaults to `true` when omitted.
///
/// # Errors
///
/// Returns a vector of `ValidationError` if any fields are missing or invalid.
pub fn validate_account(draft: &AccountDraft) -> ValidationResult<NewAccount> {
    let mut errors = Vec::new();

    let email_address = present(draft.email_address.as_deref());
    match email_address {
        None => errors.push(ValidationError::MissingEmail),
        Some(email) if !is_valid_email(email) => errors.push(ValidationError::InvalidEmail),
        Some(_) => {}
    }

    let imap_host = present(draft.imap_host.as_deref());
    if imap_host.is_none() {
        errors.push(ValidationError::MissingImapHost);
    }

    match draft.imap_port {
        None => errors.push(ValidationError::MissingImapPort),
        Some(0) => errors.push(ValidationError::InvalidImapPort),
        Some(_) => {}
    }

    let username = present(draft.username.as_deref());
    if username.is_none() {
        errors.push(ValidationError::MissingUsername);
    }

    // Passwords are taken verbatim; only emptiness counts as missing.
    let password = draft.password.as_deref().filter(|p| !p.is_empty());
    if password.is_none() {
        errors.push(ValidationError::MissingPassword);
    }

    match (email_address, imap_host, draft.imap_port, username, password) {
        (Some(email), Some(host), Some(port), Some(user), Some(pass)) if errors.is_empty() => {
            Ok(NewAccount {
                email_address: email.to_string(),
                imap_host: host.to_string(),
                imap_port: port,
                username: user.to_string(),
                password: pass.to_string(),
                use_ssl: draft.use_ssl.unwrap_or(true),
            })
        }
        _ => Err(errors),
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Basic email validation.
fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    if local.is_empty() || domain.contains('@') {
        return false;
    }

    // Domain needs at least one dot and no empty labels
    domain.contains('.') && domain.split('.').all(|label| !label.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn complete_draft() -> AccountDraft {
        AccountDraft {
            email_address: Some("user@example.com".into()),
            imap_host: Some("imap.example.com".into()),
            imap_port: Some(993),
            username: Some("user@example.com".into()),
            password: Some("secret".into()),
            use_ssl: Some(false),
        }
    }

    #[test]
    fn test_valid_email() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("user.name@example.com"));
        assert!(is_valid_email("user@sub.example.com"));
    }

    #[test]
    fn test_invalid_email() {
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("user"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("user@"));
        assert!(!is_valid_email("user@example"));
        assert!(!is_valid_email("user@@example.com"));
        assert!(!is_valid_email("user@example..com"));
    }

    #[test]
    fn test_validate_empty_draft() {
        let errors = validate_account(&AccountDraft::default()).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::MissingEmail,
                ValidationError::MissingImapHost,
                ValidationError::MissingImapPort,
                ValidationError::MissingUsername,
                ValidationError::MissingPassword,
            ]
        );
    }

    #[test]
    fn test_each_required_field_is_checked() {
        let cases: [(fn(&mut AccountDraft), ValidationError); 5] = [
            (|d| d.email_address = None, ValidationError::MissingEmail),
            (|d| d.imap_host = Some("   ".into()), ValidationError::MissingImapHost),
            (|d| d.imap_port = None, ValidationError::MissingImapPort),
            (|d| d.username = None, ValidationError::MissingUsername),
            (|d| d.password = Some(String::new()), ValidationError::MissingPassword),
        ];

        for (mutate, expected) in cases {
            let mut draft = complete_draft();
            mutate(&mut draft);
            assert_eq!(validate_account(&draft).unwrap_err(), vec![expected]);
        }
    }

    #[test]
    fn test_malformed_values() {
        let mut draft = complete_draft();
        draft.email_address = Some("not-an-address".into());
        draft.imap_port = Some(0);
        let errors = validate_account(&draft).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::InvalidEmail, ValidationError::InvalidImapPort]
        );
        assert_eq!(errors[1].to_string(), "IMAP port must be 1-65535");
    }

    #[test]
    fn test_validate_complete_draft() {
        let account = validate_account(&complete_draft()).unwrap();
        assert_eq!(account.email_address, "user@example.com");
        assert_eq!(account.imap_port, 993);
        assert!(!account.use_ssl);
    }

    #[test]
    fn test_use_ssl_defaults_to_true() {
        let mut draft = complete_draft();
        draft.use_ssl = None;
        assert!(validate_account(&draft).unwrap().use_ssl);
    }

    #[test]
    fn test_fields_are_trimmed_but_password_is_not() {
        let mut draft = complete_draft();
        draft.imap_host = Some("  imap.example.com ".into());
        draft.password = Some(" spaced ".into());
        let account = validate_account(&draft).unwrap();
        assert_eq!(account.imap_host, "imap.example.com");
        assert_eq!(account.password, " spaced ");
    }
}
