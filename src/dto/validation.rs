//! Validation helpers for DTOs.

use validator::ValidationError;

use crate::state::session::{SESSION_CODE_LEN, Settings};

/// Validates that a session code is exactly six uppercase base-36 characters.
///
/// # Examples
///
/// ```ignore
/// validate_session_code("QX3F9A") // Ok
/// validate_session_code("qx3f9a") // Err - lowercase
/// validate_session_code("QX3F9")  // Err - too short
/// ```
pub fn validate_session_code(code: &str) -> Result<(), ValidationError> {
    if code.chars().count() != SESSION_CODE_LEN {
        let mut err = ValidationError::new("session_code_length");
        err.message = Some(
            format!(
                "session code must be exactly {SESSION_CODE_LEN} characters (got {})",
                code.chars().count()
            )
            .into(),
        );
        return Err(err);
    }

    if !code
        .chars()
        .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
    {
        let mut err = ValidationError::new("session_code_format");
        err.message =
            Some("session code must contain only uppercase letters and digits".into());
        return Err(err);
    }

    Ok(())
}

/// Validates the host-tunable settings ranges.
pub fn validate_settings(settings: &Settings) -> Result<(), ValidationError> {
    if !(1..=10).contains(&settings.round_count) {
        let mut err = ValidationError::new("round_count_range");
        err.message = Some("round count must be between 1 and 10".into());
        return Err(err);
    }

    if !(10..=120).contains(&settings.play_duration_secs) {
        let mut err = ValidationError::new("play_duration_range");
        err.message = Some("play duration must be between 10 and 120 seconds".into());
        return Err(err);
    }

    if !(30..=600).contains(&settings.think_duration_secs) {
        let mut err = ValidationError::new("think_duration_range");
        err.message = Some("think duration must be between 30 and 600 seconds".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_session_code_valid() {
        assert!(validate_session_code("QX3F9A").is_ok());
        assert!(validate_session_code("000000").is_ok());
        assert!(validate_session_code("ZZZZZZ").is_ok());
    }

    #[test]
    fn test_validate_session_code_invalid_length() {
        assert!(validate_session_code("QX3F9").is_err()); // too short
        assert!(validate_session_code("QX3F9AB").is_err()); // too long
        assert!(validate_session_code("").is_err()); // empty
    }

    #[test]
    fn test_validate_session_code_invalid_format() {
        assert!(validate_session_code("qx3f9a").is_err()); // lowercase
        assert!(validate_session_code("QX3F9-").is_err()); // punctuation
        assert!(validate_session_code("QX3F 9").is_err()); // space
    }

    #[test]
    fn test_validate_settings_ranges() {
        assert!(validate_settings(&Settings::default()).is_ok());

        let mut settings = Settings::default();
        settings.round_count = 0;
        assert!(validate_settings(&settings).is_err());

        let mut settings = Settings::default();
        settings.round_count = 11;
        assert!(validate_settings(&settings).is_err());

        let mut settings = Settings::default();
        settings.think_duration_secs = 5;
        assert!(validate_settings(&settings).is_err());
    }
}
