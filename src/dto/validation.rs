//! Validation helpers for DTOs.

use validator::ValidationError;

/// Longest accepted participant identifier.
const MAX_PARTICIPANT_ID_LEN: usize = 128;

/// Validates that a room code is non-empty and strictly alphanumeric.
///
/// # Examples
///
/// ```ignore
/// validate_room_code("aB3xY9") // Ok
/// validate_room_code("ab-12")  // Err - punctuation
/// validate_room_code("")       // Err - empty
/// ```
pub fn validate_room_code(code: &str) -> Result<(), ValidationError> {
    if code.is_empty() {
        let mut err = ValidationError::new("room_code_empty");
        err.message = Some("Room code must not be empty".into());
        return Err(err);
    }

    if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        let mut err = ValidationError::new("room_code_format");
        err.message = Some("Room code must contain only letters and digits".into());
        return Err(err);
    }

    Ok(())
}

/// Validates that a participant identifier is present, bounded and free of whitespace.
pub fn validate_participant_id(id: &str) -> Result<(), ValidationError> {
    if id.is_empty() || id.len() > MAX_PARTICIPANT_ID_LEN {
        let mut err = ValidationError::new("participant_id_length");
        err.message = Some(
            format!(
                "Participant ID must be between 1 and {MAX_PARTICIPANT_ID_LEN} characters (got {})",
                id.len()
            )
            .into(),
        );
        return Err(err);
    }

    if id.chars().any(char::is_whitespace) {
        let mut err = ValidationError::new("participant_id_format");
        err.message = Some("Participant ID must not contain whitespace".into());
        return Err(err);
    }

    Ok(())
}

/// Validates that a free-form label is not only whitespace.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Value must not be blank".into());
        return Err(err);
    }
    Ok(())
}
