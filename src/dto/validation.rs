//! Validation helpers for DTOs.

use validator::ValidationError;

/// Longest accepted finale answer, in characters.
pub const MAX_FINALE_ANSWER_CHARS: usize = 200;

/// Validates a `#rrggbb` color.
///
/// # Examples
///
/// ```ignore
/// validate_hex_color("#00ff7f") // Ok
/// validate_hex_color("00ff7f")  // Err - missing hash
/// validate_hex_color("#0f7")    // Err - short form
/// ```
pub fn validate_hex_color(color: &str) -> Result<(), ValidationError> {
    let Some(digits) = color.strip_prefix('#') else {
        let mut err = ValidationError::new("color_format");
        err.message = Some("Color must start with `#`".into());
        return Err(err);
    };

    if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        let mut err = ValidationError::new("color_format");
        err.message = Some(format!("Color must be `#rrggbb` (got `{color}`)").into());
        return Err(err);
    }

    Ok(())
}

/// Validates a finale answer: not blank and at most [`MAX_FINALE_ANSWER_CHARS`] characters.
pub fn validate_finale_answer(answer: &str) -> Result<(), ValidationError> {
    if answer.trim().is_empty() {
        let mut err = ValidationError::new("finale_answer_empty");
        err.message = Some("Finale answer must not be blank".into());
        return Err(err);
    }

    let count = answer.chars().count();
    if count > MAX_FINALE_ANSWER_CHARS {
        let mut err = ValidationError::new("finale_answer_length");
        err.message = Some(
            format!("Finale answer must be at most {MAX_FINALE_ANSWER_CHARS} characters (got {count})")
                .into(),
        );
        return Err(err);
    }

    Ok(())
}
