//! Validation helpers for DTOs.

use validator::ValidationError;

/// Validates that an identifier (game id or participant) contains something
/// other than whitespace.
///
/// # Examples
///
/// ```ignore
/// validate_identifier("alice") // Ok
/// validate_identifier("   ")   // Err - blank
/// ```
pub fn validate_identifier(id: &str) -> Result<(), ValidationError> {
    if id.trim().is_empty() {
        let mut err = ValidationError::new("identifier_blank");
        err.message = Some("Identifier must not be empty or blank".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_identifier_valid() {
        assert!(validate_identifier("game-1").is_ok());
        assert!(validate_identifier(" padded ").is_ok());
    }

    #[test]
    fn test_validate_identifier_blank() {
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier(" \t\n").is_err());
    }
}
