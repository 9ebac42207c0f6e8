use crate::errors::{Error, Result, ValidationError};

/// Rejects empty or whitespace-only required fields.
pub fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::Validation(ValidationError::MissingField(
            field.to_string(),
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_non_empty() {
        assert!(require_non_empty("applicant_id", "APP-1").is_ok());
        assert!(matches!(
            require_non_empty("applicant_id", "  "),
            Err(Error::Validation(ValidationError::MissingField(f))) if f == "applicant_id"
        ));
    }
}
