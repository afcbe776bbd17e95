//! Custom field validators used by the request payloads

use std::borrow::Cow;

use validator::ValidationError;

fn error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

/// Reject strings that are empty once surrounding whitespace is removed
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(error("blank", "This field may not be blank."));
    }
    Ok(())
}

/// Usernames may contain letters, digits and `@ . + - _`
pub fn valid_username(value: &str) -> Result<(), ValidationError> {
    not_blank(value)?;

    let allowed = |c: char| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_');
    if !value.trim().chars().all(allowed) {
        return Err(error(
            "invalid_username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_blank() {
        assert!(not_blank("John").is_ok());
        assert_eq!(not_blank("   ").unwrap_err().code, "blank");
        assert_eq!(not_blank("").unwrap_err().code, "blank");
    }

    #[test]
    fn test_valid_username() {
        assert!(valid_username("dr.house+ppth@x_y-z").is_ok());
        assert_eq!(valid_username("dr house").unwrap_err().code, "invalid_username");
        assert_eq!(valid_username("drhouse!").unwrap_err().code, "invalid_username");
        assert_eq!(valid_username(" ").unwrap_err().code, "blank");
    }
}
