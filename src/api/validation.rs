use super::ApiError;

pub fn validate_score(score: i32) -> Result<i32, ApiError> {
    if !(1..=10).contains(&score) {
        return Err(ApiError::validation(format!(
            "Invalid score: {}. Score must be between 1 and 10",
            score
        )));
    }
    Ok(score)
}

pub fn validate_year(year: i32) -> Result<i32, ApiError> {
    if !(1..=9999).contains(&year) {
        return Err(ApiError::validation(format!(
            "Invalid year: {}. Year must be between 1 and 9999",
            year
        )));
    }
    Ok(year)
}

pub fn validate_name(name: &str) -> Result<&str, ApiError> {
    if name.trim().is_empty() {
        return Err(ApiError::validation("Name cannot be empty"));
    }
    if name.len() > 100 {
        return Err(ApiError::validation("Name must be 100 characters or less"));
    }
    Ok(name)
}

pub fn validate_slug(slug: &str) -> Result<&str, ApiError> {
    if slug.is_empty() {
        return Err(ApiError::validation("Slug cannot be empty"));
    }
    if slug.len() > 40 {
        return Err(ApiError::validation("Slug must be 40 characters or less"));
    }
    if !slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
    {
        return Err(ApiError::validation(
            "Slug can only contain lowercase letters, digits, hyphens, and underscores",
        ));
    }
    Ok(slug)
}

/// Just enough of an email check to reject obvious garbage; the real
/// verification is the code landing in the mailbox.
pub fn validate_email(email: &str) -> Result<&str, ApiError> {
    let valid = email.len() <= 254
        && matches!(email.split_once('@'), Some((local, domain))
            if !local.is_empty() && domain.contains('.') && !domain.starts_with('.'));

    if !valid {
        return Err(ApiError::validation(format!("Invalid email: {}", email)));
    }
    Ok(email)
}

pub fn validate_username(username: &str) -> Result<&str, ApiError> {
    if username.is_empty() {
        return Err(ApiError::validation("Username cannot be empty"));
    }
    if username.len() > 150 {
        return Err(ApiError::validation(
            "Username must be 150 characters or less",
        ));
    }
    // "me" is the self-service path segment and can never be a username.
    if username == "me" {
        return Err(ApiError::validation("Username 'me' is reserved"));
    }
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err(ApiError::validation(
            "Username can only contain letters, digits, hyphens, underscores, and dots",
        ));
    }
    Ok(username)
}

pub fn validate_text(text: &str) -> Result<&str, ApiError> {
    if text.trim().is_empty() {
        return Err(ApiError::validation("Text cannot be empty"));
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_score() {
        assert!(validate_score(1).is_ok());
        assert!(validate_score(10).is_ok());
        assert!(validate_score(0).is_err());
        assert!(validate_score(11).is_err());
        assert!(validate_score(-3).is_err());
    }

    #[test]
    fn test_validate_year() {
        assert!(validate_year(1994).is_ok());
        assert!(validate_year(0).is_err());
        assert!(validate_year(10_000).is_err());
    }

    #[test]
    fn test_validate_slug() {
        assert!(validate_slug("films").is_ok());
        assert!(validate_slug("sci-fi_2").is_ok());
        assert!(validate_slug("").is_err());
        assert!(validate_slug("Films").is_err());
        assert!(validate_slug("with space").is_err());
        assert!(validate_slug("a".repeat(41).as_str()).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("a@x.com").is_ok());
        assert!(validate_email("first.last@sub.example.org").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("nodomain@").is_err());
        assert!(validate_email("@x.com").is_err());
        assert!(validate_email("plain").is_err());
        assert!(validate_email("dot@.com").is_err());
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("alice").is_ok());
        assert!(validate_username("a.b-c_d").is_ok());
        assert!(validate_username("me").is_err());
        assert!(validate_username("").is_err());
        assert!(validate_username("has space").is_err());
    }
}
