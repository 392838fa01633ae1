//! Bearer credential extraction

/// Extract the token from an `Authorization` header value
///
/// The value must hold exactly a scheme and a credential separated by
/// whitespace, the scheme matching `Bearer` case-insensitively.
pub fn extract_bearer(value: &str) -> Option<&str> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("Bearer") {
        return None;
    }

    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_empty() {
        assert_eq!(extract_bearer(""), None);
        assert_eq!(extract_bearer("   "), None);
    }

    #[test]
    fn test_rejects_scheme_without_token() {
        assert_eq!(extract_bearer("Bearer"), None);
        assert_eq!(extract_bearer("Bearer   "), None);
    }

    #[test]
    fn test_rejects_other_schemes() {
        assert_eq!(extract_bearer("Token xxx"), None);
        assert_eq!(extract_bearer("Basic dXNlcjpwYXNz"), None);
    }

    #[test]
    fn test_accepts_bearer() {
        assert_eq!(extract_bearer("Bearer xxx"), Some("xxx"));
    }

    #[test]
    fn test_scheme_is_case_insensitive() {
        assert_eq!(extract_bearer("bearer xxx"), Some("xxx"));
        assert_eq!(extract_bearer("BEARER xxx"), Some("xxx"));
    }

    #[test]
    fn test_trims_surrounding_whitespace() {
        assert_eq!(extract_bearer("  Bearer   xxx  "), Some("xxx"));
    }
}
