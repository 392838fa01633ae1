//! Route scope matching

/// Check a request path against the allowed route patterns
///
/// `*` matches any path, a trailing `*` matches by prefix, anything else must
/// match exactly. Blank patterns are ignored and an empty path never matches.
pub fn is_path_allowed(path: &str, patterns: &[String]) -> bool {
    if path.is_empty() {
        return false;
    }

    patterns.iter().any(|pattern| pattern_matches(pattern.trim(), path))
}

fn pattern_matches(pattern: &str, path: &str) -> bool {
    if pattern.is_empty() {
        return false;
    }

    if pattern == "*" {
        return true;
    }

    match pattern.strip_suffix('*') {
        Some(prefix) => path.starts_with(prefix),
        None => path == pattern,
    }
}
