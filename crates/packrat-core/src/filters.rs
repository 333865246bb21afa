//! Name filtering during directory expansion.

/// Returns `true` if a child `name` matches any exclude pattern.
///
/// # Examples
///
/// ```
/// use packrat_core::filters;
///
/// let patterns = vec![".git".to_string(), "*.tmp".to_string()];
/// assert!(filters::is_excluded(".git", &patterns));
/// assert!(filters::is_excluded("build.tmp", &patterns));
/// assert!(!filters::is_excluded("main.rs", &patterns));
/// ```
#[must_use]
pub fn is_excluded(name: &str, patterns: &[String]) -> bool {
    patterns.iter().any(|pattern| matches_pattern(name, pattern))
}

/// Matches a single name against a simple glob pattern.
///
/// Supports:
/// - Exact match: `".DS_Store"`
/// - Suffix wildcard: `"*.tmp"`
/// - Prefix wildcard: `"temp*"`
///
/// # Examples
///
/// ```
/// use packrat_core::filters::matches_pattern;
///
/// assert!(matches_pattern("temp_file", "temp*"));
/// assert!(!matches_pattern("file_temp", "temp*"));
/// assert!(matches_pattern("a.log", "*.log"));
/// ```
#[must_use]
pub fn matches_pattern(name: &str, pattern: &str) -> bool {
    if pattern == name {
        return true;
    }

    if pattern == "*" {
        return true;
    }

    if let Some(prefix) = pattern.strip_suffix('*') {
        return name.starts_with(prefix);
    }

    if let Some(suffix) = pattern.strip_prefix('*') {
        return name.ends_with(suffix);
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        assert!(matches_pattern(".git", ".git"));
        assert!(!matches_pattern(".github", ".git"));
    }

    #[test]
    fn test_suffix_wildcard() {
        assert!(matches_pattern("cache.tmp", "*.tmp"));
        assert!(!matches_pattern("tmp.cache", "*.tmp"));
    }

    #[test]
    fn test_prefix_wildcard() {
        assert!(matches_pattern("target-debug", "target*"));
        assert!(!matches_pattern("my-target", "target*"));
    }

    #[test]
    fn test_star_matches_everything() {
        assert!(matches_pattern("anything", "*"));
    }

    #[test]
    fn test_no_patterns_excludes_nothing() {
        assert!(!is_excluded("file.txt", &[]));
    }
}
