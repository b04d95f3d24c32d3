//! Account path syntax
//!
//! A path starts with exactly one separator, separates components by exactly
//! one separator and never ends with a separator unless it is the bare root
//! path. Whitespace around the whole string is ignored.

use crate::error::AccountingError;

/// Path of the root account
pub fn root_path(separator: char) -> String {
    separator.to_string()
}

/// Splits a path into its components; the root path yields no components
pub fn parse_path(path: &str, separator: char) -> Result<Vec<&str>, AccountingError> {
    let trimmed = path.trim();

    if trimmed.is_empty() {
        return Err(AccountingError::malformed_path("path is empty"));
    }

    let Some(rest) = trimmed.strip_prefix(separator) else {
        return Err(AccountingError::malformed_path(format!(
            "path {:?} must start with {:?}",
            path, separator
        )));
    };

    if rest.is_empty() {
        return Ok(Vec::new());
    }

    if rest.ends_with(separator) {
        return Err(AccountingError::malformed_path(format!(
            "path {:?} must not end with {:?}",
            path, separator
        )));
    }

    let components: Vec<&str> = rest.split(separator).collect();
    if components.iter().any(|c| c.is_empty()) {
        return Err(AccountingError::malformed_path(format!(
            "path {:?} contains an empty component",
            path
        )));
    }

    Ok(components)
}

/// Path of a child given its parent's path
pub fn child_path(parent_path: &str, name: &str, separator: char) -> String {
    if parent_path == root_path(separator) {
        format!("{}{}", separator, name)
    } else {
        format!("{}{}{}", parent_path, separator, name)
    }
}

/// Checks that `name` can be used for a non-root account
pub fn validate_account_name(name: &str, separator: char) -> Result<(), AccountingError> {
    if name.is_empty() {
        return Err(AccountingError::malformed_path("account name cannot be empty"));
    }
    if name.contains(separator) {
        return Err(AccountingError::malformed_path(format!(
            "account name {:?} contains the path separator",
            name
        )));
    }
    if name.trim() != name {
        return Err(AccountingError::malformed_path(format!(
            "account name {:?} has surrounding whitespace",
            name
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn malformed(path: &str) -> bool {
        matches!(parse_path(path, '/'), Err(AccountingError::MalformedPath(_)))
    }

    #[test]
    fn test_root_path() {
        assert_eq!(parse_path("/", '/').unwrap(), Vec::<&str>::new());
        assert_eq!(parse_path("  /  ", '/').unwrap(), Vec::<&str>::new());
    }

    #[test]
    fn test_components() {
        assert_eq!(parse_path("/spam", '/').unwrap(), vec!["spam"]);
        assert_eq!(parse_path("/spam/cheese", '/').unwrap(), vec!["spam", "cheese"]);
    }

    #[test]
    fn test_surrounding_whitespace_is_ignored() {
        assert_eq!(parse_path(" /spam", '/').unwrap(), vec!["spam"]);
        assert_eq!(parse_path("/spam ", '/').unwrap(), vec!["spam"]);
    }

    #[test]
    fn test_malformed_paths() {
        assert!(malformed(""));
        assert!(malformed("   "));
        assert!(malformed("spam"));
        assert!(malformed(":spam"));
        assert!(malformed("//spam"));
        assert!(malformed("/spam/"));
        assert!(malformed("/spam//bar"));
    }

    #[test]
    fn test_custom_separator() {
        assert_eq!(parse_path(":a:b", ':').unwrap(), vec!["a", "b"]);
        assert!(matches!(parse_path("/a", ':'), Err(AccountingError::MalformedPath(_))));
    }

    #[test]
    fn test_child_path() {
        assert_eq!(child_path("/", "wallet", '/'), "/wallet");
        assert_eq!(child_path("/expenses", "gas", '/'), "/expenses/gas");
        assert_eq!(child_path(":", "x", ':'), ":x");
    }

    #[test]
    fn test_account_names() {
        assert!(validate_account_name("wallet", '/').is_ok());
        assert!(validate_account_name("bank account", '/').is_ok());
        assert!(validate_account_name("", '/').is_err());
        assert!(validate_account_name("a/b", '/').is_err());
        assert!(validate_account_name(" wallet", '/').is_err());
    }

    #[test]
    fn test_child_path_parses_back() {
        let path = child_path(&child_path("/", "incomes", '/'), "fees", '/');
        assert_eq!(parse_path(&path, '/').unwrap(), vec!["incomes", "fees"]);
    }
}
