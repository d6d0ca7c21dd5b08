//! Environment variable expansion for configuration strings.

use crate::ConfigError;

/// Expand `${VAR}` and `${VAR:-default}` references in `value`.
///
/// Bare `$VAR` and lone `$` are left as written; only the braced forms are
/// expanded. `field` names the configuration key and is only used for error
/// context.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    // Fast path: no expansion needed
    if !value.contains("${") {
        return Ok(value.to_owned());
    }

    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        out.push_str(&expand_reference(&rest[start..=start + len], field)?);
        rest = &rest[start + len + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Expand a single `${...}` reference.
fn expand_reference(reference: &str, field: &str) -> Result<String, ConfigError> {
    shellexpand::env(reference)
        .map(std::borrow::Cow::into_owned)
        .map_err(|e| ConfigError::EnvVar {
            field: field.to_owned(),
            message: format!("${{{}}} not set", e.var_name),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_unchanged() {
        assert_eq!(expand_env("plain", "f").unwrap(), "plain");
    }

    #[test]
    fn test_bare_dollar_not_expanded() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::set_var("ACP_EXPAND_BARE", "expanded");
        }
        assert_eq!(expand_env("$ACP_EXPAND_BARE", "f").unwrap(), "$ACP_EXPAND_BARE");
        assert_eq!(expand_env("costs $5", "f").unwrap(), "costs $5");
        unsafe {
            std::env::remove_var("ACP_EXPAND_BARE");
        }
    }

    #[test]
    fn test_url_with_dollar_not_expanded() {
        assert_eq!(
            expand_env("https://example.com/$path", "convert.attributes.url").unwrap(),
            "https://example.com/$path"
        );
    }

    #[test]
    fn test_bare_dollar_beside_braced_reference() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::set_var("ACP_EXPAND_PRICE", "5");
        }
        assert_eq!(
            expand_env("$HOME costs $${ACP_EXPAND_PRICE}", "f").unwrap(),
            "$HOME costs $5"
        );
        unsafe {
            std::env::remove_var("ACP_EXPAND_PRICE");
        }
    }

    #[test]
    fn test_unclosed_brace_left_as_written() {
        assert_eq!(expand_env("${ACP_EXPAND_OPEN", "f").unwrap(), "${ACP_EXPAND_OPEN");
    }

    #[test]
    fn test_default_used_when_unset() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("ACP_EXPAND_UNSET");
        }
        assert_eq!(
            expand_env("${ACP_EXPAND_UNSET:-fallback}", "f").unwrap(),
            "fallback"
        );
    }

    #[test]
    fn test_missing_var_names_field() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("ACP_EXPAND_MISSING");
        }
        let err = expand_env("${ACP_EXPAND_MISSING}", "convert.template_dir").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("ACP_EXPAND_MISSING"));
        assert!(msg.contains("convert.template_dir"));
    }
}
