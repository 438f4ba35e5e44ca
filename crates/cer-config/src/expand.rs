//! `${VAR}` expansion for configuration strings.

use crate::ConfigError;

/// Expand environment variable references in `value`.
///
/// - `${VAR}` expands to the value of VAR and fails if it is unset
/// - `${VAR:-default}` falls back to `default` when VAR is unset
///
/// Bare `$VAR` is left alone so URLs and prompts containing dollar signs
/// survive unchanged.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    if !value.contains("${") {
        return Ok(value.to_owned());
    }

    shellexpand::env_with_context(value, |name| match std::env::var(name) {
        Ok(val) => Ok(Some(val)),
        Err(_) => Err(UnsetVar(name.to_owned())),
    })
    .map(std::borrow::Cow::into_owned)
    .map_err(|e| ConfigError::EnvVar {
        field: field.to_owned(),
        message: format!("${{{}}} not set", e.cause.0),
    })
}

/// Expand an optional value in place.
pub(crate) fn expand_opt(value: &mut Option<String>, field: &str) -> Result<(), ConfigError> {
    if let Some(v) = value.as_deref() {
        *value = Some(expand_env(v, field)?);
    }
    Ok(())
}

struct UnsetVar(String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_var() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::set_var("CER_TEST_KEY", "secret");
        }
        assert_eq!(expand_env("${CER_TEST_KEY}", "generation.api_key").unwrap(), "secret");
        assert_eq!(
            expand_env("https://${CER_TEST_KEY}.example.com", "diagrams.kroki_url").unwrap(),
            "https://secret.example.com"
        );
        unsafe {
            std::env::remove_var("CER_TEST_KEY");
        }
    }

    #[test]
    fn test_expand_default() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("CER_TEST_UNSET");
        }
        assert_eq!(
            expand_env("${CER_TEST_UNSET:-https://kroki.io}", "diagrams.kroki_url").unwrap(),
            "https://kroki.io"
        );
    }

    #[test]
    fn test_expand_missing_var() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("CER_TEST_MISSING");
        }
        let err = expand_env("${CER_TEST_MISSING}", "generation.api_key").unwrap_err();
        assert!(matches!(err, ConfigError::EnvVar { .. }));
        assert!(err.to_string().contains("CER_TEST_MISSING"));
        assert!(err.to_string().contains("generation.api_key"));
    }

    #[test]
    fn test_literals_unchanged() {
        assert_eq!(expand_env("Prosit 3", "author.title").unwrap(), "Prosit 3");
        assert_eq!(expand_env("$HOME", "author.name").unwrap(), "$HOME");
    }

    #[test]
    fn test_expand_opt() {
        let mut none = None;
        expand_opt(&mut none, "author.name").unwrap();
        assert_eq!(none, None);

        let mut some = Some("Jean".to_owned());
        expand_opt(&mut some, "author.name").unwrap();
        assert_eq!(some.as_deref(), Some("Jean"));
    }
}
