//! Environment variable parsing with warn-level logging for invalid values.

/// Parse an environment variable, falling back to `default`.
///
/// An unset variable is the expected case and falls back silently; a set
/// but unparseable value logs a warning so misconfiguration is visible.
pub fn env_parse_with_default<T: std::str::FromStr + std::fmt::Display>(
    var: &str,
    default: T,
) -> T {
    match std::env::var(var) {
        Ok(raw) => match raw.parse() {
            Ok(parsed) => parsed,
            Err(_) => {
                tracing::warn!(
                    var,
                    value = %raw,
                    default = %default,
                    "invalid env var value, using default"
                );
                default
            },
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_value() {
        let var = "MNEMO_TEST_ENV_VALID_41517";
        unsafe { std::env::set_var(var, "12") };
        let parsed: u32 = env_parse_with_default(var, 4);
        assert_eq!(parsed, 12);
        unsafe { std::env::remove_var(var) };
    }

    #[test]
    fn falls_back_on_invalid_value() {
        let var = "MNEMO_TEST_ENV_INVALID_41518";
        unsafe { std::env::set_var(var, "not-a-number") };
        let parsed: u32 = env_parse_with_default(var, 4);
        assert_eq!(parsed, 4);
        unsafe { std::env::remove_var(var) };
    }

    #[test]
    fn falls_back_on_missing_var() {
        let var = "MNEMO_TEST_ENV_MISSING_41519";
        unsafe { std::env::remove_var(var) };
        let parsed: u32 = env_parse_with_default(var, 4);
        assert_eq!(parsed, 4);
    }
}
