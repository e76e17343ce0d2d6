//! Credentials handed to the chat transport at startup. Opaque to everything else.

use std::fmt;

/// Wrapper for sensitive data that redacts itself in Debug and Display.
pub struct Sensitive<T>(T);

impl<T> Sensitive<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    /// Expose the underlying value. Only the transport authenticating should need this.
    pub fn expose(&self) -> &T {
        &self.0
    }
}

impl<T> fmt::Debug for Sensitive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***REDACTED***")
    }
}

impl<T> fmt::Display for Sensitive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***REDACTED***")
    }
}

/// Indicates that the credential could not be obtained.
#[derive(Debug, thiserror::Error)]
#[error("secret '{name}' is not available")]
pub struct SecretUnavailable {
    pub name: String,
}

/// Supplies the transport's credential.
pub trait SecretProvider {
    fn fetch(&self) -> Result<Sensitive<String>, SecretUnavailable>;
}

/// Reads the credential from an environment variable.
#[derive(Debug, Clone)]
pub struct EnvSecretProvider {
    var: String,
}

impl EnvSecretProvider {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl SecretProvider for EnvSecretProvider {
    fn fetch(&self) -> Result<Sensitive<String>, SecretUnavailable> {
        std::env::var(&self.var)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(Sensitive::new)
            .ok_or_else(|| SecretUnavailable {
                name: self.var.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redacts_in_formatting() {
        let token = Sensitive::new("hunter2".to_string());
        assert_eq!(format!("{token}"), "***REDACTED***");
        assert_eq!(format!("{token:?}"), "***REDACTED***");
        assert_eq!(token.expose(), "hunter2");
    }

    #[test]
    fn test_missing_variable_is_unavailable() {
        let provider = EnvSecretProvider::new("TALLY_BOT_TEST_TOKEN_THAT_IS_NEVER_SET");
        let err = provider.fetch().unwrap_err();
        assert_eq!(err.name, "TALLY_BOT_TEST_TOKEN_THAT_IS_NEVER_SET");
    }
}
