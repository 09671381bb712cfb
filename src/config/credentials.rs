//! Registry address and credentials.

use std::fmt;

/// Secret value that never appears in debug or display output
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    /// Wrap a secret value
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Expose the secret to the one place that must send it
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

/// Everything needed to talk to the registry on behalf of one run
#[derive(Debug, Clone)]
pub struct RegistryAccess {
    /// Registry login server, e.g. `myregistry.azurecr.io`
    pub login_server: String,
    /// Repository name inside the registry
    pub repository: String,
    /// Registry username
    pub username: String,
    /// Registry password or token
    pub password: Secret,
}

impl RegistryAccess {
    /// Create registry access, normalising the server and repository
    pub fn new(
        login_server: impl Into<String>,
        repository: impl Into<String>,
        username: impl Into<String>,
        password: Secret,
    ) -> Self {
        let login_server = login_server.into();
        let login_server = login_server
            .trim()
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/')
            .to_string();
        let repository = repository.into().trim().trim_matches('/').to_string();

        Self {
            login_server,
            repository,
            username: username.into(),
            password,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_is_redacted() {
        let secret = Secret::new("hunter2");
        assert_eq!(format!("{secret}"), "***");
        assert_eq!(format!("{secret:?}"), "Secret(***)");
        assert_eq!(secret.expose(), "hunter2");
    }

    #[test]
    fn test_access_debug_hides_password() {
        let access = RegistryAccess::new("reg.io", "app", "ci", Secret::new("hunter2"));
        let debug = format!("{access:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("ci"));
    }

    #[test]
    fn test_access_normalises_server_and_repository() {
        let access = RegistryAccess::new(
            "https://myreg.azurecr.io/",
            "/team/app/",
            "ci",
            Secret::default(),
        );
        assert_eq!(access.login_server, "myreg.azurecr.io");
        assert_eq!(access.repository, "team/app");
    }
}
