//! Login credentials for the management server.
//!
//! Credentials are looked up in this order:
//!
//! 1. an auth file (first line username, second line password, mode 0600),
//! 2. the `SATELLITE_LOGIN` / `SATELLITE_PASSWORD` environment variables,
//! 3. an interactive prompt.

use crate::{Error, Result};
use std::fmt;
use std::io::{self, BufRead, Write};
use std::path::Path;
use tracing::{debug, warn};

/// Environment variable holding the username.
pub const LOGIN_ENV: &str = "SATELLITE_LOGIN";

/// Environment variable holding the password.
pub const PASSWORD_ENV: &str = "SATELLITE_PASSWORD";

/// Username/password pair.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Resolve credentials from the auth file, the environment or a prompt.
    pub fn resolve(auth_file: Option<&Path>) -> Result<Self> {
        Self::resolve_with(auth_file, |key| std::env::var(key).ok(), prompt)
    }

    /// Same as [`Credentials::resolve`] with injectable environment and prompt.
    pub fn resolve_with<E, P>(auth_file: Option<&Path>, env: E, prompt: P) -> Result<Self>
    where
        E: Fn(&str) -> Option<String>,
        P: FnOnce() -> Result<Self>,
    {
        if let Some(path) = auth_file {
            debug!("Using auth file {:?}", path);
            return Self::from_auth_file(path);
        }

        if let (Some(username), Some(password)) = (env(LOGIN_ENV), env(PASSWORD_ENV)) {
            debug!("Using credentials from {} / {}", LOGIN_ENV, PASSWORD_ENV);
            return Ok(Self::new(username, password));
        }

        debug!("Prompting for login credentials");
        prompt()
    }

    /// Read credentials from an auth file with mode 0600.
    pub fn from_auth_file(path: &Path) -> Result<Self> {
        check_auth_file_mode(path)?;

        let content = std::fs::read_to_string(path)?;
        let mut lines = content.lines();
        let username = lines.next().map(str::trim_end).unwrap_or_default();
        let password = lines.next().map(str::trim_end).unwrap_or_default();

        if username.is_empty() {
            return Err(Error::Credentials(format!(
                "auth file {} does not contain a username",
                path.display()
            )));
        }
        if password.is_empty() {
            return Err(Error::Credentials(format!(
                "auth file {} does not contain a password",
                path.display()
            )));
        }

        Ok(Self::new(username, password))
    }
}

#[cfg(unix)]
fn check_auth_file_mode(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = std::fs::symlink_metadata(path).map_err(|e| {
        Error::Credentials(format!("auth file {} is not readable: {}", path.display(), e))
    })?;
    let mode = metadata.permissions().mode() & 0o777;
    if mode != 0o600 {
        return Err(Error::AuthFileMode {
            path: path.display().to_string(),
            mode,
        });
    }
    Ok(())
}

#[cfg(not(unix))]
fn check_auth_file_mode(path: &Path) -> Result<()> {
    warn!(
        "Cannot verify permissions of {} on this platform",
        path.display()
    );
    Ok(())
}

/// Prompt for username on stdin and password without echo.
fn prompt() -> Result<Credentials> {
    let mut stdout = io::stdout();
    write!(stdout, "Username: ")?;
    stdout.flush()?;

    let mut username = String::new();
    io::stdin().lock().read_line(&mut username)?;
    let username = username.trim().to_string();
    if username.is_empty() {
        warn!("Empty username entered");
        return Err(Error::Credentials("no username given".into()));
    }

    let password = rpassword::prompt_password("Password: ")?;
    Ok(Credentials::new(username, password))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn auth_file(content: &str, mode: u32) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(file.path(), std::fs::Permissions::from_mode(mode)).unwrap();
        }
        #[cfg(not(unix))]
        let _ = mode;
        file
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn no_prompt() -> Result<Credentials> {
        panic!("prompt must not be used")
    }

    #[test]
    fn test_auth_file() {
        let file = auth_file("admin\nsecret\n", 0o600);
        let creds = Credentials::resolve_with(Some(file.path()), no_env, no_prompt).unwrap();
        assert_eq!(creds, Credentials::new("admin", "secret"));
    }

    #[test]
    fn test_auth_file_crlf() {
        let file = auth_file("admin\r\nsecret\r\n", 0o600);
        let creds = Credentials::from_auth_file(file.path()).unwrap();
        assert_eq!(creds.password, "secret");
    }

    #[cfg(unix)]
    #[test]
    fn test_auth_file_wrong_mode() {
        let file = auth_file("admin\nsecret\n", 0o644);
        let err = Credentials::from_auth_file(file.path()).unwrap_err();
        assert!(matches!(err, Error::AuthFileMode { mode: 0o644, .. }));
    }

    #[test]
    fn test_auth_file_missing_password() {
        let file = auth_file("admin\n", 0o600);
        assert!(Credentials::from_auth_file(file.path()).is_err());
    }

    #[test]
    fn test_auth_file_missing() {
        let path = Path::new("/nonexistent/satprep-auth");
        assert!(Credentials::from_auth_file(path).is_err());
    }

    #[test]
    fn test_env_fallback() {
        let env = |key: &str| match key {
            LOGIN_ENV => Some("envuser".to_string()),
            PASSWORD_ENV => Some("envpass".to_string()),
            _ => None,
        };
        let creds = Credentials::resolve_with(None, env, no_prompt).unwrap();
        assert_eq!(creds, Credentials::new("envuser", "envpass"));
    }

    #[test]
    fn test_prompt_when_env_incomplete() {
        let env = |key: &str| (key == LOGIN_ENV).then(|| "envuser".to_string());
        let creds =
            Credentials::resolve_with(None, env, || Ok(Credentials::new("typed", "pw"))).unwrap();
        assert_eq!(creds.username, "typed");
    }

    #[test]
    fn test_debug_hides_password() {
        let creds = Credentials::new("admin", "secret");
        assert!(!format!("{:?}", creds).contains("secret"));
    }
}
