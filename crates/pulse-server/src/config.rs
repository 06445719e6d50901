use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, bail};

const DEFAULT_LOGIN_URL: &str = "https://auth.emergentagent.com/";
const DEFAULT_SESSION_URL: &str =
    "https://demobackend.emergentagent.com/auth/v1/env/oauth/session-data";

const MAX_SESSION_TTL_DAYS: i64 = 365;

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub app_origin: String,
    pub auth_login_url: String,
    pub auth_session_url: String,
    pub auth_logout_url: Option<String>,
    pub auth_timeout: Duration,
    pub session_ttl_days: i64,
    pub cookie_secure: bool,
    /// Origins allowed to make credentialed cross-origin calls. Defaults to
    /// the app origin alone.
    pub cors_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let app_origin = var("PULSE_APP_ORIGIN")
            .unwrap_or_else(|| "http://localhost:3000".into())
            .trim_end_matches('/')
            .to_string();

        let session_ttl_days: i64 = parse_or(var("PULSE_SESSION_TTL_DAYS"), "PULSE_SESSION_TTL_DAYS", 7)?;
        if !(1..=MAX_SESSION_TTL_DAYS).contains(&session_ttl_days) {
            bail!(
                "PULSE_SESSION_TTL_DAYS must be between 1 and {}, got {}",
                MAX_SESSION_TTL_DAYS,
                session_ttl_days
            );
        }

        let timeout_secs: u64 = parse_or(var("PULSE_AUTH_TIMEOUT_SECS"), "PULSE_AUTH_TIMEOUT_SECS", 10)?;

        let cors_origins = match var("PULSE_CORS_ORIGINS") {
            Some(list) => list
                .split(',')
                .map(|o| o.trim().trim_end_matches('/').to_string())
                .filter(|o| !o.is_empty())
                .collect(),
            None => vec![app_origin.clone()],
        };

        Ok(Self {
            db_path: var("PULSE_DB_PATH").unwrap_or_else(|| "pulse.db".into()).into(),
            host: var("PULSE_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_or(var("PULSE_PORT"), "PULSE_PORT", 8000)?,
            auth_login_url: var("PULSE_AUTH_LOGIN_URL").unwrap_or_else(|| DEFAULT_LOGIN_URL.into()),
            auth_session_url: var("PULSE_AUTH_SESSION_URL")
                .unwrap_or_else(|| DEFAULT_SESSION_URL.into()),
            auth_logout_url: var("PULSE_AUTH_LOGOUT_URL"),
            auth_timeout: Duration::from_secs(timeout_secs),
            session_ttl_days,
            cookie_secure: parse_bool(var("PULSE_COOKIE_SECURE"), "PULSE_COOKIE_SECURE", true)?,
            cors_origins,
            app_origin,
        })
    }
}

fn parse_or<T>(raw: Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(v) => v.parse().with_context(|| format!("Invalid {}: '{}'", key, v)),
        None => Ok(default),
    }
}

fn parse_bool(raw: Option<String>, key: &str, default: bool) -> Result<bool> {
    match raw.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None => Ok(default),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(other) => bail!("Invalid {}: '{}'", key, other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.port, 8000);
        assert_eq!(cfg.db_path, PathBuf::from("pulse.db"));
        assert_eq!(cfg.auth_timeout, Duration::from_secs(10));
        assert_eq!(cfg.session_ttl_days, 7);
        assert!(cfg.cookie_secure);
        assert!(cfg.auth_logout_url.is_none());
        assert_eq!(cfg.cors_origins, vec!["http://localhost:3000".to_string()]);
    }

    #[test]
    fn year_long_sessions_are_allowed() {
        let cfg = config(&[("PULSE_SESSION_TTL_DAYS", "365")]).unwrap();
        assert_eq!(cfg.session_ttl_days, 365);
    }

    #[test]
    fn cors_list_is_split_and_trimmed() {
        let cfg = config(&[
            ("PULSE_APP_ORIGIN", "https://pulse.example.com/"),
            ("PULSE_CORS_ORIGINS", " https://a.example.com/, ,https://b.example.com"),
        ])
        .unwrap();
        assert_eq!(cfg.app_origin, "https://pulse.example.com");
        assert_eq!(
            cfg.cors_origins,
            vec!["https://a.example.com".to_string(), "https://b.example.com".to_string()]
        );
    }

    #[rstest]
    #[case("true", true)]
    #[case("ON", true)]
    #[case("0", false)]
    #[case("no", false)]
    fn cookie_secure_flag(#[case] raw: &str, #[case] expected: bool) {
        let cfg = config(&[("PULSE_COOKIE_SECURE", raw)]).unwrap();
        assert_eq!(cfg.cookie_secure, expected);
    }

    #[rstest]
    #[case("PULSE_PORT", "eighty")]
    #[case("PULSE_SESSION_TTL_DAYS", "0")]
    #[case("PULSE_SESSION_TTL_DAYS", "366")]
    #[case("PULSE_SESSION_TTL_DAYS", "9223372036854775807")]
    #[case("PULSE_AUTH_TIMEOUT_SECS", "-1")]
    #[case("PULSE_COOKIE_SECURE", "maybe")]
    fn bad_values_are_errors(#[case] key: &str, #[case] value: &str) {
        assert!(config(&[(key, value)]).is_err());
    }
}
