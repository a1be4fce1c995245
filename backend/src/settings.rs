//! Runtime configuration loaded via OrthoConfig.
//!
//! Values come from CLI flags, environment variables and configuration files
//! in OrthoConfig's usual precedence. Unset values fall back to defaults here
//! and are validated before they reach the domain.

use std::net::SocketAddr;
use std::path::PathBuf;

use chrono::{FixedOffset, TimeDelta};
use ortho_config::OrthoConfig;
use serde::Deserialize;
use url::Url;

use crate::domain::ProgressionPolicy;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_SESSION_KEY_FILE: &str = "/var/run/secrets/session_key";
const DEFAULT_CERTIFICATE_DIR: &str = "certificates";
const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;
const MAX_OFFSET_MINUTES: i32 = 18 * 60;

/// Problems found while validating settings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        min: i64,
        max: i64,
        value: i64,
    },
    #[error("invalid bind address {value}: {message}")]
    BindAddress { value: String, message: String },
    #[error("invalid notification webhook url {value}: {message}")]
    WebhookUrl { value: String, message: String },
}

fn in_range(field: &'static str, value: i64, min: i64, max: i64) -> Result<i64, SettingsError> {
    if (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(SettingsError::OutOfRange {
            field,
            min,
            max,
            value,
        })
    }
}

/// Progression engine tunables.
///
/// Every field carries its default here so the struct loads with no
/// `PROGRESSION_*` source present.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "PROGRESSION")]
pub struct ProgressionSettings {
    /// Minutes after a failed attempt before a new attempt may start.
    #[ortho_config(default = 240)]
    pub quiz_gate_cooldown_minutes: i64,
    /// Minutes added to a failed attempt for the "next attempt at" hint.
    #[ortho_config(default = 120)]
    pub quiz_retry_hint_minutes: i64,
    /// Grace allowed beyond a quiz time limit.
    #[ortho_config(default = 15)]
    pub quiz_time_grace_seconds: i64,
    /// Share of a video that must be watched, in percent.
    #[ortho_config(default = 90)]
    pub video_watch_threshold_percent: i64,
    /// Pass mark for quizzes without their own.
    #[ortho_config(default = 50)]
    pub default_passing_score: i64,
    /// Offset of the streak reference zone from UTC.
    #[ortho_config(default = 240)]
    pub streak_utc_offset_minutes: i64,
}

const MAX_COOLDOWN_MINUTES: i64 = 60 * 24 * 30;

impl ProgressionSettings {
    /// Validate and convert into domain values.
    ///
    /// # Errors
    /// Returns [`SettingsError::OutOfRange`] for values the engine cannot use.
    pub fn to_policy(&self) -> Result<ProgressionPolicy, SettingsError> {
        let gate = in_range(
            "quiz_gate_cooldown_minutes",
            self.quiz_gate_cooldown_minutes,
            0,
            MAX_COOLDOWN_MINUTES,
        )?;
        let hint = in_range(
            "quiz_retry_hint_minutes",
            self.quiz_retry_hint_minutes,
            0,
            MAX_COOLDOWN_MINUTES,
        )?;
        let grace = in_range("quiz_time_grace_seconds", self.quiz_time_grace_seconds, 0, 3600)?;
        let threshold = in_range(
            "video_watch_threshold_percent",
            self.video_watch_threshold_percent,
            1,
            100,
        )?;
        let passing = in_range("default_passing_score", self.default_passing_score, 1, 100)?;
        let offset_minutes = in_range(
            "streak_utc_offset_minutes",
            self.streak_utc_offset_minutes,
            -i64::from(MAX_OFFSET_MINUTES),
            i64::from(MAX_OFFSET_MINUTES),
        )?;
        // In-range values always fit the narrower domain types.
        let defaults = ProgressionPolicy::default();
        let activity_zone = i32::try_from(offset_minutes * 60)
            .ok()
            .and_then(FixedOffset::east_opt)
            .unwrap_or(defaults.activity_zone);

        Ok(ProgressionPolicy {
            quiz_gate_cooldown: TimeDelta::minutes(gate),
            quiz_retry_hint: TimeDelta::minutes(hint),
            quiz_time_grace_seconds: i32::try_from(grace)
                .unwrap_or(defaults.quiz_time_grace_seconds),
            video_watch_threshold_percent: u8::try_from(threshold)
                .unwrap_or(defaults.video_watch_threshold_percent),
            default_passing_score: u8::try_from(passing).unwrap_or(defaults.default_passing_score),
            activity_zone,
        })
    }
}

/// Process-level settings for the HTTP server and its adapters.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "LMS")]
pub struct ServerSettings {
    /// Socket address to bind.
    pub bind_addr: Option<String>,
    /// PostgreSQL connection string; without it the server cannot start.
    pub database_url: Option<String>,
    /// Upper bound on pooled database connections.
    pub database_max_connections: Option<u32>,
    /// File holding the session signing key.
    pub session_key_file: Option<PathBuf>,
    /// Allow a generated session key when the key file is unreadable.
    #[ortho_config(default = false)]
    pub session_allow_ephemeral: bool,
    /// Send session cookies without `Secure`, for plain-HTTP local runs.
    #[ortho_config(default = false)]
    pub session_cookie_insecure: bool,
    /// Directory receiving rendered certificates.
    pub certificate_dir: Option<PathBuf>,
    /// Endpoint receiving learner notifications; log-only when unset.
    pub notification_webhook_url: Option<String>,
}

impl ServerSettings {
    /// Parsed bind address.
    ///
    /// # Errors
    /// Returns [`SettingsError::BindAddress`] when the address does not parse.
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        let raw = self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
        raw.parse().map_err(|error: std::net::AddrParseError| SettingsError::BindAddress {
            value: raw.to_owned(),
            message: error.to_string(),
        })
    }

    pub fn database_max_connections(&self) -> u32 {
        self.database_max_connections
            .unwrap_or(DEFAULT_DATABASE_MAX_CONNECTIONS)
    }

    pub fn session_key_file(&self) -> PathBuf {
        self.session_key_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SESSION_KEY_FILE))
    }

    /// Whether session cookies carry `Secure`; true unless opted out.
    pub fn session_cookie_secure(&self) -> bool {
        !self.session_cookie_insecure
    }

    pub fn certificate_dir(&self) -> PathBuf {
        self.certificate_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CERTIFICATE_DIR))
    }

    /// Parsed webhook endpoint, if configured.
    ///
    /// # Errors
    /// Returns [`SettingsError::WebhookUrl`] when the URL does not parse.
    pub fn notification_webhook_url(&self) -> Result<Option<Url>, SettingsError> {
        self.notification_webhook_url
            .as_deref()
            .filter(|raw| !raw.trim().is_empty())
            .map(|raw| {
                Url::parse(raw).map_err(|error| SettingsError::WebhookUrl {
                    value: raw.to_owned(),
                    message: error.to_string(),
                })
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for configuration parsing and validation.

    use super::*;
    use std::ffi::OsString;

    use env_lock::lock_env;
    use rstest::rstest;

    const PROGRESSION_VARS: [&str; 6] = [
        "PROGRESSION_QUIZ_GATE_COOLDOWN_MINUTES",
        "PROGRESSION_QUIZ_RETRY_HINT_MINUTES",
        "PROGRESSION_QUIZ_TIME_GRACE_SECONDS",
        "PROGRESSION_VIDEO_WATCH_THRESHOLD_PERCENT",
        "PROGRESSION_DEFAULT_PASSING_SCORE",
        "PROGRESSION_STREAK_UTC_OFFSET_MINUTES",
    ];

    fn load_progression() -> ProgressionSettings {
        ProgressionSettings::load_from_iter([OsString::from("lms-backend")])
            .expect("config should load")
    }

    fn load_server() -> ServerSettings {
        ServerSettings::load_from_iter([OsString::from("lms-backend")]).expect("config should load")
    }

    #[rstest]
    fn progression_defaults_are_used_when_missing() {
        let _guard = lock_env(PROGRESSION_VARS.map(|name| (name, None::<String>)));

        let policy = load_progression().to_policy().expect("defaults are valid");
        assert_eq!(policy, ProgressionPolicy::default());
        assert_eq!(policy.quiz_gate_cooldown, TimeDelta::hours(4));
        assert_eq!(policy.quiz_retry_hint, TimeDelta::hours(2));
        assert_eq!(policy.activity_zone.local_minus_utc(), 4 * 3600);
    }

    #[rstest]
    fn progression_environment_overrides_are_respected() {
        let _guard = lock_env([
            ("PROGRESSION_QUIZ_GATE_COOLDOWN_MINUTES", Some("30".to_owned())),
            ("PROGRESSION_QUIZ_RETRY_HINT_MINUTES", Some("30".to_owned())),
            ("PROGRESSION_QUIZ_TIME_GRACE_SECONDS", Some("5".to_owned())),
            ("PROGRESSION_VIDEO_WATCH_THRESHOLD_PERCENT", Some("80".to_owned())),
            ("PROGRESSION_DEFAULT_PASSING_SCORE", Some("60".to_owned())),
            ("PROGRESSION_STREAK_UTC_OFFSET_MINUTES", Some("-300".to_owned())),
        ]);

        let policy = load_progression().to_policy().expect("overrides are valid");
        assert_eq!(policy.quiz_gate_cooldown, TimeDelta::minutes(30));
        assert_eq!(policy.quiz_retry_hint, TimeDelta::minutes(30));
        assert_eq!(policy.quiz_time_grace_seconds, 5);
        assert_eq!(policy.video_watch_threshold_percent, 80);
        assert_eq!(policy.default_passing_score, 60);
        assert_eq!(policy.activity_zone.local_minus_utc(), -5 * 3600);
    }

    #[rstest]
    #[case("PROGRESSION_VIDEO_WATCH_THRESHOLD_PERCENT", "0")]
    #[case("PROGRESSION_VIDEO_WATCH_THRESHOLD_PERCENT", "101")]
    #[case("PROGRESSION_DEFAULT_PASSING_SCORE", "0")]
    #[case("PROGRESSION_STREAK_UTC_OFFSET_MINUTES", "1200")]
    #[case("PROGRESSION_QUIZ_GATE_COOLDOWN_MINUTES", "-1")]
    fn out_of_range_values_are_rejected(#[case] name: &str, #[case] value: &str) {
        let mut vars = PROGRESSION_VARS.map(|var| (var, None::<String>));
        for entry in &mut vars {
            if entry.0 == name {
                entry.1 = Some(value.to_owned());
            }
        }
        let _guard = lock_env(vars);

        let result = load_progression().to_policy();
        assert!(matches!(result, Err(SettingsError::OutOfRange { .. })));
    }

    #[rstest]
    fn server_defaults_are_used_when_missing() {
        let _guard = lock_env([
            ("LMS_BIND_ADDR", None::<String>),
            ("LMS_DATABASE_URL", None::<String>),
            ("LMS_DATABASE_MAX_CONNECTIONS", None::<String>),
            ("LMS_SESSION_KEY_FILE", None::<String>),
            ("LMS_SESSION_ALLOW_EPHEMERAL", None::<String>),
            ("LMS_SESSION_COOKIE_INSECURE", None::<String>),
            ("LMS_CERTIFICATE_DIR", None::<String>),
            ("LMS_NOTIFICATION_WEBHOOK_URL", None::<String>),
        ]);

        let settings = load_server();
        assert_eq!(
            settings.bind_addr().expect("default address parses"),
            DEFAULT_BIND_ADDR.parse::<SocketAddr>().expect("valid literal")
        );
        assert!(settings.database_url.is_none());
        assert_eq!(settings.database_max_connections(), DEFAULT_DATABASE_MAX_CONNECTIONS);
        assert!(!settings.session_allow_ephemeral);
        assert!(settings.session_cookie_secure());
        assert_eq!(settings.certificate_dir(), PathBuf::from(DEFAULT_CERTIFICATE_DIR));
        assert_eq!(settings.notification_webhook_url(), Ok(None));
    }

    #[rstest]
    fn server_environment_overrides_are_respected() {
        let _guard = lock_env([
            ("LMS_BIND_ADDR", Some("127.0.0.1:9090".to_owned())),
            ("LMS_DATABASE_URL", Some("postgres://db/lms".to_owned())),
            ("LMS_DATABASE_MAX_CONNECTIONS", Some("32".to_owned())),
            ("LMS_CERTIFICATE_DIR", Some("/srv/certificates".to_owned())),
            ("LMS_NOTIFICATION_WEBHOOK_URL", Some("https://hooks.example.test/lms".to_owned())),
        ]);

        let settings = load_server();
        assert_eq!(
            settings.bind_addr().expect("override parses"),
            "127.0.0.1:9090".parse::<SocketAddr>().expect("valid literal")
        );
        assert_eq!(settings.database_url.as_deref(), Some("postgres://db/lms"));
        assert_eq!(settings.database_max_connections(), 32);
        assert_eq!(settings.certificate_dir(), PathBuf::from("/srv/certificates"));
        assert!(matches!(settings.notification_webhook_url(), Ok(Some(_))));
    }

    #[rstest]
    #[case(None, true)]
    #[case(Some("false"), true)]
    #[case(Some("true"), false)]
    fn session_cookies_stay_secure_unless_opted_out(
        #[case] insecure: Option<&str>,
        #[case] expected_secure: bool,
    ) {
        let _guard = lock_env([(
            "LMS_SESSION_COOKIE_INSECURE",
            insecure.map(str::to_owned),
        )]);

        assert_eq!(load_server().session_cookie_secure(), expected_secure);
    }

    #[rstest]
    fn server_rejects_malformed_webhook_url() {
        let _guard = lock_env([("LMS_NOTIFICATION_WEBHOOK_URL", Some("not a url".to_owned()))]);

        let settings = load_server();
        assert!(matches!(
            settings.notification_webhook_url(),
            Err(SettingsError::WebhookUrl { .. })
        ));
    }
}
