use secrecy::Secret;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_MODEL: &str = "gemini-1.5-pro-latest";
const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Default upload cap (10MB).
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
const DEFAULT_RETENTION_SECS: u64 = 24 * 60 * 60;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 300;

#[derive(Debug, Clone)]
pub struct AssistConfig {
    pub common: core_config::Config,
    pub google: GoogleConfig,
    pub genai: GenaiSettings,
    pub uploads: UploadSettings,
    pub web: WebSettings,
}

#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub api_key: Secret<String>,
}

#[derive(Debug, Clone)]
pub struct GenaiSettings {
    /// Model used for both assistant capabilities (e.g., gemini-1.5-pro-latest)
    pub model: String,
    pub api_base: String,
    pub timeout_secs: u64,
}

impl GenaiSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone)]
pub struct UploadSettings {
    pub dir: PathBuf,
    pub naming: UploadNaming,
    pub max_bytes: usize,
    /// Files older than this are swept. Zero keeps uploads forever.
    pub retention_secs: u64,
    pub sweep_interval_secs: u64,
}

impl UploadSettings {
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

#[derive(Debug, Clone)]
pub struct WebSettings {
    pub static_dir: PathBuf,
}

/// How an upload is named on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadNaming {
    /// `<uuid>-<original name>`; uploads never collide.
    Unique,
    /// The original file name; a same-named upload replaces the previous file.
    Original,
}

impl FromStr for UploadNaming {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "unique" => Ok(UploadNaming::Unique),
            "original" => Ok(UploadNaming::Original),
            _ => Err(format!("Invalid upload naming policy: {}", s)),
        }
    }
}

impl AssistConfig {
    pub fn load() -> Result<Self, AppError> {
        // Load common config (handles .env and APP__ prefix)
        let common_config = core_config::Config::load()?;
        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        Ok(AssistConfig {
            common: common_config,
            google: GoogleConfig {
                api_key: Secret::new(get_env("GOOGLE_API_KEY", None, is_prod)?),
            },
            genai: GenaiSettings {
                model: get_env("GENAI_MODEL", Some(DEFAULT_MODEL), is_prod)?,
                api_base: get_env("GENAI_API_BASE", Some(DEFAULT_API_BASE), is_prod)?,
                timeout_secs: parse_value(
                    "GENAI_TIMEOUT_SECS",
                    &get_env(
                        "GENAI_TIMEOUT_SECS",
                        Some(&DEFAULT_TIMEOUT_SECS.to_string()),
                        is_prod,
                    )?,
                )?,
            },
            uploads: UploadSettings {
                dir: PathBuf::from(get_env("UPLOAD_DIR", Some("uploads"), is_prod)?),
                naming: get_env("UPLOAD_NAMING", Some("unique"), is_prod)?
                    .parse()
                    .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?,
                max_bytes: parse_value(
                    "UPLOAD_MAX_BYTES",
                    &get_env(
                        "UPLOAD_MAX_BYTES",
                        Some(&DEFAULT_MAX_UPLOAD_BYTES.to_string()),
                        is_prod,
                    )?,
                )?,
                retention_secs: parse_value(
                    "UPLOAD_RETENTION_SECS",
                    &get_env(
                        "UPLOAD_RETENTION_SECS",
                        Some(&DEFAULT_RETENTION_SECS.to_string()),
                        is_prod,
                    )?,
                )?,
                sweep_interval_secs: parse_value(
                    "UPLOAD_SWEEP_INTERVAL_SECS",
                    &get_env(
                        "UPLOAD_SWEEP_INTERVAL_SECS",
                        Some(&DEFAULT_SWEEP_INTERVAL_SECS.to_string()),
                        is_prod,
                    )?,
                )?,
            },
            web: WebSettings {
                static_dir: PathBuf::from(get_env(
                    "STATIC_DIR",
                    Some("assist-service/static"),
                    is_prod,
                )?),
            },
        })
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| {
        AppError::ConfigError(anyhow::anyhow!("{} has invalid value '{}': {}", key, raw, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_naming_parses_case_insensitively() {
        assert_eq!("unique".parse::<UploadNaming>(), Ok(UploadNaming::Unique));
        assert_eq!("ORIGINAL".parse::<UploadNaming>(), Ok(UploadNaming::Original));
        assert!("random".parse::<UploadNaming>().is_err());
    }

    #[test]
    fn numeric_values_are_validated() {
        assert_eq!(parse_value::<u64>("GENAI_TIMEOUT_SECS", " 30 ").unwrap(), 30);

        let err = parse_value::<usize>("UPLOAD_MAX_BYTES", "ten").unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
        assert!(err.to_string().contains("UPLOAD_MAX_BYTES"));
    }

    #[test]
    fn get_env_falls_back_to_default_outside_prod() {
        let value = get_env("ASSIST_TEST_SURELY_UNSET_KEY", Some("fallback"), false).unwrap();
        assert_eq!(value, "fallback");

        assert!(get_env("ASSIST_TEST_SURELY_UNSET_KEY", None, false).is_err());
        assert!(get_env("ASSIST_TEST_SURELY_UNSET_KEY", Some("fallback"), true).is_err());
    }

    #[test]
    fn sweep_interval_is_never_zero() {
        let settings = UploadSettings {
            dir: PathBuf::from("uploads"),
            naming: UploadNaming::Unique,
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            retention_secs: 0,
            sweep_interval_secs: 0,
        };
        assert_eq!(settings.sweep_interval(), Duration::from_secs(1));
        assert!(settings.retention().is_zero());
    }
}
