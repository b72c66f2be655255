use crate::changes::normalize;
use crate::error::ConfigError;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_SCAN_DIRS: &str = "content/docs,messages";
const DEFAULT_I18N_CONFIG_PATH: &str = "src/i18n/config.ts";
const DEFAULT_DIFF_CACHE_DIR: &str = ".diff_cache";

/// Run configuration, built once at process start and passed by reference.
#[derive(Debug, Clone)]
pub struct Config {
    // Content tree
    pub project_root: PathBuf,
    pub scan_dirs: Vec<PathBuf>,
    pub i18n_config_path: PathBuf,
    pub diff_cache_dir: PathBuf,

    // Translation model
    pub api_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub request_timeout: Duration,
    pub disable_thinking: bool,

    // Translation policy
    pub json_chunk_size: usize,
    pub max_attempts: u32,
    pub retry_delay: Duration,
    pub batch_delay: Duration,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// Relative paths resolve against `PROJECT_ROOT`, which itself defaults to
    /// the current directory.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let project_root = match lookup("PROJECT_ROOT") {
            Some(root) => PathBuf::from(root),
            None => std::env::current_dir().map_err(|e| ConfigError::InvalidValue {
                key: "PROJECT_ROOT".to_string(),
                reason: format!("current directory is not accessible: {}", e),
            })?,
        };

        let scan_dirs = lookup("SCAN_DIRS")
            .unwrap_or_else(|| DEFAULT_SCAN_DIRS.to_string())
            .split(',')
            .map(str::trim)
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from)
            .collect::<Vec<_>>();
        if scan_dirs.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "SCAN_DIRS".to_string(),
                reason: "at least one directory is required".to_string(),
            });
        }

        let json_chunk_size: usize = parse_or(&lookup, "JSON_CHUNK_SIZE", 50)?;
        if json_chunk_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "JSON_CHUNK_SIZE".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        let max_attempts: u32 = parse_or(&lookup, "TRANSLATE_MAX_ATTEMPTS", 3)?;
        if max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                key: "TRANSLATE_MAX_ATTEMPTS".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        let mut config = Self {
            project_root: PathBuf::new(),
            scan_dirs,
            i18n_config_path: PathBuf::from(
                lookup("I18N_CONFIG_PATH").unwrap_or_else(|| DEFAULT_I18N_CONFIG_PATH.to_string()),
            ),
            diff_cache_dir: PathBuf::from(
                lookup("DIFF_CACHE_DIR").unwrap_or_else(|| DEFAULT_DIFF_CACHE_DIR.to_string()),
            ),

            api_url: lookup("TRANSLATE_API_URL")
                .unwrap_or_else(|| "http://localhost:8000/v1/chat/completions".to_string()),
            api_key: lookup("TRANSLATE_API_KEY").filter(|key| !key.is_empty()),
            model: lookup("TRANSLATE_MODEL").unwrap_or_else(|| "Qwen3-14B".to_string()),
            temperature: parse_or(&lookup, "TRANSLATE_TEMPERATURE", 0.7)?,
            max_tokens: parse_or(&lookup, "TRANSLATE_MAX_TOKENS", 8192)?,
            request_timeout: Duration::from_secs(parse_or(&lookup, "TRANSLATE_TIMEOUT_SECS", 720)?),
            disable_thinking: parse_or(&lookup, "TRANSLATE_DISABLE_THINKING", true)?,

            json_chunk_size,
            max_attempts,
            retry_delay: Duration::from_millis(parse_or(
                &lookup,
                "TRANSLATE_RETRY_DELAY_MS",
                2000,
            )?),
            batch_delay: Duration::from_millis(parse_or(&lookup, "JSON_BATCH_DELAY_MS", 500)?),
        };
        config.set_project_root(project_root);

        Ok(config)
    }

    /// Re-anchor every relative path on a new project root.
    ///
    /// A relative root is made absolute against the current directory, so
    /// scanned paths and change-set paths share one form. Paths that were
    /// already absolute are left alone.
    pub fn set_project_root(&mut self, root: PathBuf) {
        let root = absolute_root(root);
        let rebase = |path: &Path| -> PathBuf {
            let relative = path.strip_prefix(&self.project_root).unwrap_or(path);
            if relative.is_absolute() {
                relative.to_path_buf()
            } else {
                normalize(&root.join(relative))
            }
        };

        self.scan_dirs = self.scan_dirs.iter().map(|dir| rebase(dir)).collect();
        self.i18n_config_path = rebase(&self.i18n_config_path);
        self.diff_cache_dir = rebase(&self.diff_cache_dir);
        self.project_root = root;
    }
}

fn absolute_root(root: PathBuf) -> PathBuf {
    let root = if root.is_absolute() {
        root
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(root),
            Err(_) => root,
        }
    };
    normalize(&root)
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            reason: format!("'{}' ({})", raw, e),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    // ==================== Defaults ====================

    #[test]
    fn test_defaults_resolve_against_project_root() {
        let config = Config::from_lookup(lookup_from(&[("PROJECT_ROOT", "/site")])).unwrap();

        assert_eq!(config.project_root, PathBuf::from("/site"));
        assert_eq!(
            config.scan_dirs,
            vec![PathBuf::from("/site/content/docs"), PathBuf::from("/site/messages")]
        );
        assert_eq!(config.i18n_config_path, PathBuf::from("/site/src/i18n/config.ts"));
        assert_eq!(config.diff_cache_dir, PathBuf::from("/site/.diff_cache"));
        assert_eq!(config.json_chunk_size, 50);
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.retry_delay, Duration::from_secs(2));
        assert_eq!(config.batch_delay, Duration::from_millis(500));
        assert_eq!(config.request_timeout, Duration::from_secs(720));
        assert!(config.disable_thinking);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_custom_scan_dirs_are_trimmed() {
        let config = Config::from_lookup(lookup_from(&[
            ("PROJECT_ROOT", "/site"),
            ("SCAN_DIRS", " docs , ,locales "),
        ]))
        .unwrap();

        assert_eq!(
            config.scan_dirs,
            vec![PathBuf::from("/site/docs"), PathBuf::from("/site/locales")]
        );
    }

    #[test]
    fn test_absolute_paths_are_kept() {
        let config = Config::from_lookup(lookup_from(&[
            ("PROJECT_ROOT", "/site"),
            ("DIFF_CACHE_DIR", "/tmp/diffs"),
        ]))
        .unwrap();

        assert_eq!(config.diff_cache_dir, PathBuf::from("/tmp/diffs"));
    }

    #[test]
    fn test_set_project_root_rebases_paths() {
        let mut config = Config::from_lookup(lookup_from(&[("PROJECT_ROOT", "/site")])).unwrap();
        config.set_project_root(PathBuf::from("/other"));

        assert_eq!(config.i18n_config_path, PathBuf::from("/other/src/i18n/config.ts"));
        assert_eq!(config.scan_dirs[0], PathBuf::from("/other/content/docs"));
    }

    #[test]
    fn test_relative_project_root_becomes_absolute() {
        let config = Config::from_lookup(lookup_from(&[("PROJECT_ROOT", ".")])).unwrap();
        let cwd = std::env::current_dir().unwrap();

        assert!(config.project_root.is_absolute());
        assert_eq!(config.project_root, cwd);
        assert_eq!(config.scan_dirs[0], cwd.join("content/docs"));
    }

    #[test]
    fn test_dot_components_are_dropped_from_root() {
        let config =
            Config::from_lookup(lookup_from(&[("PROJECT_ROOT", "/site/./docs-site")])).unwrap();
        assert_eq!(config.project_root.as_os_str(), "/site/docs-site");
    }

    // ==================== Validation ====================

    #[test]
    fn test_invalid_number_is_rejected() {
        let err = Config::from_lookup(lookup_from(&[
            ("PROJECT_ROOT", "/site"),
            ("JSON_CHUNK_SIZE", "many"),
        ]))
        .unwrap_err();

        assert!(err.to_string().contains("JSON_CHUNK_SIZE"));
    }

    #[test]
    fn test_zero_chunk_size_is_rejected() {
        let result = Config::from_lookup(lookup_from(&[
            ("PROJECT_ROOT", "/site"),
            ("JSON_CHUNK_SIZE", "0"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_attempts_is_rejected() {
        let result = Config::from_lookup(lookup_from(&[
            ("PROJECT_ROOT", "/site"),
            ("TRANSLATE_MAX_ATTEMPTS", "0"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_api_key_is_treated_as_unset() {
        let config = Config::from_lookup(lookup_from(&[
            ("PROJECT_ROOT", "/site"),
            ("TRANSLATE_API_KEY", ""),
        ]))
        .unwrap();
        assert!(config.api_key.is_none());
    }

    // ==================== Environment ====================

    #[test]
    #[serial]
    fn test_from_env_reads_process_environment() {
        std::env::set_var("PROJECT_ROOT", "/env-root");
        std::env::set_var("TRANSLATE_MODEL", "test-model");

        let config = Config::from_env().unwrap();

        std::env::remove_var("PROJECT_ROOT");
        std::env::remove_var("TRANSLATE_MODEL");

        assert_eq!(config.project_root, PathBuf::from("/env-root"));
        assert_eq!(config.model, "test-model");
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_bad_boolean() {
        std::env::set_var("PROJECT_ROOT", "/env-root");
        std::env::set_var("TRANSLATE_DISABLE_THINKING", "sometimes");

        let result = Config::from_env();

        std::env::remove_var("PROJECT_ROOT");
        std::env::remove_var("TRANSLATE_DISABLE_THINKING");

        assert!(result.is_err());
    }
}
