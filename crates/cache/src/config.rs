//! Loader configuration for the lazy page window.
//!
//! Configuration can be loaded from a file, environment variables,
//! or created programmatically.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Configuration for windowed page loading.
#[derive(Debug, Clone, PartialEq)]
pub struct LoaderConfig {
    /// Number of pages requested per window
    pub page_window: usize,
    /// Extra pages fetched on each side of the visible window
    pub prefetch_pages: usize,
    /// Keep the selection even when its page is evicted from the cache
    pub keep_selection_on_evict: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self { page_window: 5, prefetch_pages: 2, keep_selection_on_evict: false }
    }
}

impl LoaderConfig {
    pub fn new(page_window: usize, prefetch_pages: usize) -> Self {
        Self { page_window: page_window.max(1), prefetch_pages, ..Self::default() }
    }

    pub fn with_page_window(mut self, pages: usize) -> Self {
        self.page_window = pages.max(1);
        self
    }

    pub fn with_prefetch_pages(mut self, pages: usize) -> Self {
        self.prefetch_pages = pages;
        self
    }

    pub fn with_keep_selection_on_evict(mut self, keep: bool) -> Self {
        self.keep_selection_on_evict = keep;
        self
    }

    /// Returns the default configuration file location for the current platform.
    ///
    /// - macOS: ~/Library/Application Support/annotator/loader.toml
    /// - Linux: ~/.config/annotator/loader.toml
    /// - Windows: %APPDATA%\annotator\loader.toml
    pub fn default_config_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("annotator").join("loader.toml")
        } else {
            PathBuf::from("annotator-loader.toml")
        }
    }

    /// Loads configuration from environment variables.
    ///
    /// Environment variables:
    /// - `ANNOTATOR_PAGE_WINDOW`: pages per window (default: 5)
    /// - `ANNOTATOR_PREFETCH_PAGES`: prefetch pages per side (default: 2)
    /// - `ANNOTATOR_KEEP_SELECTION_ON_EVICT`: `true`/`false` (default: false)
    ///
    /// # Errors
    /// Returns an error if any environment variable contains an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("ANNOTATOR_PAGE_WINDOW") {
            config.page_window = parse_window(&val, "ANNOTATOR_PAGE_WINDOW")?;
        }

        if let Ok(val) = std::env::var("ANNOTATOR_PREFETCH_PAGES") {
            config.prefetch_pages = val
                .parse::<usize>()
                .map_err(|_| ConfigError::InvalidValue("ANNOTATOR_PREFETCH_PAGES".to_string()))?;
        }

        if let Ok(val) = std::env::var("ANNOTATOR_KEEP_SELECTION_ON_EVICT") {
            config.keep_selection_on_evict = val.parse::<bool>().map_err(|_| {
                ConfigError::InvalidValue("ANNOTATOR_KEEP_SELECTION_ON_EVICT".to_string())
            })?;
        }

        Ok(config)
    }

    /// Loads configuration from a TOML-style `key = value` file.
    ///
    /// Expected file format:
    /// ```toml
    /// page_window = 5
    /// prefetch_pages = 2
    /// keep_selection_on_evict = false
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref())?;

        Self::from_toml(&contents)
    }

    fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        for line in toml_str.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim();
                let value = value.trim().trim_matches('"');

                match key {
                    "page_window" => config.page_window = parse_window(value, key)?,
                    "prefetch_pages" => {
                        config.prefetch_pages = value
                            .parse::<usize>()
                            .map_err(|_| ConfigError::InvalidValue(key.to_string()))?;
                    }
                    "keep_selection_on_evict" => {
                        config.keep_selection_on_evict = value
                            .parse::<bool>()
                            .map_err(|_| ConfigError::InvalidValue(key.to_string()))?;
                    }
                    _ => {} // Ignore unknown keys
                }
            }
        }

        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path.as_ref(), self.to_toml())?;
        Ok(())
    }

    fn to_toml(&self) -> String {
        format!(
            "# Annotator page loader configuration\n\
             page_window = {}\n\
             prefetch_pages = {}\n\
             keep_selection_on_evict = {}\n",
            self.page_window, self.prefetch_pages, self.keep_selection_on_evict
        )
    }
}

fn parse_window(value: &str, key: &str) -> Result<usize, ConfigError> {
    match value.parse::<usize>() {
        Ok(pages) if pages > 0 => Ok(pages),
        _ => Err(ConfigError::InvalidValue(key.to_string())),
    }
}

/// Errors that can occur during configuration operations.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for configuration key: {0}")]
    InvalidValue(String),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    const ENV_KEYS: [&str; 3] =
        ["ANNOTATOR_PAGE_WINDOW", "ANNOTATOR_PREFETCH_PAGES", "ANNOTATOR_KEEP_SELECTION_ON_EVICT"];

    #[test]
    fn test_default_config() {
        let config = LoaderConfig::default();
        assert_eq!(config.page_window, 5);
        assert_eq!(config.prefetch_pages, 2);
        assert!(!config.keep_selection_on_evict);
    }

    #[test]
    fn test_builder_methods() {
        let config = LoaderConfig::default()
            .with_page_window(0)
            .with_prefetch_pages(4)
            .with_keep_selection_on_evict(true);

        assert_eq!(config.page_window, 1);
        assert_eq!(config.prefetch_pages, 4);
        assert!(config.keep_selection_on_evict);
    }

    #[test]
    #[serial]
    fn test_from_env() {
        let _guard = EnvGuard::new(&ENV_KEYS);

        env::set_var("ANNOTATOR_PAGE_WINDOW", "8");
        env::set_var("ANNOTATOR_PREFETCH_PAGES", "1");
        env::set_var("ANNOTATOR_KEEP_SELECTION_ON_EVICT", "true");

        let config = LoaderConfig::from_env().unwrap();
        assert_eq!(config, LoaderConfig::new(8, 1).with_keep_selection_on_evict(true));
    }

    #[test]
    #[serial]
    fn test_from_env_partial() {
        let _guard = EnvGuard::new(&ENV_KEYS);

        env::remove_var("ANNOTATOR_PREFETCH_PAGES");
        env::remove_var("ANNOTATOR_KEEP_SELECTION_ON_EVICT");
        env::set_var("ANNOTATOR_PAGE_WINDOW", "3");

        let config = LoaderConfig::from_env().unwrap();
        assert_eq!(config.page_window, 3);
        assert_eq!(config.prefetch_pages, 2); // default
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_zero_window() {
        let _guard = EnvGuard::new(&ENV_KEYS);

        env::set_var("ANNOTATOR_PAGE_WINDOW", "0");
        assert!(matches!(LoaderConfig::from_env(), Err(ConfigError::InvalidValue(_))));
    }

    // Saves and restores environment variables around a test
    struct EnvGuard {
        vars: Vec<(String, Option<String>)>,
    }

    impl EnvGuard {
        fn new(var_names: &[&str]) -> Self {
            let vars = var_names
                .iter()
                .map(|name| (name.to_string(), env::var(name).ok()))
                .collect();
            Self { vars }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (name, value) in &self.vars {
                match value {
                    Some(v) => env::set_var(name, v),
                    None => env::remove_var(name),
                }
            }
        }
    }

    #[test]
    fn test_from_toml_partial() {
        let toml = r#"
            # only the window
            page_window = 10
        "#;

        let config = LoaderConfig::from_toml(toml).unwrap();
        assert_eq!(config.page_window, 10);
        assert_eq!(config.prefetch_pages, 2);
    }

    #[test]
    fn test_file_save_and_load() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let config_path = temp.path().join("nested").join("loader.toml");

        let config = LoaderConfig::new(7, 3).with_keep_selection_on_evict(true);
        config.save_to_file(&config_path).unwrap();

        let loaded = LoaderConfig::from_file(&config_path).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let result = LoaderConfig::from_file(temp.path().join("absent.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
