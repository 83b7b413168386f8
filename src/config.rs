//! Adapter configuration
//!
//! Every section is optional; a missing file or section means the built-in defaults, which match
//! a stock CasperJS-on-PhantomJS installation laid out next to the adapter binary:
//!
//! ```toml
//! [engine]
//! binary = "PhantomJs/phantomjs"
//! bootstrap_script = "CasperJs/bin/bootstrap.js"
//! bootstrap_flag = "casper-path"
//! harness_root = "CasperJs"
//! default_args = ["--ignore-ssl-errors=true"]
//!
//! [discovery]
//! call_path = "casper.test.begin"
//! argument_index = 0
//!
//! [protocol]
//! test_marker = "# "
//! failure_prefix = "FAIL"
//! fatal_marker = "CasperError"
//! ```

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::discovery::{CallPattern, PatternError};

/// File name searched for by [`find_config`].
pub const CONFIG_FILE_NAME: &str = "casper-adapter.toml";

/// Engine flags the underlying browser engine consumes itself (PhantomJS command line).
pub const DEFAULT_NATIVE_FLAGS: &[&str] = &[
    "cookies-file",
    "config",
    "debug",
    "disk-cache",
    "ignore-ssl-errors",
    "load-images",
    "load-plugins",
    "local-storage-path",
    "local-storage-quota",
    "local-to-remote-url-access",
    "max-disk-cache-size",
    "output-encoding",
    "proxy",
    "proxy-auth",
    "proxy-type",
    "remote-debugger-port",
    "remote-debugger-autorun",
    "script-encoding",
    "ssl-protocol",
    "ssl-certificates-path",
    "web-security",
    "webdriver",
    "webdriver-logfile",
    "webdriver-loglevel",
    "webdriver-selenium-grid-hub",
    "wd",
    "w",
];

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {error}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        error: io::Error,
    },

    #[error("invalid config file {}: {error}", .path.display())]
    Toml {
        path: PathBuf,
        #[source]
        error: toml::de::Error,
    },

    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

// ============================================================================
// Configuration model
// ============================================================================

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AdapterConfig {
    pub engine: EngineConfig,
    pub discovery: DiscoveryConfig,
    pub resolver: ResolverConfig,
    pub protocol: ProtocolConfig,
    pub staging: StagingConfig,
}

/// How the external engine is located and invoked.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Engine executable; relative paths are taken from the install directory.
    pub binary: PathBuf,
    /// Harness entry script passed to the engine (relative to the install directory).
    pub bootstrap_script: PathBuf,
    /// Name of the flag that tells the bootstrap script where the harness lives.
    pub bootstrap_flag: String,
    pub harness_root: PathBuf,
    /// Working directory of the engine. Defaults to the directory of the running executable.
    pub install_dir: Option<PathBuf>,
    /// Caller flags with these names go before the bootstrap script.
    pub native_flags: Vec<String>,
    /// Appended after the staged test file.
    pub default_args: Vec<String>,
    pub timeout_secs: Option<u64>,
    /// How long a cancelled or timed-out engine may keep writing before it is killed.
    pub kill_grace_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("PhantomJs").join("phantomjs"),
            bootstrap_script: PathBuf::from("CasperJs").join("bin").join("bootstrap.js"),
            bootstrap_flag: "casper-path".to_string(),
            harness_root: PathBuf::from("CasperJs"),
            install_dir: None,
            native_flags: DEFAULT_NATIVE_FLAGS.iter().map(|f| f.to_string()).collect(),
            default_args: vec!["--ignore-ssl-errors=true".to_string()],
            timeout_secs: None,
            kill_grace_ms: 2000,
        }
    }
}

impl EngineConfig {
    /// The directory the engine runs in and relative engine paths resolve against.
    pub fn install_dir(&self) -> PathBuf {
        if let Some(dir) = &self.install_dir {
            return dir.clone();
        }
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn kill_grace(&self) -> Duration {
        Duration::from_millis(self.kill_grace_ms)
    }
}

/// Which calls declare tests, and which files are scanned for them.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiscoveryConfig {
    /// Dotted callee path, e.g. `casper.test.begin`.
    pub call_path: String,
    /// Position of the string-literal test name among the call arguments.
    pub argument_index: usize,
    /// File extensions (without the dot) collected when a directory is given.
    pub extensions: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            call_path: "casper.test.begin".to_string(),
            argument_index: 0,
            extensions: vec!["js".to_string()],
        }
    }
}

impl DiscoveryConfig {
    pub fn call_pattern(&self) -> Result<CallPattern, PatternError> {
        CallPattern::parse(&self.call_path, self.argument_index)
    }
}

/// Local `require` resolution.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolverConfig {
    pub require_function: String,
    /// Suffixes tried in order; `""` means the specifier already names the file.
    pub candidate_extensions: Vec<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            require_function: "require".to_string(),
            candidate_extensions: ["", ".js", ".ts", ".coffee", ".json"]
                .iter()
                .map(|e| e.to_string())
                .collect(),
        }
    }
}

/// Markers of the engine's line-oriented result protocol.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProtocolConfig {
    pub test_marker: String,
    pub failure_prefix: String,
    pub fatal_marker: String,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            test_marker: "# ".to_string(),
            failure_prefix: "FAIL".to_string(),
            fatal_marker: "CasperError".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StagingConfig {
    /// Parent directory of staging workspaces. Defaults to `<install dir>/tmp`.
    pub root: Option<PathBuf>,
}

impl AdapterConfig {
    /// Check the invariants serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.discovery.call_pattern()?;
        if self.resolver.require_function.is_empty() {
            return Err(ConfigError::Invalid("resolver.require_function must not be empty".into()));
        }
        if self.resolver.candidate_extensions.is_empty() {
            return Err(ConfigError::Invalid(
                "resolver.candidate_extensions must list at least one extension".into(),
            ));
        }
        for (key, value) in [
            ("protocol.test_marker", &self.protocol.test_marker),
            ("protocol.failure_prefix", &self.protocol.failure_prefix),
            ("protocol.fatal_marker", &self.protocol.fatal_marker),
            ("engine.bootstrap_flag", &self.engine.bootstrap_flag),
        ] {
            if value.is_empty() {
                return Err(ConfigError::Invalid(format!("{} must not be empty", key)));
            }
        }
        Ok(())
    }

    /// Directory staging workspaces are created under.
    pub fn staging_root(&self) -> PathBuf {
        match &self.staging.root {
            Some(root) => root.clone(),
            None => self.engine.install_dir().join("tmp"),
        }
    }

    /// Make relative directories in the file relative to the directory holding it.
    fn anchor_paths(&mut self, base: &Path) {
        if let Some(dir) = self.engine.install_dir.as_mut().filter(|d| d.is_relative()) {
            *dir = base.join(&*dir);
        }
        if let Some(root) = self.staging.root.as_mut().filter(|r| r.is_relative()) {
            *root = base.join(&*root);
        }
    }
}

// ============================================================================
// Loading
// ============================================================================

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<AdapterConfig, ConfigError> {
    info!(path = %path.display(), "loading config");
    let content = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
        path: path.to_path_buf(),
        error,
    })?;
    let mut config: AdapterConfig = toml::from_str(&content).map_err(|error| ConfigError::Toml {
        path: path.to_path_buf(),
        error,
    })?;
    if let Some(base) = path.parent() {
        config.anchor_paths(base);
    }
    config.validate()?;
    debug!(path = %path.display(), "config loaded and validated");
    Ok(config)
}

/// Find [`CONFIG_FILE_NAME`] in `start_dir` or any of its ancestors.
pub fn find_config(start_dir: &Path) -> Option<PathBuf> {
    debug!(start_dir = %start_dir.display(), "searching for config file");
    let mut current = start_dir.to_path_buf();
    loop {
        let candidate = current.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            info!(path = %candidate.display(), "found config file");
            return Some(candidate);
        }
        if !current.pop() {
            break;
        }
    }
    debug!("no config file found");
    None
}

/// Load the explicit file if given, else the nearest config file, else defaults.
pub fn resolve_config(explicit: Option<&Path>, start_dir: &Path) -> Result<(AdapterConfig, Option<PathBuf>), ConfigError> {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => find_config(start_dir),
    };
    match path {
        Some(path) => Ok((load_config(&path)?, Some(path))),
        None => Ok((AdapterConfig::default(), None)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let config = AdapterConfig::default();
        config.validate().unwrap();
        assert_eq!(config.discovery.call_pattern().unwrap().to_string(), "casper.test.begin");
        assert_eq!(config.resolver.candidate_extensions[1], ".js");
        assert_eq!(config.engine.kill_grace(), Duration::from_millis(2000));
        assert!(config.engine.native_flags.iter().any(|f| f == "proxy"));
    }

    #[test]
    fn test_find_config_walks_up() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join(CONFIG_FILE_NAME);
        std::fs::write(&config_path, "").unwrap();
        let nested = temp.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_config(&nested), Some(config_path));
    }

    #[test]
    fn test_partial_sections_keep_defaults() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join(CONFIG_FILE_NAME);
        std::fs::write(
            &config_path,
            "[engine]\ntimeout_secs = 30\ninstall_dir = \"tools\"\n\n[discovery]\ncall_path = \"suite.it\"\n",
        )
        .unwrap();

        let config = load_config(&config_path).unwrap();
        assert_eq!(config.engine.timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.engine.install_dir(), temp.path().join("tools"));
        assert_eq!(config.discovery.call_path, "suite.it");
        assert_eq!(config.protocol, ProtocolConfig::default());
        assert_eq!(config.staging_root(), temp.path().join("tools").join("tmp"));
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join(CONFIG_FILE_NAME);
        std::fs::write(&config_path, "[engine]\nbinray = \"x\"\n").unwrap();

        assert!(matches!(load_config(&config_path), Err(ConfigError::Toml { .. })));
    }

    #[test]
    fn test_invalid_call_path_is_rejected() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join(CONFIG_FILE_NAME);
        std::fs::write(&config_path, "[discovery]\ncall_path = \"casper..begin\"\n").unwrap();

        assert!(matches!(load_config(&config_path), Err(ConfigError::Pattern(_))));
    }

    #[test]
    fn test_empty_marker_is_rejected() {
        let mut config = AdapterConfig::default();
        config.protocol.fatal_marker.clear();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("protocol.fatal_marker"));
    }

    #[test]
    fn test_resolve_config_falls_back_to_defaults() {
        let temp = TempDir::new().unwrap();
        let (config, path) = resolve_config(None, temp.path()).unwrap();
        assert!(path.is_none());
        assert_eq!(config, AdapterConfig::default());
    }
}
