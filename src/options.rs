//! # Sink Configuration
//!
//! A sink is configured with a destination folder and a set of options:
//!
//! - **`Destination`**: where descriptors are written. Either a literal path
//!   or a function computing the path from each descriptor.
//! - **`SinkOptions`**: the caller-facing builder (`cwd`, `mode`, `dir_mode`,
//!   `overwrite`, `base`, `concurrency`).
//! - **`SinkConfig`**: the validated, immutable settings a running sink reads.
//!   Built once by `Sink::new`; captures the process umask and working
//!   directory at that moment.
//!
//! Options can also be loaded from a YAML document:
//!
//! ```yaml
//! destination: dist
//! cwd: /srv/site
//! mode: "0644"
//! dir_mode: "0755"
//! overwrite: false
//! concurrency: 4
//! ```

use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;

use crate::descriptor::FileDescriptor;
use crate::error::{Error, Result};
use crate::mode;
use crate::path;

type PathFn = Arc<dyn Fn(&FileDescriptor) -> PathBuf + Send + Sync>;

/// A path given either literally or computed per descriptor
#[derive(Clone)]
pub enum PathSpec {
    Literal(PathBuf),
    Computed(PathFn),
}

impl PathSpec {
    /// Evaluate for a descriptor.
    pub fn evaluate(&self, file: &FileDescriptor) -> PathBuf {
        match self {
            Self::Literal(path) => path.clone(),
            Self::Computed(f) => f(file),
        }
    }

    /// Create a path computed from each descriptor.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&FileDescriptor) -> PathBuf + Send + Sync + 'static,
    {
        Self::Computed(Arc::new(f))
    }

    fn is_empty_literal(&self) -> bool {
        matches!(self, Self::Literal(path) if path.as_os_str().is_empty())
    }
}

impl fmt::Debug for PathSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(path) => f.debug_tuple("Literal").field(path).finish(),
            Self::Computed(_) => f.write_str("Computed(<fn>)"),
        }
    }
}

impl From<&str> for PathSpec {
    fn from(path: &str) -> Self {
        Self::Literal(PathBuf::from(path))
    }
}

impl From<String> for PathSpec {
    fn from(path: String) -> Self {
        Self::Literal(PathBuf::from(path))
    }
}

impl From<PathBuf> for PathSpec {
    fn from(path: PathBuf) -> Self {
        Self::Literal(path)
    }
}

impl From<&Path> for PathSpec {
    fn from(path: &Path) -> Self {
        Self::Literal(path.to_path_buf())
    }
}

/// The destination folder of a sink.
pub type Destination = PathSpec;

/// A replacement for the destination as the emitted descriptors' base.
pub type BaseOverride = PathSpec;

/// Caller-facing sink options
#[derive(Debug, Clone)]
pub struct SinkOptions {
    /// Working directory; defaults to the process working directory.
    pub cwd: Option<PathBuf>,
    /// Permission bits for written files.
    pub mode: Option<u32>,
    /// Permission bits for created directories.
    pub dir_mode: Option<u32>,
    /// Replace existing destinations (default `true`).
    pub overwrite: bool,
    /// Base for emitted descriptors; defaults to the destination folder.
    pub base: Option<BaseOverride>,
    /// Number of descriptors processed at once by `Sink::pipe` (default 1).
    pub concurrency: usize,
}

impl Default for SinkOptions {
    fn default() -> Self {
        Self {
            cwd: None,
            mode: None,
            dir_mode: None,
            overwrite: true,
            base: None,
            concurrency: 1,
        }
    }
}

impl SinkOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn mode(mut self, mode: u32) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn dir_mode(mut self, mode: u32) -> Self {
        self.dir_mode = Some(mode);
        self
    }

    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn base(mut self, base: impl Into<BaseOverride>) -> Self {
        self.base = Some(base.into());
        self
    }

    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }
}

/// Validated, immutable sink settings
#[derive(Debug, Clone)]
pub struct SinkConfig {
    pub destination: Destination,
    pub base: Option<BaseOverride>,
    /// Absolute working directory.
    pub cwd: PathBuf,
    pub mode: Option<u32>,
    pub dir_mode: Option<u32>,
    pub overwrite: bool,
    pub concurrency: usize,
    /// Process umask captured at construction.
    pub umask: u32,
}

impl SinkConfig {
    /// Validate options against a destination.
    ///
    /// Fails with [`Error::Configuration`] when a literal destination is empty,
    /// a mode exceeds `0o7777`, or the working directory cannot be determined.
    pub fn new(destination: Destination, options: SinkOptions) -> Result<Self> {
        if destination.is_empty_literal() {
            return Err(Error::configuration("destination folder is empty"));
        }
        if options.base.as_ref().is_some_and(PathSpec::is_empty_literal) {
            return Err(Error::configuration("base override is empty"));
        }
        for (name, value) in [("mode", options.mode), ("dir_mode", options.dir_mode)] {
            if let Some(value) = value {
                if value > mode::MODE_MASK {
                    return Err(Error::configuration(format!(
                        "{} {:o} has bits outside 7777",
                        name, value
                    )));
                }
            }
        }

        let process_cwd = env::current_dir().map_err(|e| {
            Error::configuration(format!("cannot determine working directory: {}", e))
        })?;
        let cwd = match options.cwd {
            Some(cwd) => path::resolve(&process_cwd, &cwd),
            None => path::normalize(&process_cwd),
        };

        Ok(Self {
            destination,
            base: options.base,
            cwd,
            mode: options.mode,
            dir_mode: options.dir_mode,
            overwrite: options.overwrite,
            concurrency: options.concurrency.max(1),
            umask: mode::current_umask(),
        })
    }
}

/// A permission value in a config file: octal text or a plain number.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ModeValue {
    Number(u32),
    Text(String),
}

impl ModeValue {
    pub fn to_mode(&self) -> Result<u32> {
        match self {
            Self::Number(n) => Ok(*n),
            Self::Text(text) => parse_mode(text),
        }
    }
}

/// Parse octal permission text such as `0644`, `644` or `0o644`.
pub fn parse_mode(text: &str) -> Result<u32> {
    let trimmed = text.trim();
    let digits = trimmed
        .strip_prefix("0o")
        .or_else(|| trimmed.strip_prefix("0O"))
        .unwrap_or(trimmed);
    let value = u32::from_str_radix(digits, 8)
        .map_err(|_| Error::configuration(format!("invalid octal mode '{}'", text)))?;
    if value > mode::MODE_MASK {
        return Err(Error::configuration(format!(
            "mode '{}' has bits outside 7777",
            text
        )));
    }
    Ok(value)
}

/// Sink settings as written in a YAML config file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SinkFile {
    pub destination: Option<PathBuf>,
    pub cwd: Option<PathBuf>,
    pub mode: Option<ModeValue>,
    pub dir_mode: Option<ModeValue>,
    pub overwrite: Option<bool>,
    pub base: Option<PathBuf>,
    pub concurrency: Option<usize>,
}

impl SinkFile {
    /// Convert into options, leaving the destination aside.
    pub fn options(&self) -> Result<SinkOptions> {
        let mut options = SinkOptions::new();
        options.cwd = self.cwd.clone();
        options.mode = self.mode.as_ref().map(ModeValue::to_mode).transpose()?;
        options.dir_mode = self.dir_mode.as_ref().map(ModeValue::to_mode).transpose()?;
        if let Some(overwrite) = self.overwrite {
            options.overwrite = overwrite;
        }
        options.base = self.base.clone().map(BaseOverride::from);
        if let Some(concurrency) = self.concurrency {
            options.concurrency = concurrency;
        }
        Ok(options)
    }

    /// Split into a destination and options.
    ///
    /// A missing or empty destination is a configuration error.
    pub fn into_parts(self) -> Result<(Destination, SinkOptions)> {
        let options = self.options()?;
        match self.destination {
            Some(destination) if !destination.as_os_str().is_empty() => {
                Ok((Destination::from(destination), options))
            }
            _ => Err(Error::configuration("destination folder is missing")),
        }
    }
}

/// Parse sink settings from a YAML string.
pub fn parse(yaml: &str) -> Result<SinkFile> {
    Ok(serde_yaml::from_str(yaml)?)
}

/// Load sink settings from a YAML file.
pub fn from_file(path: &Path) -> Result<SinkFile> {
    let content = fs::read_to_string(path)?;
    parse(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_empty_literal_destination_is_rejected() {
        let err = SinkConfig::new(Destination::from(""), SinkOptions::new()).unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn test_function_destination_is_accepted() {
        let destination = Destination::from_fn(|_| PathBuf::from("out"));
        assert!(SinkConfig::new(destination, SinkOptions::new()).is_ok());
    }

    #[test]
    fn test_out_of_range_mode_is_rejected() {
        let err = SinkConfig::new(Destination::from("out"), SinkOptions::new().mode(0o17777))
            .unwrap_err();
        assert!(err.to_string().contains("mode"));
    }

    #[test]
    #[serial]
    fn test_defaults() {
        let config = SinkConfig::new(Destination::from("out"), SinkOptions::new()).unwrap();
        assert!(config.overwrite);
        assert_eq!(config.concurrency, 1);
        assert!(config.cwd.is_absolute());
        assert!(config.mode.is_none());
        assert!(config.dir_mode.is_none());
    }

    #[test]
    #[serial]
    fn test_relative_cwd_is_resolved() {
        let config =
            SinkConfig::new(Destination::from("out"), SinkOptions::new().cwd("nested/dir"))
                .unwrap();
        assert!(config.cwd.is_absolute());
        assert!(config.cwd.ends_with("nested/dir"));
    }

    #[test]
    #[serial]
    fn test_cwd_is_captured_at_construction() {
        let temp = tempfile::TempDir::new().unwrap();
        let original = env::current_dir().unwrap();
        env::set_current_dir(temp.path()).unwrap();
        let config = SinkConfig::new(Destination::from("out"), SinkOptions::new().cwd("sub"));
        env::set_current_dir(&original).unwrap();

        let expected = temp.path().canonicalize().unwrap().join("sub");
        assert_eq!(config.unwrap().cwd, expected);
    }

    #[test]
    fn test_zero_concurrency_becomes_one() {
        let config =
            SinkConfig::new(Destination::from("out"), SinkOptions::new().concurrency(0)).unwrap();
        assert_eq!(config.concurrency, 1);
    }

    #[test]
    fn test_parse_mode_forms() {
        assert_eq!(parse_mode("0644").unwrap(), 0o644);
        assert_eq!(parse_mode("755").unwrap(), 0o755);
        assert_eq!(parse_mode("0o711").unwrap(), 0o711);
        assert!(parse_mode("9").is_err());
        assert!(parse_mode("77777").is_err());
    }

    #[test]
    fn test_parse_yaml() {
        let file = parse(
            r#"
destination: dist
cwd: /srv/site
mode: "0644"
dir_mode: 493
overwrite: false
concurrency: 4
"#,
        )
        .unwrap();
        let (destination, options) = file.into_parts().unwrap();
        assert!(matches!(destination, Destination::Literal(ref p) if p == Path::new("dist")));
        assert_eq!(options.mode, Some(0o644));
        assert_eq!(options.dir_mode, Some(0o755));
        assert!(!options.overwrite);
        assert_eq!(options.concurrency, 4);
        assert_eq!(options.cwd, Some(PathBuf::from("/srv/site")));
    }

    #[test]
    fn test_parse_yaml_missing_destination() {
        let file = parse("overwrite: true").unwrap();
        let err = file.into_parts().unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_parse_yaml_unknown_key() {
        assert!(matches!(parse("destnation: x"), Err(Error::Yaml(_))));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("filedest.yaml");
        fs::write(&path, "destination: out\nmode: '600'\n").unwrap();
        let file = from_file(&path).unwrap();
        assert_eq!(file.options().unwrap().mode, Some(0o600));
    }
}
