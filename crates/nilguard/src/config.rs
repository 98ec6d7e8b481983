//! YAML configuration and exclusion matching.
//!
//! Exclusion precedence is file, then package, then function-within-package;
//! a match at an earlier level never consults the later ones. String fields
//! containing `*` switch from exact comparison to a suffix-wildcard regex of
//! the form `.S$` (with the `*` expanded), which matches at the end of any
//! string rather than at a path boundary and requires at least one leading
//! character — `*tgo` matches `a/b.tgo` and `pkg.tgo` but not `tgo`.

use std::path::Path;

use regex::Regex;
use serde::Deserialize;

/// Chain-depth cap applied when `maxpath` is zero or absent.
pub const DEFAULT_MAX_PATH: usize = 30;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid wildcard pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Raw YAML shape, before wildcard compilation.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    files: Vec<String>,
    pkgs: Vec<String>,
    funcs: Vec<RawFuncExcludes>,
    log: bool,
    callgraph: bool,
    maxpath: usize,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawFuncExcludes {
    pkg: String,
    funcs: Vec<String>,
}

/// One exclusion pattern: exact string equality, or a compiled suffix
/// wildcard when the source string contained `*`.
#[derive(Debug)]
pub struct Pattern {
    raw: String,
    regex: Option<Regex>,
}

impl Pattern {
    fn compile(raw: &str) -> Result<Self, ConfigError> {
        let regex = if raw.contains('*') {
            let expanded = format!(".{}$", raw.replace('*', ".*"));
            Some(Regex::new(&expanded).map_err(|source| ConfigError::Pattern {
                pattern: raw.to_owned(),
                source,
            })?)
        } else {
            None
        };
        Ok(Self {
            raw: raw.to_owned(),
            regex,
        })
    }

    #[must_use]
    pub fn matches(&self, target: &str) -> bool {
        match &self.regex {
            Some(regex) => regex.is_match(target),
            None => self.raw == target,
        }
    }
}

#[derive(Debug)]
pub struct FuncExcludes {
    pub pkg: Pattern,
    pub funcs: Vec<String>,
}

/// Compiled analyzer configuration.
#[derive(Debug, Default)]
pub struct Config {
    pub files: Vec<Pattern>,
    pub pkgs: Vec<Pattern>,
    pub funcs: Vec<FuncExcludes>,
    pub log: bool,
    pub callgraph: bool,
    maxpath: usize,
}

impl Config {
    /// Loads and compiles the YAML configuration. Any failure here is fatal
    /// to the process.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: display.clone(),
            source,
        })?;
        let raw: RawConfig = serde_yaml::from_str(&data).map_err(|source| ConfigError::Yaml {
            path: display,
            source,
        })?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> Result<Self, ConfigError> {
        let files = raw
            .files
            .iter()
            .map(|s| Pattern::compile(s))
            .collect::<Result<Vec<_>, _>>()?;
        let pkgs = raw
            .pkgs
            .iter()
            .map(|s| Pattern::compile(s))
            .collect::<Result<Vec<_>, _>>()?;
        let funcs = raw
            .funcs
            .into_iter()
            .map(|f| {
                Ok(FuncExcludes {
                    pkg: Pattern::compile(&f.pkg)?,
                    funcs: f.funcs,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;
        Ok(Self {
            files,
            pkgs,
            funcs,
            log: raw.log,
            callgraph: raw.callgraph,
            maxpath: raw.maxpath,
        })
    }

    #[must_use]
    pub fn max_path(&self) -> usize {
        if self.maxpath == 0 {
            DEFAULT_MAX_PATH
        } else {
            self.maxpath
        }
    }

    /// Whether a function should be skipped, honoring file ⇒ package ⇒
    /// function precedence. Skip decisions are logged when `log` is set.
    #[must_use]
    pub fn is_excluded(&self, file_name: &str, pkg_name: &str, func_name: &str) -> bool {
        let base_name = Path::new(file_name)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(file_name);
        for file in &self.files {
            if file.matches(file_name) || file.matches(base_name) {
                self.skip_log(&format!("{file_name} file skipped"));
                return true;
            }
        }

        for pkg in &self.pkgs {
            if pkg.matches(pkg_name) {
                self.skip_log(&format!("{pkg_name} package skipped"));
                return true;
            }
        }

        for excludes in &self.funcs {
            if excludes.pkg.matches(pkg_name) && excludes.funcs.iter().any(|f| f == func_name) {
                self.skip_log(&format!("{pkg_name}/{func_name} function skipped"));
                return true;
            }
        }
        false
    }

    fn skip_log(&self, message: &str) {
        if self.log {
            tracing::info!("{message}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_from(yaml: &str) -> Config {
        let raw: RawConfig = serde_yaml::from_str(yaml).expect("valid yaml");
        Config::from_raw(raw).expect("valid patterns")
    }

    #[test]
    fn wildcard_suffix_semantics() {
        let pattern = Pattern::compile("*tgo").expect("compiles");
        assert!(pattern.matches("a/b.tgo"));
        assert!(pattern.matches("pkg.tgo"));
        assert!(!pattern.matches("tgo"));
    }

    #[test]
    fn exact_match_without_wildcard() {
        let pattern = Pattern::compile("util.go").expect("compiles");
        assert!(pattern.matches("util.go"));
        assert!(!pattern.matches("a/util.go"));
    }

    #[test]
    fn file_exclusion_checks_basename_too() {
        let config = config_from("files: [util.go]\n");
        assert!(config.is_excluded("pkg/util.go", "pkg", "F"));
        assert!(!config.is_excluded("pkg/other.go", "pkg", "F"));
    }

    #[test]
    fn function_excludes_are_scoped_to_package() {
        let config = config_from("funcs:\n  - pkg: store\n    funcs: [Open, Close]\n");
        assert!(config.is_excluded("a.go", "store", "Open"));
        assert!(!config.is_excluded("a.go", "other", "Open"));
        assert!(!config.is_excluded("a.go", "store", "Get"));
    }

    #[test]
    fn maxpath_defaults_when_zero() {
        let config = config_from("maxpath: 0\n");
        assert_eq!(config.max_path(), DEFAULT_MAX_PATH);
        let config = config_from("maxpath: 7\n");
        assert_eq!(config.max_path(), 7);
    }

    #[test]
    fn invalid_wildcard_regex_is_fatal() {
        let raw: RawConfig = serde_yaml::from_str("files: ['*[']\n").expect("valid yaml");
        assert!(Config::from_raw(raw).is_err());
    }

    #[test]
    fn full_config_deserializes() {
        let config = config_from(
            "files: [gen_*.go]\npkgs: [vendor]\nfuncs:\n  - pkg: api\n    funcs: [Handle]\nlog: true\ncallgraph: true\nmaxpath: 12\n",
        );
        assert!(config.log);
        assert!(config.callgraph);
        assert_eq!(config.max_path(), 12);
        assert_eq!(config.files.len(), 1);
        assert_eq!(config.pkgs.len(), 1);
    }
}
