//! Build configuration.
//!
//! Everything the orchestrator needs to know about *what* to build lives in
//! [`BuildConfig`]: the source archive, the platform/architecture matrix, the
//! static libraries expected from every build, and the configure flags. The
//! default value reproduces the libevent matrix for iOS, the iOS simulator and
//! macOS; a TOML file with the same shape can replace it.
//!
//! ```toml
//! libraries = ["libevent.a", "libevent_core.a"]
//! jobs = 8
//!
//! [source]
//! name = "libevent"
//! version = "2.1.12-stable"
//! url = "https://github.com/libevent/libevent/releases/download/release-{version}/{name}-{version}.tar.gz"
//!
//! [[platforms]]
//! name = "iphoneos"
//! archs = ["arm64"]
//! min_version = "12.0"
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::core::platform::Arch;

/// Full description of one orchestration run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Upstream source archive
    pub source: SourceSpec,

    /// Platform matrix, built and merged in this order
    pub platforms: Vec<PlatformSpec>,

    /// Static libraries every (platform, arch) build must install
    pub libraries: Vec<String>,

    /// Feature flags passed verbatim to `./configure`
    pub configure_flags: Vec<String>,

    /// Optimisation flag prepended to CFLAGS
    pub opt_level: String,

    /// Parallelism for `make -j`
    pub jobs: u32,

    /// Directory layout, relative to the run root
    pub paths: PathsConfig,

    /// Toolchain overrides
    pub toolchain: ToolchainSettings,
}

/// Where to fetch the library source from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSpec {
    /// Library name; also the archive and extracted directory prefix
    pub name: String,

    /// Upstream version string
    pub version: String,

    /// Download URL template; `{name}` and `{version}` are substituted
    pub url: String,

    /// Expected SHA-256 of the archive, if it should be verified
    #[serde(default)]
    pub sha256: Option<String>,
}

/// One SDK platform and the architectures built for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformSpec {
    /// Platform identifier as reported by `xcodebuild -showsdks`
    pub name: String,

    /// Architectures, merged in this order
    pub archs: Vec<Arch>,

    /// Minimum deployment target passed to the compiler
    #[serde(default)]
    pub min_version: Option<String>,
}

/// Output and scratch directories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Final merged artifacts
    pub output: PathBuf,

    /// Scratch space: downloaded sources and per-pair installs
    pub build: PathBuf,
}

/// Toolchain overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainSettings {
    /// Path to the C compiler; located on PATH when unset
    pub cc: Option<PathBuf>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        BuildConfig {
            source: SourceSpec::default(),
            platforms: vec![
                PlatformSpec::new("iphonesimulator", [Arch::Arm64]),
                PlatformSpec::new("iphoneos", [Arch::Arm64]),
                PlatformSpec::new("macosx", [Arch::X86_64, Arch::Arm64]),
            ],
            libraries: [
                "libevent.a",
                "libevent_core.a",
                "libevent_extra.a",
                "libevent_pthreads.a",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            configure_flags: [
                "--disable-shared",
                "--enable-static",
                "--disable-debug-mode",
                "--disable-openssl",
                "--disable-libevent-regress",
                "--disable-samples",
                "--disable-clock-gettime",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            opt_level: "-Os".to_string(),
            jobs: 8,
            paths: PathsConfig::default(),
            toolchain: ToolchainSettings::default(),
        }
    }
}

impl Default for SourceSpec {
    fn default() -> Self {
        SourceSpec {
            name: "libevent".to_string(),
            version: "2.1.12-stable".to_string(),
            url: "https://github.com/libevent/libevent/releases/download/release-{version}/{name}-{version}.tar.gz"
                .to_string(),
            sha256: None,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        PathsConfig {
            output: PathBuf::from("dependencies"),
            build: PathBuf::from("build"),
        }
    }
}

impl SourceSpec {
    /// `<name>-<version>`, the directory the archive unpacks to.
    pub fn dir_name(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }

    /// `<name>-<version>.tar.gz`, the cache key for the download.
    pub fn archive_name(&self) -> String {
        format!("{}.tar.gz", self.dir_name())
    }

    /// The URL template with `{name}` and `{version}` substituted.
    pub fn resolved_url(&self) -> String {
        self.url
            .replace("{name}", &self.name)
            .replace("{version}", &self.version)
    }

    /// The download URL, parsed.
    pub fn download_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&self.resolved_url())
    }
}

impl PlatformSpec {
    /// Create a platform entry without a minimum OS version.
    pub fn new(name: impl Into<String>, archs: impl IntoIterator<Item = Arch>) -> Self {
        PlatformSpec {
            name: name.into(),
            archs: archs.into_iter().collect(),
            min_version: None,
        }
    }

    /// Set the minimum deployment target.
    pub fn with_min_version(mut self, version: impl Into<String>) -> Self {
        self.min_version = Some(version.into());
        self
    }
}

impl BuildConfig {
    /// Load a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;

        let config: BuildConfig = toml::from_str(&contents)
            .with_context(|| format!("failed to parse config: {}", path.display()))?;

        config
            .validate()
            .with_context(|| format!("invalid config: {}", path.display()))?;

        Ok(config)
    }

    /// Load a configuration file, or use the built-in matrix when `path` is `None`.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Check the configuration for mistakes that would only surface mid-build.
    pub fn validate(&self) -> Result<()> {
        if self.source.name.is_empty() || self.source.version.is_empty() {
            bail!("source name and version must not be empty");
        }
        self.source
            .download_url()
            .with_context(|| format!("invalid source url: {}", self.source.resolved_url()))?;

        if self.platforms.is_empty() {
            bail!("no platforms configured");
        }

        let mut seen = HashSet::new();
        for platform in &self.platforms {
            let name = platform.name.as_str();
            if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
                bail!("platform `{}` must be a plain platform identifier", name);
            }
            if !seen.insert(platform.name.to_lowercase()) {
                bail!("platform `{}` is listed more than once", platform.name);
            }
            if platform.archs.is_empty() {
                bail!("platform `{}` has no architectures", platform.name);
            }
            let unique: HashSet<_> = platform.archs.iter().collect();
            if unique.len() != platform.archs.len() {
                bail!("platform `{}` lists an architecture twice", platform.name);
            }
        }

        if self.libraries.is_empty() {
            bail!("no libraries configured");
        }
        for lib in &self.libraries {
            if !lib.ends_with(".a") || lib.contains('/') {
                bail!("library `{}` must be a static archive file name", lib);
            }
        }

        if self.jobs == 0 {
            bail!("jobs must be at least 1");
        }

        Ok(())
    }

    /// Iterate over every (platform, arch) pair in build order.
    pub fn pairs(&self) -> impl Iterator<Item = (&PlatformSpec, Arch)> {
        self.platforms
            .iter()
            .flat_map(|p| p.archs.iter().map(move |&arch| (p, arch)))
    }

    /// Platform identifiers in matrix order.
    pub fn platform_names(&self) -> Vec<&str> {
        self.platforms.iter().map(|p| p.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_matrix() {
        let config = BuildConfig::default();
        config.validate().unwrap();

        assert_eq!(
            config.platform_names(),
            vec!["iphonesimulator", "iphoneos", "macosx"]
        );
        let pairs: Vec<_> = config
            .pairs()
            .map(|(p, a)| format!("{}-{}", p.name, a))
            .collect();
        assert_eq!(
            pairs,
            vec![
                "iphonesimulator-arm64",
                "iphoneos-arm64",
                "macosx-x86_64",
                "macosx-arm64"
            ]
        );
        assert_eq!(config.libraries.len(), 4);
    }

    #[test]
    fn test_download_url() {
        let source = SourceSpec::default();
        assert_eq!(
            source.download_url().unwrap().as_str(),
            "https://github.com/libevent/libevent/releases/download/release-2.1.12-stable/libevent-2.1.12-stable.tar.gz"
        );
        assert_eq!(source.archive_name(), "libevent-2.1.12-stable.tar.gz");
    }

    #[test]
    fn test_load_partial_config() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("autofat.toml");
        std::fs::write(
            &path,
            r#"
libraries = ["libz.a"]
jobs = 4

[source]
name = "zlib"
version = "1.3.1"
url = "https://example.com/{name}-{version}.tar.gz"

[[platforms]]
name = "iphoneos"
archs = ["arm64"]
min_version = "12.0"
"#,
        )
        .unwrap();

        let config = BuildConfig::load(&path).unwrap();
        assert_eq!(config.source.name, "zlib");
        assert_eq!(config.jobs, 4);
        assert_eq!(config.platforms.len(), 1);
        assert_eq!(config.platforms[0].min_version.as_deref(), Some("12.0"));
        // Unspecified sections keep their defaults
        assert_eq!(config.paths.output, PathBuf::from("dependencies"));
        assert!(config.configure_flags.contains(&"--disable-shared".to_string()));
    }

    #[test]
    fn test_validate_rejects_bad_matrix() {
        let mut config = BuildConfig::default();
        config.platforms[0].archs.clear();
        assert!(config.validate().is_err());

        let mut config = BuildConfig::default();
        config.platforms.push(PlatformSpec::new("MacOSX", [Arch::Arm64]));
        assert!(config.validate().is_err());

        let mut config = BuildConfig::default();
        config.libraries = vec!["libevent.dylib".to_string()];
        assert!(config.validate().is_err());

        let mut config = BuildConfig::default();
        config.jobs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_platform_paths() {
        for name in ["../x", "lib/macosx", "..", "", "a\\b"] {
            let mut config = BuildConfig::default();
            config.platforms[0].name = name.to_string();
            let err = config.validate().unwrap_err();
            assert!(
                err.to_string().contains("plain platform identifier"),
                "{name}: {err}"
            );
        }
    }

    #[test]
    fn test_load_missing_file() {
        let result = BuildConfig::load(Path::new("/nonexistent/autofat.toml"));
        assert!(result.is_err());
    }
}
