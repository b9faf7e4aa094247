//! Target architectures and Apple platform identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A CPU architecture the external compiler can target with `-arch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    Arm64,
    Armv7,
    X86_64,
    I386,
}

impl Arch {
    /// The name passed to `-arch` and used in directory names.
    pub fn as_str(&self) -> &'static str {
        match self {
            Arch::Arm64 => "arm64",
            Arch::Armv7 => "armv7",
            Arch::X86_64 => "x86_64",
            Arch::I386 => "i386",
        }
    }

    /// The autotools `--host` triple for this architecture.
    ///
    /// Both ARM variants use `arm-apple-darwin`; autotools only needs to know
    /// that it is cross-compiling, the real target comes from `-arch`.
    pub fn host_triple(&self) -> &'static str {
        match self {
            Arch::Arm64 | Arch::Armv7 => "arm-apple-darwin",
            Arch::X86_64 => "x86_64-apple-darwin",
            Arch::I386 => "i386-apple-darwin",
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Arch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "arm64" | "aarch64" => Ok(Arch::Arm64),
            "armv7" => Ok(Arch::Armv7),
            "x86_64" | "x86-64" => Ok(Arch::X86_64),
            "i386" => Ok(Arch::I386),
            _ => Err(format!(
                "unknown architecture '{}'; expected 'arm64', 'armv7', 'x86_64', or 'i386'",
                s
            )),
        }
    }
}

/// Compiler flag that pins the minimum OS version for an SDK platform.
///
/// Returns `None` for platforms the compiler has no dedicated flag for.
pub fn min_version_flag(platform: &str, version: &str) -> Option<String> {
    let flag = match platform.to_lowercase().as_str() {
        "iphoneos" => "-miphoneos-version-min",
        "iphonesimulator" => "-mios-simulator-version-min",
        "macosx" => "-mmacosx-version-min",
        "appletvos" => "-mtvos-version-min",
        "appletvsimulator" => "-mtvos-simulator-version-min",
        "watchos" => "-mwatchos-version-min",
        "watchsimulator" => "-mwatchos-simulator-version-min",
        _ => return None,
    };
    Some(format!("{}={}", flag, version))
}
