//! Mapping of the host OS/architecture onto evaluator binary names.

use std::fmt;

use crate::error::EvaluationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Os {
    Linux,
    Darwin,
    Windows,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    Amd64,
    Arm64,
}

/// A platform the evaluator is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Platform {
    pub os: Os,
    pub arch: Arch,
}

impl Platform {
    /// Platform of the running process.
    pub fn current() -> Result<Self, EvaluationError> {
        Self::detect(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Resolve Rust's `std::env::consts` names.
    pub fn detect(os: &str, arch: &str) -> Result<Self, EvaluationError> {
        let unsupported = || EvaluationError::UnsupportedPlatform {
            os: os.to_string(),
            arch: arch.to_string(),
        };
        let os_kind = match os {
            "linux" => Os::Linux,
            "macos" => Os::Darwin,
            "windows" => Os::Windows,
            _ => return Err(unsupported()),
        };
        let arch_kind = match arch {
            "x86_64" => Arch::Amd64,
            "aarch64" => Arch::Arm64,
            _ => return Err(unsupported()),
        };
        Ok(Self {
            os: os_kind,
            arch: arch_kind,
        })
    }

    /// File name of the evaluator binary for this platform, e.g.
    /// `helm-iac-evaluator-linux-amd64` or `helm-iac-evaluator-windows-arm64.exe`.
    pub fn executable_name(&self, base: &str) -> String {
        let suffix = if self.os == Os::Windows { ".exe" } else { "" };
        format!("{base}-{self}{suffix}")
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let os = match self.os {
            Os::Linux => "linux",
            Os::Darwin => "darwin",
            Os::Windows => "windows",
        };
        let arch = match self.arch {
            Arch::Amd64 => "amd64",
            Arch::Arm64 => "arm64",
        };
        write!(f, "{os}-{arch}")
    }
}
