use serde::{Deserialize, Serialize};
use std::fmt;

/// Operating systems the installer knows how to target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsType {
    MacOS,
    Linux,
    Windows,
    Unknown,
}

impl fmt::Display for OsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OsType::MacOS => write!(f, "macOS"),
            OsType::Linux => write!(f, "Linux"),
            OsType::Windows => write!(f, "Windows"),
            OsType::Unknown => write!(f, "Unknown"),
        }
    }
}

/// CPU architecture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Architecture {
    X86_64,
    Aarch64,
    Unknown,
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Architecture::X86_64 => write!(f, "x86_64"),
            Architecture::Aarch64 => write!(f, "aarch64"),
            Architecture::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformInfo {
    pub os_type: OsType,
    pub os_version: String,
    pub arch: Architecture,
}

impl fmt::Display for PlatformInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.os_type, self.os_version, self.arch)
    }
}

/// Platform detection service
pub struct PlatformDetector;

impl PlatformDetector {
    pub fn detect() -> PlatformInfo {
        let info = os_info::get();

        PlatformInfo {
            os_type: Self::detect_os_type(&info),
            os_version: info.version().to_string(),
            arch: Self::detect_architecture(),
        }
    }

    fn detect_os_type(info: &os_info::Info) -> OsType {
        match info.os_type() {
            os_info::Type::Macos => OsType::MacOS,
            os_info::Type::Windows => OsType::Windows,
            os_info::Type::Alpine
            | os_info::Type::Arch
            | os_info::Type::CentOS
            | os_info::Type::Debian
            | os_info::Type::Fedora
            | os_info::Type::Linux
            | os_info::Type::Mint
            | os_info::Type::NixOS
            | os_info::Type::openSUSE
            | os_info::Type::OracleLinux
            | os_info::Type::Pop
            | os_info::Type::Raspbian
            | os_info::Type::Redhat
            | os_info::Type::RedHatEnterprise
            | os_info::Type::Solus
            | os_info::Type::Ubuntu => OsType::Linux,
            _ => Self::fallback_os_type(),
        }
    }

    // os_info reports distributions it has never heard of as Unknown
    fn fallback_os_type() -> OsType {
        match std::env::consts::OS {
            "macos" => OsType::MacOS,
            "linux" => OsType::Linux,
            "windows" => OsType::Windows,
            _ => OsType::Unknown,
        }
    }

    fn detect_architecture() -> Architecture {
        match std::env::consts::ARCH {
            "x86_64" => Architecture::X86_64,
            "aarch64" => Architecture::Aarch64,
            _ => Architecture::Unknown,
        }
    }
}
