//! Host platform detection and the per-platform constant table

use std::fmt;
use std::path::PathBuf;

use once_cell::sync::OnceCell;

use crate::error::{MeowError, Result};

/// Name of the subdirectory of the OS temp dir that holds downloaded artifacts
pub const ARTIFACT_DIR: &str = "meow-cli";

pub const DOCKER_DESKTOP_INSTALLER_URL: &str = "docker_desktop_installer_url";
pub const DOCKER_DESKTOP_INSTALLER_PATH: &str = "docker_desktop_installer_path";
pub const DOCKER_INSTALL_SHELL: &str = "docker_install_shell";

/// (operating system, architecture) pair, spelled like `std::env::consts`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Platform {
    pub os: &'static str,
    pub arch: &'static str,
}

/// How the container runtime gets onto a given operating system
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostFamily {
    /// Docker Engine through the distribution's package manager
    NativePackage,
    /// Docker Desktop through a downloaded GUI installer
    DesktopInstaller,
    /// No install path exists yet
    Unimplemented,
}

/// Global cache for platform detection
static PLATFORM_CACHE: OnceCell<Platform> = OnceCell::new();

impl Platform {
    pub const fn new(os: &'static str, arch: &'static str) -> Self {
        Self { os, arch }
    }

    /// Detect the current host (cached after first call)
    pub fn detect() -> Self {
        *PLATFORM_CACHE.get_or_init(|| Self::new(std::env::consts::OS, std::env::consts::ARCH))
    }

    pub fn family(&self) -> HostFamily {
        match self.os {
            "linux" => HostFamily::NativePackage,
            "windows" => HostFamily::DesktopInstaller,
            _ => HostFamily::Unimplemented,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)
    }
}

/// A table value; paths are resolved against the OS temp dir at lookup time
#[derive(Debug, Clone, Copy)]
enum Constant {
    Literal(&'static str),
    TempFile(&'static str),
}

impl Constant {
    fn resolve(self) -> String {
        match self {
            Constant::Literal(value) => value.to_string(),
            Constant::TempFile(file_name) => artifact_dir().join(file_name).display().to_string(),
        }
    }
}

type Entries = &'static [(&'static str, Constant)];

const WINDOWS_X86_64: Entries = &[
    (
        DOCKER_DESKTOP_INSTALLER_URL,
        Constant::Literal(
            "https://desktop.docker.com/win/main/amd64/Docker%20Desktop%20Installer.exe",
        ),
    ),
    (
        DOCKER_DESKTOP_INSTALLER_PATH,
        Constant::TempFile("docker-desktop-installer.exe"),
    ),
];

const LINUX: Entries = &[(DOCKER_INSTALL_SHELL, Constant::Literal("bash"))];

const MACOS_X86_64: Entries = &[
    (
        DOCKER_DESKTOP_INSTALLER_URL,
        Constant::Literal("https://desktop.docker.com/mac/main/amd64/Docker.dmg"),
    ),
    (
        DOCKER_DESKTOP_INSTALLER_PATH,
        Constant::TempFile("docker-desktop-installer"),
    ),
];

const MACOS_AARCH64: Entries = &[
    (
        DOCKER_DESKTOP_INSTALLER_URL,
        Constant::Literal("https://desktop.docker.com/mac/main/arm64/Docker.dmg"),
    ),
    (
        DOCKER_DESKTOP_INSTALLER_PATH,
        Constant::TempFile("docker-desktop-installer"),
    ),
];

const TABLE: &[(Platform, Entries)] = &[
    (Platform::new("windows", "x86_64"), WINDOWS_X86_64),
    (Platform::new("linux", "x86_64"), LINUX),
    (Platform::new("linux", "aarch64"), LINUX),
    (Platform::new("macos", "x86_64"), MACOS_X86_64),
    (Platform::new("macos", "aarch64"), MACOS_AARCH64),
];

/// Directory under the OS temp dir where installer artifacts are placed
pub fn artifact_dir() -> PathBuf {
    std::env::temp_dir().join(ARTIFACT_DIR)
}

/// Look up a constant for the current host
pub fn lookup(name: &str) -> Result<String> {
    lookup_for(Platform::detect(), name)
}

/// Look up a constant for an explicit platform
pub fn lookup_for(platform: Platform, name: &str) -> Result<String> {
    let entries = TABLE
        .iter()
        .find(|(candidate, _)| *candidate == platform)
        .map(|(_, entries)| *entries)
        .ok_or_else(|| MeowError::UnsupportedPlatform {
            os: platform.os.to_string(),
            arch: platform.arch.to_string(),
        })?;

    entries
        .iter()
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.resolve())
        .ok_or_else(|| MeowError::ConstantNotFound {
            name: name.to_string(),
        })
}
