// src/version.rs

/// First Windows 11 build number. Everything below is treated as Windows 10.
pub const WINDOWS_11_FIRST_BUILD: u32 = 22000;

/// The running OS version, reduced to the one number the compatibility
/// predicates care about. Constructed from the registry on Windows, injected
/// directly everywhere else (and in tests).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowsVersion {
    pub build: u32,
}

impl WindowsVersion {
    pub const fn new(build: u32) -> Self {
        Self { build }
    }

    pub fn is_windows_11(&self) -> bool {
        self.build >= WINDOWS_11_FIRST_BUILD
    }

    pub fn is_windows_10(&self) -> bool {
        !self.is_windows_11()
    }

    /// Reads the running build number from the registry.
    #[cfg(windows)]
    pub fn current() -> anyhow::Result<Self> {
        use anyhow::Context;
        use winreg::{
            enums::{HKEY_LOCAL_MACHINE, KEY_READ},
            RegKey,
        };

        let hklm = RegKey::predef(HKEY_LOCAL_MACHINE);
        let key = hklm
            .open_subkey_with_flags(
                r"SOFTWARE\Microsoft\Windows NT\CurrentVersion",
                KEY_READ,
            )
            .context("Failed to open CurrentVersion key")?;
        let build: String = key
            .get_value("CurrentBuildNumber")
            .context("Failed to read CurrentBuildNumber")?;
        let build = build
            .parse::<u32>()
            .with_context(|| format!("Unparseable build number '{}'", build))?;

        tracing::debug!("Detected Windows build {}", build);
        Ok(Self { build })
    }
}
