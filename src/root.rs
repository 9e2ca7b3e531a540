//! The five predefined root keys.

use crate::error::{RegistryError, Result};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Root {
    ClassesRoot,
    CurrentUser,
    LocalMachine,
    Users,
    CurrentConfig,
}

impl Root {
    pub const ALL: [Self; 5] = [
        Self::ClassesRoot,
        Self::CurrentUser,
        Self::LocalMachine,
        Self::Users,
        Self::CurrentConfig,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ClassesRoot => "HKEY_CLASSES_ROOT",
            Self::CurrentUser => "HKEY_CURRENT_USER",
            Self::LocalMachine => "HKEY_LOCAL_MACHINE",
            Self::Users => "HKEY_USERS",
            Self::CurrentConfig => "HKEY_CURRENT_CONFIG",
        }
    }

    #[must_use]
    pub const fn short_name(self) -> &'static str {
        match self {
            Self::ClassesRoot => "HKCR",
            Self::CurrentUser => "HKCU",
            Self::LocalMachine => "HKLM",
            Self::Users => "HKU",
            Self::CurrentConfig => "HKCC",
        }
    }

    /// The process-wide key for this root.
    #[cfg(windows)]
    #[must_use]
    pub fn key(self) -> &'static crate::key::RegistryKey {
        match self {
            Self::ClassesRoot => &CLASSES_ROOT,
            Self::CurrentUser => &CURRENT_USER,
            Self::LocalMachine => &LOCAL_MACHINE,
            Self::Users => &USERS,
            Self::CurrentConfig => &CURRENT_CONFIG,
        }
    }

    #[cfg(windows)]
    pub(crate) const fn hkey(self) -> windows::Win32::System::Registry::HKEY {
        use windows::Win32::System::Registry::{
            HKEY_CLASSES_ROOT, HKEY_CURRENT_CONFIG, HKEY_CURRENT_USER, HKEY_LOCAL_MACHINE,
            HKEY_USERS,
        };

        match self {
            Self::ClassesRoot => HKEY_CLASSES_ROOT,
            Self::CurrentUser => HKEY_CURRENT_USER,
            Self::LocalMachine => HKEY_LOCAL_MACHINE,
            Self::Users => HKEY_USERS,
            Self::CurrentConfig => HKEY_CURRENT_CONFIG,
        }
    }
}

impl fmt::Display for Root {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Root {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|root| {
                s.eq_ignore_ascii_case(root.name()) || s.eq_ignore_ascii_case(root.short_name())
            })
            .ok_or_else(|| RegistryError::invalid_argument(format!("unknown registry root: {s}")))
    }
}

#[cfg(windows)]
pub static CLASSES_ROOT: crate::key::RegistryKey =
    crate::key::RegistryKey::predefined(Root::ClassesRoot);
#[cfg(windows)]
pub static CURRENT_USER: crate::key::RegistryKey =
    crate::key::RegistryKey::predefined(Root::CurrentUser);
#[cfg(windows)]
pub static LOCAL_MACHINE: crate::key::RegistryKey =
    crate::key::RegistryKey::predefined(Root::LocalMachine);
#[cfg(windows)]
pub static USERS: crate::key::RegistryKey = crate::key::RegistryKey::predefined(Root::Users);
#[cfg(windows)]
pub static CURRENT_CONFIG: crate::key::RegistryKey =
    crate::key::RegistryKey::predefined(Root::CurrentConfig);
