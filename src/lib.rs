//! Typed, handle-safe access to the Windows Registry.
//!
//! ```no_run
//! # #[cfg(windows)]
//! # fn main() -> registry_key::Result {
//! use registry_key::prelude::*;
//!
//! let key = CURRENT_USER.create(r"Software\My Company\My Product", Access::ALL_ACCESS)?;
//! key.set_u32("Launches", 1)?;
//! assert_eq!(key.get_u32("Launches")?, 1);
//! key.delete_key()?;
//! # Ok(())
//! # }
//! # #[cfg(not(windows))]
//! # fn main() {}
//! ```
//!
//! The value model, codecs, error taxonomy and access masks build on every
//! platform; the key wrapper and change events exist only on Windows.

pub mod access;
pub mod error;
pub mod info;
#[cfg(windows)]
pub mod key;
#[cfg(windows)]
pub mod notify;
pub mod root;
pub mod value;

// Public, stable-ish API surface for consumers

pub use crate::access::{Access, CreateOptions, Disposition, NotifyFilter};
pub use crate::error::{ErrorKind, RegistryError, Result};
pub use crate::info::KeyInfo;
#[cfg(windows)]
pub use crate::key::RegistryKey;
#[cfg(windows)]
pub use crate::notify::ChangeEvent;
pub use crate::root::Root;
#[cfg(windows)]
pub use crate::root::{CLASSES_ROOT, CURRENT_CONFIG, CURRENT_USER, LOCAL_MACHINE, USERS};
pub use crate::value::{RegistryValue, ValueKind};

pub mod prelude {
    pub use crate::access::{Access, CreateOptions, Disposition, NotifyFilter};
    pub use crate::error::{ErrorKind, RegistryError, Result};
    #[cfg(windows)]
    pub use crate::key::RegistryKey;
    #[cfg(windows)]
    pub use crate::notify::ChangeEvent;
    pub use crate::root::Root;
    #[cfg(windows)]
    pub use crate::root::{CLASSES_ROOT, CURRENT_CONFIG, CURRENT_USER, LOCAL_MACHINE, USERS};
    pub use crate::value::{RegistryValue, ValueKind};
}
