//! Access masks, notification filters and creation options passed to the OS.

bitflags::bitflags! {
    /// Access rights requested when opening or creating a key (`REGSAM`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Access: u32 {
        const QUERY_VALUE = 0x0001;
        const SET_VALUE = 0x0002;
        const CREATE_SUB_KEY = 0x0004;
        const ENUMERATE_SUB_KEYS = 0x0008;
        /// Required for change notification
        const NOTIFY = 0x0010;
        const CREATE_LINK = 0x0020;
        /// Use the 64-bit registry view from a 32-bit process
        const WOW64_64KEY = 0x0100;
        /// Use the 32-bit registry view from a 64-bit process
        const WOW64_32KEY = 0x0200;
        const DELETE = 0x0001_0000;
        const READ_CONTROL = 0x0002_0000;
        const WRITE_DAC = 0x0004_0000;
        const WRITE_OWNER = 0x0008_0000;
        const READ = Self::READ_CONTROL.bits()
            | Self::QUERY_VALUE.bits()
            | Self::ENUMERATE_SUB_KEYS.bits()
            | Self::NOTIFY.bits();
        const WRITE = Self::READ_CONTROL.bits()
            | Self::SET_VALUE.bits()
            | Self::CREATE_SUB_KEY.bits();
        const EXECUTE = Self::READ.bits();
        const ALL_ACCESS = 0x000F_003F;
    }
}

impl Default for Access {
    fn default() -> Self {
        Self::READ
    }
}

bitflags::bitflags! {
    /// Kinds of change that complete a notification registration.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct NotifyFilter: u32 {
        /// Subkey added or deleted
        const NAME = 0x0000_0001;
        const ATTRIBUTES = 0x0000_0002;
        /// Value added, changed or deleted
        const LAST_SET = 0x0000_0004;
        const SECURITY = 0x0000_0008;
        /// Keep the registration alive after the registering thread exits
        const THREAD_AGNOSTIC = 0x1000_0000;
    }
}

impl Default for NotifyFilter {
    fn default() -> Self {
        Self::NAME | Self::LAST_SET | Self::ATTRIBUTES
    }
}

/// Options for `RegistryKey::create_with_options`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CreateOptions {
    /// Keep the key in memory only; it is gone after the next restart.
    pub volatile: bool,
}

impl CreateOptions {
    pub(crate) const REG_OPTION_NON_VOLATILE: u32 = 0x0000_0000;
    pub(crate) const REG_OPTION_VOLATILE: u32 = 0x0000_0001;

    #[must_use]
    pub const fn volatile() -> Self {
        Self { volatile: true }
    }

    pub(crate) const fn bits(self) -> u32 {
        if self.volatile {
            Self::REG_OPTION_VOLATILE
        } else {
            Self::REG_OPTION_NON_VOLATILE
        }
    }
}

/// Whether `create` made a new key or opened an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    CreatedNewKey,
    OpenedExistingKey,
}
