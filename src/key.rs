//! Registry key handle wrapper.
//!
//! Each [`RegistryKey`] either owns one OS key handle, closed exactly once on drop,
//! or stands for one of the predefined roots, which are never closed. Every operation
//! forwards to a single registry call and translates its status into [`RegistryError`].

use crate::access::{Access, CreateOptions, Disposition, NotifyFilter};
use crate::error::{RegistryError, Result};
use crate::info::{filetime_to_datetime, KeyInfo};
use crate::notify::ChangeEvent;
use crate::root::Root;
use crate::value::{self, encode_sz, to_wide, RegistryValue, ValueKind};
use std::borrow::Cow;
use std::fmt;
use tracing::{debug, instrument, trace, warn};
use windows::core::{PCWSTR, PWSTR};
use windows::Win32::Foundation::{
    ERROR_MORE_DATA, ERROR_NO_MORE_ITEMS, ERROR_SUCCESS, FILETIME, INVALID_HANDLE_VALUE,
    WIN32_ERROR,
};
use windows::Win32::System::Registry::{
    RegCloseKey, RegCreateKeyExW, RegDeleteKeyW, RegDeleteTreeW, RegDeleteValueW, RegEnumKeyExW,
    RegEnumValueW, RegNotifyChangeKeyValue, RegOpenKeyExW, RegQueryInfoKeyW, RegQueryValueExW,
    RegSetValueExW, HKEY, REG_CREATED_NEW_KEY, REG_CREATE_KEY_DISPOSITION, REG_NOTIFY_FILTER,
    REG_OPEN_CREATE_OPTIONS, REG_SAM_FLAGS, REG_VALUE_TYPE,
};

#[derive(Debug)]
enum KeyHandle {
    /// Opened or created by this wrapper; closed on drop.
    Owned(HKEY),
    /// A well-known root; never closed.
    Predefined(Root),
}

#[derive(Debug)]
pub struct RegistryKey {
    handle: KeyHandle,
    path: Cow<'static, str>,
}

// Registry handles are usable from any thread; the OS serializes access to them.
unsafe impl Send for RegistryKey {}
unsafe impl Sync for RegistryKey {}

impl RegistryKey {
    pub(crate) const fn predefined(root: Root) -> Self {
        Self {
            handle: KeyHandle::Predefined(root),
            path: Cow::Borrowed(root.name()),
        }
    }

    fn owned(hkey: HKEY, path: String) -> Self {
        Self {
            handle: KeyHandle::Owned(hkey),
            path: Cow::Owned(path),
        }
    }

    /// Adopt a key handle opened elsewhere. It is closed when the wrapper drops,
    /// unless it is one of the predefined roots, which are never closed.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a null or invalid handle
    ///
    /// # Safety
    ///
    /// `hkey` must be an open key handle that nothing else closes.
    pub unsafe fn from_raw_handle(hkey: HKEY, path: impl Into<String>) -> Result<Self> {
        if hkey.0.is_null() || hkey.0 == INVALID_HANDLE_VALUE.0 {
            return Err(RegistryError::invalid_argument(
                "registry key handle must not be null",
            ));
        }
        if let Some(root) = Root::ALL.into_iter().find(|root| root.hkey() == hkey) {
            return Ok(Self::predefined(root));
        }
        Ok(Self::owned(hkey, path.into()))
    }

    /// The underlying handle, for calls this wrapper does not cover.
    #[must_use]
    pub fn as_raw_handle(&self) -> HKEY {
        match self.handle {
            KeyHandle::Owned(hkey) => hkey,
            KeyHandle::Predefined(root) => root.hkey(),
        }
    }

    /// Full path of the key, starting with the root name.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub const fn is_predefined(&self) -> bool {
        matches!(self.handle, KeyHandle::Predefined(_))
    }

    // === Opening and creating ===

    /// Open the subkey at `path` with the requested rights.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an empty path, `NotFound` if the key does not exist,
    /// `AccessDenied` if the rights are not granted
    pub fn open(&self, path: &str, access: Access) -> Result<Self> {
        require_non_empty(path, "key path")?;
        let full_path = self.child_path(path);
        let path_wide = to_wide(path);
        let mut hkey = HKEY::default();

        let status = unsafe {
            RegOpenKeyExW(
                self.as_raw_handle(),
                PCWSTR(path_wide.as_ptr()),
                Some(0),
                REG_SAM_FLAGS(access.bits()),
                &raw mut hkey,
            )
        };
        check(status, "RegOpenKeyExW", &full_path)?;

        debug!(path = %full_path, ?access, "opened registry key");
        Ok(Self::owned(hkey, full_path))
    }

    /// Open the subkey at `path`, creating every missing component.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an empty path, `AccessDenied` if the parent refuses the
    /// creation, any other OS failure as `Os`
    pub fn create(&self, path: &str, access: Access) -> Result<Self> {
        self.create_with_options(path, access, CreateOptions::default())
            .map(|(key, _)| key)
    }

    /// # Errors
    ///
    /// Same as [`RegistryKey::create`]
    pub fn create_with_options(
        &self,
        path: &str,
        access: Access,
        options: CreateOptions,
    ) -> Result<(Self, Disposition)> {
        require_non_empty(path, "key path")?;
        let full_path = self.child_path(path);
        let path_wide = to_wide(path);
        let mut hkey = HKEY::default();
        let mut disposition = REG_CREATE_KEY_DISPOSITION::default();

        let status = unsafe {
            RegCreateKeyExW(
                self.as_raw_handle(),
                PCWSTR(path_wide.as_ptr()),
                None,
                PCWSTR::null(),
                REG_OPEN_CREATE_OPTIONS(options.bits()),
                REG_SAM_FLAGS(access.bits()),
                None,
                &raw mut hkey,
                Some(&raw mut disposition),
            )
        };
        check(status, "RegCreateKeyExW", &full_path)?;

        let disposition = if disposition == REG_CREATED_NEW_KEY {
            Disposition::CreatedNewKey
        } else {
            Disposition::OpenedExistingKey
        };
        debug!(path = %full_path, ?access, ?disposition, "created registry key");
        Ok((Self::owned(hkey, full_path), disposition))
    }

    /// Whether a subkey exists at `path`.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an empty path; OS failures other than "not found"
    pub fn exists(&self, path: &str) -> Result<bool> {
        require_non_empty(path, "key path")?;
        match self.open(path, Access::READ) {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Alias of [`RegistryKey::exists`].
    ///
    /// # Errors
    ///
    /// Same as [`RegistryKey::exists`]
    pub fn has_key(&self, path: &str) -> Result<bool> {
        self.exists(path)
    }

    /// Whether this key holds a value called `name`.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an empty name; OS failures other than "not found"
    pub fn has_value(&self, name: &str) -> Result<bool> {
        require_non_empty(name, "value name")?;
        let name_wide = to_wide(name);

        let status = unsafe {
            RegQueryValueExW(
                self.as_raw_handle(),
                PCWSTR(name_wide.as_ptr()),
                None,
                None,
                None,
                None,
            )
        };
        match check(status, "RegQueryValueExW", &self.value_target(name)) {
            Ok(()) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    // === Typed reads ===
    //
    // An empty name addresses the key's default value. A stored type other than the
    // one the accessor reads fails with `TypeMismatch`.

    pub fn get_bool(&self, name: &str) -> Result<bool> {
        let bytes = self.query_kind(name, ValueKind::Dword, |k| k == ValueKind::Dword)?;
        Ok(value::decode_dword(name, &bytes)? != 0)
    }

    pub fn get_i32(&self, name: &str) -> Result<i32> {
        self.get_u32(name).map(u32::cast_signed)
    }

    pub fn get_u32(&self, name: &str) -> Result<u32> {
        let bytes = self.query_kind(name, ValueKind::Dword, |k| k == ValueKind::Dword)?;
        value::decode_dword(name, &bytes)
    }

    pub fn get_i64(&self, name: &str) -> Result<i64> {
        self.get_u64(name).map(u64::cast_signed)
    }

    pub fn get_u64(&self, name: &str) -> Result<u64> {
        let bytes = self.query_kind(name, ValueKind::Qword, |k| k == ValueKind::Qword)?;
        value::decode_qword(name, &bytes)
    }

    /// Read a `REG_SZ` or `REG_EXPAND_SZ` value. Environment references are not expanded.
    pub fn get_string(&self, name: &str) -> Result<String> {
        let bytes = self.query_kind(name, ValueKind::String, ValueKind::is_string)?;
        value::decode_sz(name, &bytes)
    }

    pub fn get_expand_string(&self, name: &str) -> Result<String> {
        let bytes =
            self.query_kind(name, ValueKind::ExpandString, |k| k == ValueKind::ExpandString)?;
        value::decode_sz(name, &bytes)
    }

    /// Read at most `len` bytes of a `REG_BINARY` value.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `len` does not fit in 32 bits, `TypeMismatch` for a
    /// non-binary value of any size, and the OS "more data" status for a binary
    /// value longer than `len`
    pub fn get_binary(&self, name: &str, len: usize) -> Result<Vec<u8>> {
        let mut size = u32::try_from(len)
            .map_err(|_| RegistryError::invalid_argument("binary length exceeds 4 GiB"))?;
        let name_wide = to_wide(name);
        let mut buffer = vec![0u8; len];
        let mut kind = REG_VALUE_TYPE::default();

        let status = unsafe {
            RegQueryValueExW(
                self.as_raw_handle(),
                PCWSTR(name_wide.as_ptr()),
                None,
                Some(&raw mut kind),
                Some(buffer.as_mut_ptr()),
                Some(&raw mut size),
            )
        };
        // The type is reported even when the buffer is too small
        if status == ERROR_SUCCESS || status == ERROR_MORE_DATA {
            let found = ValueKind::from_raw(kind.0);
            if found != ValueKind::Binary {
                return Err(mismatch(name, ValueKind::Binary, found));
            }
        }
        check(status, "RegQueryValueExW", &self.value_target(name))?;

        buffer.truncate(size as usize);
        trace!(path = %self.path, name, len = buffer.len(), "read binary value");
        Ok(buffer)
    }

    /// Read any value, dispatching on its stored type.
    ///
    /// Types without a [`RegistryValue`] variant read as [`RegistryValue::Absent`].
    pub fn get_value(&self, name: &str) -> Result<RegistryValue> {
        let (kind, bytes) = self.query_raw(name)?;
        RegistryValue::decode(name, kind, &bytes)
    }

    // === Typed writes ===

    pub fn set_bool(&self, name: &str, value: bool) -> Result {
        self.set_raw(name, ValueKind::Dword, &u32::from(value).to_le_bytes())
    }

    pub fn set_i32(&self, name: &str, value: i32) -> Result {
        self.set_raw(name, ValueKind::Dword, &value.to_le_bytes())
    }

    pub fn set_u32(&self, name: &str, value: u32) -> Result {
        self.set_raw(name, ValueKind::Dword, &value.to_le_bytes())
    }

    pub fn set_i64(&self, name: &str, value: i64) -> Result {
        self.set_raw(name, ValueKind::Qword, &value.to_le_bytes())
    }

    pub fn set_u64(&self, name: &str, value: u64) -> Result {
        self.set_raw(name, ValueKind::Qword, &value.to_le_bytes())
    }

    pub fn set_string(&self, name: &str, value: &str) -> Result {
        self.set_raw(name, ValueKind::String, &encode_sz(value))
    }

    pub fn set_expand_string(&self, name: &str, value: &str) -> Result {
        self.set_raw(name, ValueKind::ExpandString, &encode_sz(value))
    }

    pub fn set_binary(&self, name: &str, value: &[u8]) -> Result {
        self.set_raw(name, ValueKind::Binary, value)
    }

    /// Store `value` with the type its variant maps to.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for [`RegistryValue::Absent`]
    pub fn set_value(&self, name: &str, value: &RegistryValue) -> Result {
        let (kind, bytes) = value.encode().ok_or_else(|| {
            RegistryError::invalid_argument(format!("cannot store an absent value as '{name}'"))
        })?;
        self.set_raw(name, kind, &bytes)
    }

    // === Deletion ===

    /// Delete the value called `name`, or failing that the subkey tree called `name`.
    ///
    /// Value names and subkey names are separate namespaces, so trying both resolves
    /// the name. An empty name deletes only the default value.
    ///
    /// # Errors
    ///
    /// `NotFound` if neither a value nor a subkey has that name
    pub fn delete(&self, name: &str) -> Result {
        let name_wide = to_wide(name);

        let status = unsafe { RegDeleteValueW(self.as_raw_handle(), PCWSTR(name_wide.as_ptr())) };
        if status == ERROR_SUCCESS {
            trace!(path = %self.path, name, "deleted registry value");
            return Ok(());
        }
        if name.is_empty() {
            return check(status, "RegDeleteValueW", &self.value_target(name));
        }

        let status = unsafe { RegDeleteTreeW(self.as_raw_handle(), PCWSTR(name_wide.as_ptr())) };
        let full_path = self.child_path(name);
        check(status, "RegDeleteTreeW", &full_path)?;
        debug!(path = %full_path, "deleted registry subtree");
        Ok(())
    }

    /// Delete this key with all its values and subkeys.
    ///
    /// The key must have been opened with `Access::DELETE` (part of `ALL_ACCESS`).
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a predefined root
    #[instrument(skip(self), fields(path = %self.path))]
    pub fn delete_key(self) -> Result {
        let KeyHandle::Owned(hkey) = self.handle else {
            return Err(RegistryError::invalid_argument(format!(
                "predefined root {} cannot be deleted",
                self.path
            )));
        };

        let status = unsafe { RegDeleteTreeW(hkey, PCWSTR::null()) };
        check(status, "RegDeleteTreeW", &self.path)?;

        let this_key = to_wide("");
        let status = unsafe { RegDeleteKeyW(hkey, PCWSTR(this_key.as_ptr())) };
        check(status, "RegDeleteKeyW", &self.path)?;

        debug!("deleted registry key");
        Ok(())
    }

    // === Enumeration ===

    /// Names of the immediate subkeys, in the order the OS enumerates them.
    pub fn get_subkeys(&self) -> Result<Vec<String>> {
        let info = self.info()?;
        let mut names = Vec::with_capacity(info.subkeys as usize);
        let mut buffer = vec![0u16; info.max_subkey_name_len as usize + 1];
        let mut index = 0u32;

        loop {
            let mut len = wide_capacity(&buffer);
            let status = unsafe {
                RegEnumKeyExW(
                    self.as_raw_handle(),
                    index,
                    Some(PWSTR(buffer.as_mut_ptr())),
                    &raw mut len,
                    None,
                    None,
                    None,
                    None,
                )
            };
            if status == ERROR_NO_MORE_ITEMS {
                break;
            }
            if status == ERROR_MORE_DATA {
                // A longer name appeared since the info query
                buffer.resize(buffer.len() * 2, 0);
                continue;
            }
            check(status, "RegEnumKeyExW", &self.path)?;

            names.push(self.decode_name(&buffer[..len as usize])?);
            index += 1;
        }

        Ok(names)
    }

    /// Names of the values held by this key, in the order the OS enumerates them.
    ///
    /// The default value, when set, appears as an empty name.
    pub fn get_value_names(&self) -> Result<Vec<String>> {
        let info = self.info()?;
        let mut names = Vec::with_capacity(info.values as usize);
        let mut buffer = vec![0u16; info.max_value_name_len as usize + 1];
        let mut index = 0u32;

        loop {
            let mut len = wide_capacity(&buffer);
            let status = unsafe {
                RegEnumValueW(
                    self.as_raw_handle(),
                    index,
                    Some(PWSTR(buffer.as_mut_ptr())),
                    &raw mut len,
                    None,
                    None,
                    None,
                    None,
                )
            };
            if status == ERROR_NO_MORE_ITEMS {
                break;
            }
            if status == ERROR_MORE_DATA {
                buffer.resize(buffer.len() * 2, 0);
                continue;
            }
            check(status, "RegEnumValueW", &self.path)?;

            names.push(self.decode_name(&buffer[..len as usize])?);
            index += 1;
        }

        Ok(names)
    }

    pub fn info(&self) -> Result<KeyInfo> {
        let mut info = KeyInfo::default();
        let mut last_write = FILETIME::default();

        let status = unsafe {
            RegQueryInfoKeyW(
                self.as_raw_handle(),
                None,
                None,
                None,
                Some(&raw mut info.subkeys),
                Some(&raw mut info.max_subkey_name_len),
                None,
                Some(&raw mut info.values),
                Some(&raw mut info.max_value_name_len),
                Some(&raw mut info.max_value_data_len),
                None,
                Some(&raw mut last_write),
            )
        };
        check(status, "RegQueryInfoKeyW", &self.path)?;

        let ticks = (u64::from(last_write.dwHighDateTime) << 32) | u64::from(last_write.dwLowDateTime);
        info.last_write = filetime_to_datetime(ticks);
        Ok(info)
    }

    // === Change notification ===

    /// Block the calling thread until a change matching `filter` happens.
    ///
    /// The key must have been opened with `Access::NOTIFY`.
    #[instrument(skip(self), fields(path = %self.path))]
    pub fn notify_change(&self, watch_subtree: bool, filter: NotifyFilter) -> Result {
        let status = unsafe {
            RegNotifyChangeKeyValue(
                self.as_raw_handle(),
                watch_subtree,
                REG_NOTIFY_FILTER(filter.bits()),
                None,
                false,
            )
        };
        check(status, "RegNotifyChangeKeyValue", &self.path)
    }

    /// Register `event` to be signalled once on the next change matching `filter`.
    ///
    /// Returns immediately. The registration is one-shot: call again after each
    /// signal to keep observing the key.
    #[instrument(skip(self, event), fields(path = %self.path))]
    pub fn notify_change_async(
        &self,
        event: &ChangeEvent,
        watch_subtree: bool,
        filter: NotifyFilter,
    ) -> Result {
        let status = unsafe {
            RegNotifyChangeKeyValue(
                self.as_raw_handle(),
                watch_subtree,
                REG_NOTIFY_FILTER(filter.bits()),
                Some(event.handle()),
                true,
            )
        };
        check(status, "RegNotifyChangeKeyValue", &self.path)?;
        trace!("change notification registered");
        Ok(())
    }

    // === Raw value access ===

    /// Size query, allocate, read. Regrows when the value grew in between.
    fn query_raw(&self, name: &str) -> Result<(ValueKind, Vec<u8>)> {
        let name_wide = to_wide(name);
        let mut kind = REG_VALUE_TYPE::default();
        let mut size = 0u32;

        let status = unsafe {
            RegQueryValueExW(
                self.as_raw_handle(),
                PCWSTR(name_wide.as_ptr()),
                None,
                Some(&raw mut kind),
                None,
                Some(&raw mut size),
            )
        };
        check(status, "RegQueryValueExW", &self.value_target(name))?;

        let mut buffer = vec![0u8; size as usize];
        loop {
            let mut len = u32::try_from(buffer.len()).unwrap_or(u32::MAX);
            let status = unsafe {
                RegQueryValueExW(
                    self.as_raw_handle(),
                    PCWSTR(name_wide.as_ptr()),
                    None,
                    Some(&raw mut kind),
                    Some(buffer.as_mut_ptr()),
                    Some(&raw mut len),
                )
            };
            if status == ERROR_MORE_DATA {
                let needed = (len as usize).max(buffer.len() + 2);
                buffer.resize(needed, 0);
                continue;
            }
            check(status, "RegQueryValueExW", &self.value_target(name))?;

            buffer.truncate(len as usize);
            let kind = ValueKind::from_raw(kind.0);
            trace!(path = %self.path, name, %kind, len = buffer.len(), "read registry value");
            return Ok((kind, buffer));
        }
    }

    fn query_kind(
        &self,
        name: &str,
        expected: ValueKind,
        accepts: impl Fn(ValueKind) -> bool,
    ) -> Result<Vec<u8>> {
        let (found, bytes) = self.query_raw(name)?;
        if accepts(found) {
            Ok(bytes)
        } else {
            Err(mismatch(name, expected, found))
        }
    }

    fn set_raw(&self, name: &str, kind: ValueKind, data: &[u8]) -> Result {
        let name_wide = to_wide(name);

        let status = unsafe {
            RegSetValueExW(
                self.as_raw_handle(),
                PCWSTR(name_wide.as_ptr()),
                None,
                REG_VALUE_TYPE(kind.as_raw()),
                Some(data),
            )
        };
        check(status, "RegSetValueExW", &self.value_target(name))?;

        trace!(path = %self.path, name, %kind, len = data.len(), "wrote registry value");
        Ok(())
    }

    fn decode_name(&self, units: &[u16]) -> Result<String> {
        String::from_utf16(units).map_err(|e| RegistryError::InvalidData {
            name: self.path.to_string(),
            reason: format!("enumerated name is not UTF-16: {e}"),
        })
    }

    fn child_path(&self, path: &str) -> String {
        format!("{}\\{}", self.path, path.trim_start_matches('\\'))
    }

    fn value_target(&self, name: &str) -> String {
        if name.is_empty() {
            format!("{} (default value)", self.path)
        } else {
            format!("{}\\{}", self.path, name)
        }
    }
}

impl Root {
    /// Shorthand for `self.key().open(path, access)`.
    ///
    /// # Errors
    ///
    /// Same as [`RegistryKey::open`]
    pub fn open(self, path: &str, access: Access) -> Result<RegistryKey> {
        self.key().open(path, access)
    }

    /// Shorthand for `self.key().create(path, access)`.
    ///
    /// # Errors
    ///
    /// Same as [`RegistryKey::create`]
    pub fn create(self, path: &str, access: Access) -> Result<RegistryKey> {
        self.key().create(path, access)
    }
}

impl fmt::Display for RegistryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

impl Drop for RegistryKey {
    fn drop(&mut self) {
        if let KeyHandle::Owned(hkey) = self.handle {
            let status = unsafe { RegCloseKey(hkey) };
            if status != ERROR_SUCCESS {
                warn!(path = %self.path, code = status.0, "RegCloseKey failed");
            }
        }
    }
}

fn check(status: WIN32_ERROR, operation: &'static str, target: &str) -> Result {
    if status == ERROR_SUCCESS {
        Ok(())
    } else {
        Err(RegistryError::from_status(operation, target, status.0))
    }
}

fn require_non_empty(value: &str, what: &str) -> Result {
    if value.is_empty() {
        return Err(RegistryError::invalid_argument(format!(
            "{what} must not be empty"
        )));
    }
    Ok(())
}

fn mismatch(name: &str, expected: ValueKind, found: ValueKind) -> RegistryError {
    RegistryError::TypeMismatch {
        name: name.to_string(),
        expected,
        found,
    }
}

fn wide_capacity(buffer: &[u16]) -> u32 {
    u32::try_from(buffer.len()).unwrap_or(u32::MAX)
}
