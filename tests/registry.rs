#![cfg(windows)]

use registry_key::prelude::*;
use std::collections::BTreeSet;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use winreg::enums::{RegType, HKEY_CURRENT_USER, KEY_ALL_ACCESS};

const PARENT: &str = r"Software\registry-key-tests";

/// A uniquely named key under HKCU, deleted with its subtree when dropped.
struct Scratch {
    key: Option<RegistryKey>,
    path: String,
}

impl Scratch {
    fn new(name: &str) -> Self {
        let path = format!(r"{PARENT}\{name}-{}", std::process::id());
        if let Ok(stale) = CURRENT_USER.open(&path, Access::ALL_ACCESS) {
            stale.delete_key().unwrap();
        }
        let key = CURRENT_USER.create(&path, Access::ALL_ACCESS).unwrap();
        Self {
            key: Some(key),
            path,
        }
    }

    fn winreg(&self) -> winreg::RegKey {
        winreg::RegKey::predef(HKEY_CURRENT_USER)
            .open_subkey_with_flags(&self.path, KEY_ALL_ACCESS)
            .unwrap()
    }
}

impl Deref for Scratch {
    type Target = RegistryKey;

    fn deref(&self) -> &RegistryKey {
        self.key.as_ref().unwrap()
    }
}

impl Drop for Scratch {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            let _ = key.delete_key();
        }
    }
}

#[test]
fn test_integer_round_trips() {
    let key = Scratch::new("integers");

    for value in [0, 1, -1, -61, i32::MAX, i32::MIN] {
        key.set_i32("X", value).unwrap();
        assert_eq!(key.get_i32("X").unwrap(), value);
    }
    for value in [0, 1, 61, u32::MAX - 1, u32::MAX] {
        key.set_u32("X", value).unwrap();
        assert_eq!(key.get_u32("X").unwrap(), value);
    }
    for value in [0, 1, -1, 810_012_361_001_236, i64::MAX, i64::MIN] {
        key.set_i64("Y", value).unwrap();
        assert_eq!(key.get_i64("Y").unwrap(), value);
    }
    for value in [0, 1, u64::MAX - 1, u64::MAX] {
        key.set_u64("Y", value).unwrap();
        assert_eq!(key.get_u64("Y").unwrap(), value);
    }

    // Same DWORD, both views
    key.set_u32("X", 4_294_967_295).unwrap();
    assert_eq!(key.get_u32("X").unwrap(), 4_294_967_295);
    assert_eq!(key.get_i32("X").unwrap(), -1);
}

#[test]
fn test_bool_round_trip() {
    let key = Scratch::new("booleans");

    key.set_bool("AA", true).unwrap();
    key.set_bool("AB", false).unwrap();
    assert!(key.get_bool("AA").unwrap());
    assert!(!key.get_bool("AB").unwrap());

    // Any non-zero DWORD reads as true
    key.set_u32("AC", 7).unwrap();
    assert!(key.get_bool("AC").unwrap());
}

#[test]
fn test_string_round_trips() {
    let key = Scratch::new("strings");
    let tricky = "jhihsihjo; ;oj9dn9u8y   8726yi7138ry301ccn   f  fjhiehfo2h 2 c2jhcoh293i70473[]\\;;lll[]]\\[;'.,.\\áýáýíwýžž+=éíáýýž;;```";

    for value in ["", "A", "Value I want to store in this registry key!", tricky] {
        key.set_string("S", value).unwrap();
        assert_eq!(key.get_string("S").unwrap(), value);
    }
}

#[test]
fn test_default_value_expand_string() {
    let key = Scratch::new("expand");
    let program = r"%ProgramFiles%\My Company\My Product\Program.exe";

    key.set_expand_string("", program).unwrap();
    assert_eq!(key.get_string("").unwrap(), program);
    assert_eq!(key.get_expand_string("").unwrap(), program);

    let raw = key.winreg().get_raw_value("").unwrap();
    assert!(matches!(raw.vtype, RegType::REG_EXPAND_SZ));

    key.set_string("plain", "x").unwrap();
    let err = key.get_expand_string("plain").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TypeMismatch);
}

#[test]
fn test_values_interoperate_with_winreg() {
    let key = Scratch::new("interop");
    let other = key.winreg();

    key.set_string("ours", "written here").unwrap();
    let read: String = other.get_value("ours").unwrap();
    assert_eq!(read, "written here");

    other.set_value("theirs", &"written there".to_string()).unwrap();
    assert_eq!(key.get_string("theirs").unwrap(), "written there");

    other.set_value("dword", &1_001_236u32).unwrap();
    assert_eq!(key.get_i32("dword").unwrap(), 1_001_236);

    key.set_i64("qword", -2).unwrap();
    let read: u64 = other.get_value("qword").unwrap();
    assert_eq!(read, u64::MAX - 1);
}

#[test]
fn test_binary_reads_use_caller_length() {
    let key = Scratch::new("binary");
    let blob = [0u8, 1, 2, 0x7F, 0x80, 0xFF];

    key.set_binary("B", &blob).unwrap();
    assert_eq!(key.get_binary("B", blob.len()).unwrap(), blob);
    // A larger buffer is truncated to what was read
    assert_eq!(key.get_binary("B", 64).unwrap(), blob);
    // A smaller one cannot hold the value
    let err = key.get_binary("B", 2).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Os);

    // Rejected before any buffer is allocated
    if usize::BITS > u32::BITS {
        let err = key.get_binary("B", usize::MAX).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        let err = key.get_binary("B", u32::MAX as usize + 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }
}

#[test]
fn test_binary_type_checked_before_length() {
    let key = Scratch::new("binary-mismatch");
    key.set_string("S", "longer than the caller's buffer").unwrap();

    match key.get_binary("S", 2).unwrap_err() {
        RegistryError::TypeMismatch {
            expected, found, ..
        } => {
            assert_eq!(expected, ValueKind::Binary);
            assert_eq!(found, ValueKind::String);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(key.get_binary("missing", 2).unwrap_err().kind(), ErrorKind::NotFound);
}

#[test]
fn test_get_value_dispatches_on_stored_type() {
    let key = Scratch::new("dispatch");

    key.set_i32("i32", -61).unwrap();
    key.set_i64("i64", i64::MIN).unwrap();
    key.set_string("text", "hello").unwrap();
    key.set_expand_string("expand", "%TEMP%").unwrap();
    key.set_binary("bytes", &[9, 8, 7]).unwrap();
    key.winreg()
        .set_value("multi", &vec!["a".to_string(), "b".to_string()])
        .unwrap();

    assert_eq!(key.get_value("i32").unwrap(), RegistryValue::I32(-61));
    assert_eq!(key.get_value("i64").unwrap(), RegistryValue::I64(i64::MIN));
    assert_eq!(key.get_value("text").unwrap(), RegistryValue::from("hello"));
    assert_eq!(key.get_value("expand").unwrap(), RegistryValue::from("%TEMP%"));
    assert_eq!(
        key.get_value("bytes").unwrap(),
        RegistryValue::Bytes(vec![9, 8, 7])
    );
    assert_eq!(key.get_value("multi").unwrap(), RegistryValue::Absent);

    let err = key.get_value("missing").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn test_set_value_dispatches_on_variant() {
    let key = Scratch::new("set-value");

    key.set_value("b", &RegistryValue::Bool(true)).unwrap();
    key.set_value("t", &RegistryValue::from("text")).unwrap();
    key.set_value("y", &RegistryValue::Bytes(vec![1, 2])).unwrap();

    assert_eq!(key.get_u32("b").unwrap(), 1);
    assert_eq!(key.get_string("t").unwrap(), "text");
    assert_eq!(key.get_binary("y", 2).unwrap(), vec![1, 2]);

    let err = key.set_value("a", &RegistryValue::Absent).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert!(!key.has_value("a").unwrap());
}

#[test]
fn test_type_mismatch_is_reported() {
    let key = Scratch::new("mismatch");
    key.set_string("S", "not a number").unwrap();
    key.set_i32("N", 5).unwrap();

    match key.get_i32("S").unwrap_err() {
        RegistryError::TypeMismatch {
            name,
            expected,
            found,
        } => {
            assert_eq!(name, "S");
            assert_eq!(expected, ValueKind::Dword);
            assert_eq!(found, ValueKind::String);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(key.get_string("N").unwrap_err().kind(), ErrorKind::TypeMismatch);
    assert_eq!(key.get_u64("N").unwrap_err().kind(), ErrorKind::TypeMismatch);
    assert_eq!(key.get_binary("N", 4).unwrap_err().kind(), ErrorKind::TypeMismatch);
}

#[test]
fn test_has_value_lifecycle() {
    let key = Scratch::new("has-value");

    assert_eq!(key.has_value("").unwrap_err().kind(), ErrorKind::InvalidArgument);
    assert!(!key.has_value("V").unwrap());
    key.set_u64("V", 1).unwrap();
    assert!(key.has_value("V").unwrap());
    key.delete("V").unwrap();
    assert!(!key.has_value("V").unwrap());
    assert_eq!(key.delete("V").unwrap_err().kind(), ErrorKind::NotFound);
}

#[test]
fn test_delete_falls_through_to_subkey() {
    let key = Scratch::new("delete-name");

    let child = key.create("TEST1", Access::ALL_ACCESS).unwrap();
    child.set_i32("", -61).unwrap();
    child.create(r"deeper\still", Access::ALL_ACCESS).unwrap();
    drop(child);

    key.delete("TEST1").unwrap();
    assert!(!key.has_key("TEST1").unwrap());

    // A value and a subkey may share a name; the value goes first
    key.set_string("both", "value").unwrap();
    drop(key.create("both", Access::ALL_ACCESS).unwrap());
    key.delete("both").unwrap();
    assert!(!key.has_value("both").unwrap());
    assert!(key.has_key("both").unwrap());
    key.delete("both").unwrap();
    assert!(!key.has_key("both").unwrap());

    assert_eq!(key.delete("neither").unwrap_err().kind(), ErrorKind::NotFound);
}

#[test]
fn test_delete_default_value_keeps_subkeys() {
    let key = Scratch::new("delete-default");
    key.set_string("", "default").unwrap();
    drop(key.create("child", Access::ALL_ACCESS).unwrap());

    key.delete("").unwrap();
    assert_eq!(key.get_string("").unwrap_err().kind(), ErrorKind::NotFound);
    assert!(key.exists("child").unwrap());
    assert_eq!(key.delete("").unwrap_err().kind(), ErrorKind::NotFound);
}

#[test]
fn test_exists_and_has_key_agree() {
    let key = Scratch::new("exists");

    for probe in ["KEY_THAT_DOES_NOT_EXISTS", "child"] {
        assert!(!key.exists(probe).unwrap());
        assert!(!key.has_key(probe).unwrap());
    }
    drop(key.create("child", Access::ALL_ACCESS).unwrap());
    assert!(key.exists("child").unwrap());
    assert!(key.has_key("child").unwrap());

    assert_eq!(key.exists("").unwrap_err().kind(), ErrorKind::InvalidArgument);
    assert_eq!(key.has_key("").unwrap_err().kind(), ErrorKind::InvalidArgument);
}

#[test]
fn test_open_and_create_errors() {
    assert_eq!(
        LOCAL_MACHINE.open("", Access::READ).unwrap_err().kind(),
        ErrorKind::InvalidArgument
    );
    assert_eq!(
        LOCAL_MACHINE.create("", Access::ALL_ACCESS).unwrap_err().kind(),
        ErrorKind::InvalidArgument
    );

    let err = LOCAL_MACHINE
        .open("NOT_EXISTING_REGISTRY_KEY", Access::READ)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.status_code(), Some(2));

    let err = LOCAL_MACHINE
        .create("CANNOT_CREATE_ON_HIVE", Access::ALL_ACCESS)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AccessDenied);
    assert_eq!(err.status_code(), Some(5));

    // Creating through a read-only handle is refused regardless of elevation
    let software = LOCAL_MACHINE.open("SOFTWARE", Access::READ).unwrap();
    let err = software
        .create("CANNOT_CREATE_ACCESS_DENIED", Access::ALL_ACCESS)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AccessDenied);
}

#[test]
fn test_create_reports_disposition() {
    let key = Scratch::new("disposition");

    let (_, first) = key
        .create_with_options("child", Access::READ, CreateOptions::default())
        .unwrap();
    let (_, second) = key
        .create_with_options("child", Access::READ, CreateOptions::default())
        .unwrap();
    assert_eq!(first, Disposition::CreatedNewKey);
    assert_eq!(second, Disposition::OpenedExistingKey);

    let (volatile, disposition) = key
        .create_with_options("in-memory", Access::ALL_ACCESS, CreateOptions::volatile())
        .unwrap();
    assert_eq!(disposition, Disposition::CreatedNewKey);
    volatile.set_bool("flag", true).unwrap();
    assert!(volatile.get_bool("flag").unwrap());
}

#[test]
fn test_enumeration_and_info() {
    let key = Scratch::new("enumerate");
    for name in ["alpha", "beta", "gamma"] {
        drop(key.create(name, Access::READ).unwrap());
    }
    key.set_u32("one", 1).unwrap();
    key.set_string("two", "22").unwrap();

    let subkeys: BTreeSet<String> = key.get_subkeys().unwrap().into_iter().collect();
    assert_eq!(subkeys, BTreeSet::from(["alpha", "beta", "gamma"].map(String::from)));
    let values: BTreeSet<String> = key.get_value_names().unwrap().into_iter().collect();
    assert_eq!(values, BTreeSet::from(["one", "two"].map(String::from)));

    let info = key.info().unwrap();
    assert_eq!(info.subkeys, 3);
    assert_eq!(info.values, 2);
    assert_eq!(info.max_subkey_name_len, 5);
    assert_eq!(info.max_value_name_len, 3);
    assert_eq!(info.max_value_data_len, 6);
    assert!(info.last_write.is_some());

    let empty = key.open("alpha", Access::READ).unwrap();
    assert!(empty.get_subkeys().unwrap().is_empty());
    assert!(empty.get_value_names().unwrap().is_empty());
}

#[test]
fn test_delete_key_removes_subtree() {
    let parent = Scratch::new("delete-key");
    let child = parent.create("child", Access::ALL_ACCESS).unwrap();
    child.set_string("v", "x").unwrap();
    drop(child.create(r"a\b\c", Access::READ).unwrap());

    child.delete_key().unwrap();
    assert!(!parent.exists("child").unwrap());
}

#[test]
fn test_paths_and_roots() {
    let key = Scratch::new("paths");
    let child = key.create("child", Access::READ).unwrap();

    assert_eq!(
        child.to_string(),
        format!(r"HKEY_CURRENT_USER\{}\child", key.path)
    );
    assert!(!child.is_predefined());
    assert!(CURRENT_USER.is_predefined());
    assert!(std::ptr::eq(Root::LocalMachine.key(), &LOCAL_MACHINE));
    assert_eq!(USERS.path(), "HKEY_USERS");

    for root in [&CLASSES_ROOT, &CURRENT_CONFIG] {
        assert!(root.info().is_ok());
    }
}

#[test]
fn test_from_raw_handle_rejects_null() {
    use windows::Win32::System::Registry::HKEY;

    let err = unsafe { RegistryKey::from_raw_handle(HKEY::default(), "null") }.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[test]
fn test_from_raw_handle_keeps_roots_predefined() {
    use windows::Win32::System::Registry::HKEY_CURRENT_USER as RAW_HKCU;

    let adopted = unsafe { RegistryKey::from_raw_handle(RAW_HKCU, "adopted") }.unwrap();
    assert!(adopted.is_predefined());
    assert_eq!(adopted.path(), "HKEY_CURRENT_USER");
    drop(adopted);

    // Dropping the adopted root must leave the process-wide handle usable
    assert!(CURRENT_USER.exists("Software").unwrap());
}

#[test]
fn test_async_notification_signals_once() {
    let scratch = Scratch::new("notify-async");
    let path = scratch.path.clone();
    let event = ChangeEvent::new().unwrap();
    let filter = NotifyFilter::default() | NotifyFilter::THREAD_AGNOSTIC;

    scratch.notify_change_async(&event, false, filter).unwrap();
    assert!(!event.wait_timeout(Duration::from_millis(100)).unwrap());

    let writer_path = path.clone();
    std::thread::spawn(move || {
        let key = CURRENT_USER.open(&writer_path, Access::WRITE).unwrap();
        key.set_string("INVOKE_NOTIFY", "first").unwrap();
    })
    .join()
    .unwrap();

    assert!(event.wait_timeout(Duration::from_secs(5)).unwrap());
    assert_eq!(scratch.get_string("INVOKE_NOTIFY").unwrap(), "first");

    // One-shot: no signal without re-registering
    scratch.set_string("INVOKE_NOTIFY", "second").unwrap();
    assert!(!event.wait_timeout(Duration::from_millis(500)).unwrap());

    scratch.notify_change_async(&event, false, filter).unwrap();
    scratch.set_string("INVOKE_NOTIFY", "third").unwrap();
    assert!(event.wait_timeout(Duration::from_secs(5)).unwrap());
}

#[test]
fn test_event_waited_on_another_thread() {
    let scratch = Scratch::new("notify-handoff");
    let event = ChangeEvent::new().unwrap();
    let filter = NotifyFilter::default() | NotifyFilter::THREAD_AGNOSTIC;

    // Registered before the waiter exists, so the write below cannot be missed
    scratch.notify_change_async(&event, false, filter).unwrap();
    let waiter = std::thread::spawn(move || event.wait_timeout(Duration::from_secs(5)).unwrap());

    scratch.set_string("INVOKE_NOTIFY", "handoff").unwrap();
    assert!(waiter.join().unwrap());
}

#[test]
fn test_async_notification_watches_subtree() {
    let scratch = Scratch::new("notify-subtree");
    let child = scratch.create("child", Access::ALL_ACCESS).unwrap();
    let event = ChangeEvent::new().unwrap();

    scratch
        .notify_change_async(&event, true, NotifyFilter::default())
        .unwrap();
    child.set_u32("deep", 1).unwrap();
    assert!(event.wait_timeout(Duration::from_secs(5)).unwrap());
}

#[test]
fn test_blocking_notification_returns_after_change() {
    let scratch = Scratch::new("notify-blocking");
    let path = scratch.path.clone();
    let done = Arc::new(AtomicBool::new(false));

    let writer_done = Arc::clone(&done);
    let writer = std::thread::spawn(move || {
        let key = CURRENT_USER.open(&path, Access::WRITE).unwrap();
        let mut counter = 0u32;
        // Keep writing until the watcher has seen a change
        while !writer_done.load(Ordering::SeqCst) {
            counter += 1;
            key.set_u32("tick", counter).unwrap();
            std::thread::sleep(Duration::from_millis(50));
        }
    });

    scratch
        .notify_change(false, NotifyFilter::LAST_SET)
        .unwrap();
    done.store(true, Ordering::SeqCst);
    writer.join().unwrap();

    assert!(scratch.get_u32("tick").unwrap() >= 1);
}
