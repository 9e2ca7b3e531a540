//! Live registry walkthrough: every operation of the library against a scratch key.

pub const DEFAULT_SUBKEY: &str = "OUR_TESTING_SUBKEY";

#[cfg(not(windows))]
pub async fn run(_root: &str, _subkey: &str) -> anyhow::Result<()> {
    anyhow::bail!("the registry exerciser only runs on Windows")
}

#[cfg(windows)]
pub use live::run;

/// Alphanumeric payload written to trigger the change notification.
#[cfg(any(windows, test))]
fn random_text(len: usize) -> String {
    use rand::RngExt;

    const ALPHANUM: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

    let mut rng = rand::rng();
    (0..len)
        .map(|_| char::from(ALPHANUM[rng.random_range(0..ALPHANUM.len())]))
        .collect()
}

#[cfg(windows)]
mod live {
    use anyhow::{anyhow, bail, ensure, Context, Result};
    use registry_key::prelude::*;
    use std::fmt::Debug;
    use std::sync::Arc;
    use std::time::Duration;
    use tracing::{debug, info};

    const NOTIFY_VALUE: &str = "INVOKE_NOTIFY";
    const PROGRAM_PATH: &str = r"%ProgramFiles%\My Company\My Product\Program.exe";
    const TRICKY_TEXT: &str = "jhihsihjo; ;oj9dn9u8y   8726yi7138ry301ccn   f  fjhiehfo2h 2 c2jhcoh293i70473[]\\;;lll[]]\\[;'.,.\\áýáýíwýžž+=éíáýýž;;```";

    pub async fn run(root: &str, subkey: &str) -> Result<()> {
        let root: Root = root.parse()?;
        info!(%root, subkey, "starting registry walkthrough");

        preconditions()?;

        let key = Arc::new(root.create(subkey, Access::ALL_ACCESS | Access::NOTIFY)?);
        info!(path = %key, "scratch key ready");

        key.set_expand_string("", PROGRAM_PATH)?;
        expect_eq("default expand string", key.get_string("")?, PROGRAM_PATH.to_string())?;

        notification(Arc::clone(&key)).await?;
        presence(&key)?;
        boundaries(&key)?;

        let key = Arc::try_unwrap(key).map_err(|_| anyhow!("scratch key is still shared"))?;
        key.delete_key()?;
        info!("all checks passed");
        Ok(())
    }

    fn preconditions() -> Result<()> {
        expect_err(
            "open empty path",
            LOCAL_MACHINE.open("", Access::READ),
            ErrorKind::InvalidArgument,
        )?;
        expect_err(
            "open missing key",
            LOCAL_MACHINE.open("NOT_EXISTING_REGISTRY_KEY", Access::READ),
            ErrorKind::NotFound,
        )?;
        expect_err(
            "create empty path",
            LOCAL_MACHINE.create("", Access::ALL_ACCESS),
            ErrorKind::InvalidArgument,
        )?;
        expect_err(
            "create on hive",
            LOCAL_MACHINE.create("CANNOT_CREATE_ON_HIVE", Access::ALL_ACCESS),
            ErrorKind::AccessDenied,
        )?;

        let software = LOCAL_MACHINE.open("SOFTWARE", Access::READ)?;
        expect_err("has_key empty", software.has_key(""), ErrorKind::InvalidArgument)?;
        expect_err("exists empty", software.exists(""), ErrorKind::InvalidArgument)?;
        expect_eq("has_key missing", software.has_key("KEY_THAT_DOES_NOT_EXISTS")?, false)?;
        expect_eq("exists missing", software.exists("KEY_THAT_DOES_NOT_EXISTS")?, false)?;
        expect_err(
            "create without rights",
            software.create("CANNOT_CREATE_ACCESS_DENIED", Access::ALL_ACCESS),
            ErrorKind::AccessDenied,
        )?;

        info!("precondition checks passed");
        Ok(())
    }

    /// Register here, wait on a blocking worker, mutate, and read what the worker saw.
    async fn notification(key: Arc<RegistryKey>) -> Result<()> {
        let event = ChangeEvent::new()?;
        let filter = NotifyFilter::default() | NotifyFilter::THREAD_AGNOSTIC;
        key.notify_change_async(&event, false, filter)?;

        let watcher = Arc::clone(&key);
        let task = tokio::task::spawn_blocking(move || -> Result<String> {
            if !event.wait_timeout(Duration::from_secs(10))? {
                bail!("change notification never arrived");
            }
            Ok(watcher.get_string(NOTIFY_VALUE)?)
        });

        let expected = super::random_text(32);
        key.set_string(NOTIFY_VALUE, &expected)?;

        let observed = task.await.context("notification worker panicked")??;
        expect_eq("notified value", observed, expected)?;
        key.delete(NOTIFY_VALUE)?;

        info!("change notification passed");
        Ok(())
    }

    fn presence(key: &RegistryKey) -> Result<()> {
        expect_err("has_value empty", key.has_value(""), ErrorKind::InvalidArgument)?;
        expect_eq("has_value missing", key.has_value("VALUE_THAT_DOES_NOT_EXISTS")?, false)?;

        let cases: [(&str, RegistryValue); 4] = [
            ("INT32_VALUE_THAT_EXISTS", RegistryValue::I32(1_001_236)),
            ("INT64_VALUE_THAT_EXISTS", RegistryValue::I64(810_012_361_001_236)),
            ("BOOLEAN_VALUE_THAT_EXISTS", RegistryValue::Bool(true)),
            (
                "STRING_VALUE_THAT_EXISTS",
                RegistryValue::from("Value I want to store in this registry key!"),
            ),
        ];

        for (name, value) in cases {
            key.set_value(name, &value)?;
            expect_eq(name, key.has_value(name)?, true)?;
            let stored = match value {
                // Booleans are stored as DWORD and read back through the typed getter
                RegistryValue::Bool(_) => RegistryValue::Bool(key.get_bool(name)?),
                _ => key.get_value(name)?,
            };
            expect_eq(name, stored, value)?;
            key.delete(name)?;
            expect_eq(name, key.has_value(name)?, false)?;
            expect_err(name, key.delete(name), ErrorKind::NotFound)?;
        }

        info!("presence checks passed");
        Ok(())
    }

    fn boundaries(key: &RegistryKey) -> Result<()> {
        let tmp = key.create("TEST1", Access::ALL_ACCESS)?;

        tmp.set_i32("", -61)?;
        expect_eq("default i32", tmp.get_i32("")?, -61)?;
        tmp.set_u32("", 61)?;
        expect_eq("default u32", tmp.get_u32("")?, 61)?;
        tmp.set_i64("", 61)?;
        expect_eq("default i64", tmp.get_i64("")?, 61)?;
        tmp.set_u64("", 61)?;
        expect_eq("default u64", tmp.get_u64("")?, 61)?;
        tmp.set_string("", "Default")?;
        expect_eq("default string", tmp.get_string("")?, "Default".to_string())?;

        for (name, value) in [("AA", true), ("AB", false)] {
            tmp.set_bool(name, value)?;
            expect_eq(name, tmp.get_bool(name)?, value)?;
        }
        for (name, value) in [("BA", 0), ("BB", 1), ("BC", -1), ("BD", i32::MAX), ("BE", i32::MIN)] {
            tmp.set_i32(name, value)?;
            expect_eq(name, tmp.get_i32(name)?, value)?;
        }
        for (name, value) in [("CA", 0), ("CB", 1), ("CC", u32::MAX - 1), ("CD", u32::MAX)] {
            tmp.set_u32(name, value)?;
            expect_eq(name, tmp.get_u32(name)?, value)?;
        }
        for (name, value) in [("DA", 0), ("DB", 1), ("DC", -1), ("DD", i64::MAX), ("DE", i64::MIN)] {
            tmp.set_i64(name, value)?;
            expect_eq(name, tmp.get_i64(name)?, value)?;
        }
        for (name, value) in [("EA", 0), ("EB", 1), ("EC", u64::MAX - 1), ("ED", u64::MAX)] {
            tmp.set_u64(name, value)?;
            expect_eq(name, tmp.get_u64(name)?, value)?;
        }
        for (name, value) in [("FA", ""), ("FB", "A"), ("FC", TRICKY_TEXT)] {
            tmp.set_string(name, value)?;
            expect_eq(name, tmp.get_string(name)?, value.to_string())?;
        }

        let blob = [0u8, 1, 2, 0x7F, 0x80, 0xFF];
        tmp.set_binary("GA", &blob)?;
        expect_eq("GA", tmp.get_binary("GA", blob.len())?, blob.to_vec())?;

        expect_err("type mismatch", tmp.get_i64("BA"), ErrorKind::TypeMismatch)?;

        let info = tmp.info()?;
        debug!(?info, "TEST1 metadata");
        drop(tmp);

        expect_eq("subkeys", key.get_subkeys()?, vec!["TEST1".to_string()])?;
        key.delete("TEST1")?;
        expect_eq("TEST1 deleted", key.has_key("TEST1")?, false)?;

        info!("boundary round trips passed");
        Ok(())
    }

    fn expect_eq<T: PartialEq + Debug>(label: &str, actual: T, expected: T) -> Result<()> {
        ensure!(actual == expected, "{label}: expected {expected:?}, got {actual:?}");
        debug!(label, "ok");
        Ok(())
    }

    fn expect_err<T>(label: &str, result: registry_key::Result<T>, kind: ErrorKind) -> Result<()> {
        match result {
            Err(e) if e.kind() == kind => {
                debug!(label, error = %e, "failed as expected");
                Ok(())
            }
            Err(e) => bail!("{label}: expected {kind:?}, got {e}"),
            Ok(_) => bail!("{label}: expected {kind:?}, got success"),
        }
    }
}
