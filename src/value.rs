//! Registry value model - type tags, the tagged value union and the byte codecs.

use crate::error::{RegistryError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// On-disk type tag of a registry value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ValueKind {
    None,
    String,
    ExpandString,
    Binary,
    Dword,
    DwordBigEndian,
    Link,
    MultiString,
    Qword,
    Other(u32),
}

impl ValueKind {
    #[must_use]
    pub const fn from_raw(tag: u32) -> Self {
        match tag {
            0 => Self::None,
            1 => Self::String,
            2 => Self::ExpandString,
            3 => Self::Binary,
            4 => Self::Dword,
            5 => Self::DwordBigEndian,
            6 => Self::Link,
            7 => Self::MultiString,
            11 => Self::Qword,
            other => Self::Other(other),
        }
    }

    #[must_use]
    pub const fn as_raw(self) -> u32 {
        match self {
            Self::None => 0,
            Self::String => 1,
            Self::ExpandString => 2,
            Self::Binary => 3,
            Self::Dword => 4,
            Self::DwordBigEndian => 5,
            Self::Link => 6,
            Self::MultiString => 7,
            Self::Qword => 11,
            Self::Other(tag) => tag,
        }
    }

    #[must_use]
    pub const fn is_string(self) -> bool {
        matches!(self, Self::String | Self::ExpandString)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("REG_NONE"),
            Self::String => f.write_str("REG_SZ"),
            Self::ExpandString => f.write_str("REG_EXPAND_SZ"),
            Self::Binary => f.write_str("REG_BINARY"),
            Self::Dword => f.write_str("REG_DWORD"),
            Self::DwordBigEndian => f.write_str("REG_DWORD_BIG_ENDIAN"),
            Self::Link => f.write_str("REG_LINK"),
            Self::MultiString => f.write_str("REG_MULTI_SZ"),
            Self::Qword => f.write_str("REG_QWORD"),
            Self::Other(tag) => write!(f, "REG_UNKNOWN({tag})"),
        }
    }
}

/// A registry value as read back by `get_value`, or handed to `set_value`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum RegistryValue {
    /// No value, or a stored type this crate does not model.
    #[default]
    Absent,
    Bool(bool),
    I32(i32),
    I64(i64),
    Text(String),
    Bytes(Vec<u8>),
}

impl RegistryValue {
    #[must_use]
    pub const fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    #[must_use]
    pub const fn is_number(&self) -> bool {
        matches!(self, Self::I32(_) | Self::I64(_))
    }

    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_i32(&self) -> Option<i32> {
        match self {
            Self::I32(v) => Some(*v),
            _ => None,
        }
    }

    /// Widening accessor: 32-bit values also read as 64-bit.
    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::I32(v) => Some(*v as i64),
            Self::I64(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(v) => Some(v),
            _ => None,
        }
    }

    /// Dispatch raw bytes read for `name` on their stored type tag.
    ///
    /// Tags without a variant decode to [`RegistryValue::Absent`].
    pub fn decode(name: &str, kind: ValueKind, bytes: &[u8]) -> Result<Self> {
        Ok(match kind {
            ValueKind::Dword => Self::I32(decode_dword(name, bytes)?.cast_signed()),
            ValueKind::Qword => Self::I64(decode_qword(name, bytes)?.cast_signed()),
            ValueKind::String | ValueKind::ExpandString => Self::Text(decode_sz(name, bytes)?),
            ValueKind::Binary => Self::Bytes(bytes.to_vec()),
            _ => Self::Absent,
        })
    }

    /// Type tag and bytes to store, or `None` for [`RegistryValue::Absent`].
    #[must_use]
    pub fn encode(&self) -> Option<(ValueKind, Vec<u8>)> {
        match self {
            Self::Absent => None,
            Self::Bool(v) => Some((ValueKind::Dword, u32::from(*v).to_le_bytes().to_vec())),
            Self::I32(v) => Some((ValueKind::Dword, v.to_le_bytes().to_vec())),
            Self::I64(v) => Some((ValueKind::Qword, v.to_le_bytes().to_vec())),
            Self::Text(v) => Some((ValueKind::String, encode_sz(v))),
            Self::Bytes(v) => Some((ValueKind::Binary, v.clone())),
        }
    }
}

impl From<bool> for RegistryValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for RegistryValue {
    fn from(v: i32) -> Self {
        Self::I32(v)
    }
}

impl From<i64> for RegistryValue {
    fn from(v: i64) -> Self {
        Self::I64(v)
    }
}

impl From<&str> for RegistryValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for RegistryValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Vec<u8>> for RegistryValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

// === Codecs ===

/// UTF-16 code units of `s` followed by a single NUL, for passing names to the OS.
#[must_use]
pub fn to_wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(Some(0)).collect()
}

/// Little-endian UTF-16 bytes of `s` with one terminating NUL, as stored in `REG_SZ`.
#[must_use]
pub fn encode_sz(s: &str) -> Vec<u8> {
    s.encode_utf16()
        .chain(Some(0))
        .flat_map(u16::to_le_bytes)
        .collect()
}

/// Decode string data read from the registry.
///
/// The OS does not guarantee termination: one trailing NUL is dropped if present,
/// otherwise every unit read is kept. A dangling odd byte is ignored.
pub fn decode_sz(name: &str, bytes: &[u8]) -> Result<String> {
    let mut units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    if units.last() == Some(&0) {
        units.pop();
    }
    String::from_utf16(&units).map_err(|e| RegistryError::InvalidData {
        name: name.to_string(),
        reason: e.to_string(),
    })
}

pub fn decode_dword(name: &str, bytes: &[u8]) -> Result<u32> {
    let raw: [u8; 4] = bytes
        .get(..4)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| short_data(name, 4, bytes.len()))?;
    Ok(u32::from_le_bytes(raw))
}

pub fn decode_qword(name: &str, bytes: &[u8]) -> Result<u64> {
    let raw: [u8; 8] = bytes
        .get(..8)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| short_data(name, 8, bytes.len()))?;
    Ok(u64::from_le_bytes(raw))
}

fn short_data(name: &str, expected: usize, actual: usize) -> RegistryError {
    RegistryError::InvalidData {
        name: name.to_string(),
        reason: format!("expected {expected} bytes, got {actual}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tags() {
        for kind in [
            ValueKind::None,
            ValueKind::String,
            ValueKind::ExpandString,
            ValueKind::Binary,
            ValueKind::Dword,
            ValueKind::DwordBigEndian,
            ValueKind::Link,
            ValueKind::MultiString,
            ValueKind::Qword,
        ] {
            assert_eq!(ValueKind::from_raw(kind.as_raw()), kind);
        }
        assert_eq!(ValueKind::from_raw(8), ValueKind::Other(8));
        assert_eq!(ValueKind::Other(8).to_string(), "REG_UNKNOWN(8)");
    }

    #[test]
    fn test_decode_sz_trims_single_terminator() {
        let stored = encode_sz("Default");
        assert_eq!(stored.len(), 16);
        assert_eq!(decode_sz("", &stored).unwrap(), "Default");

        // Written without a terminator
        let raw: Vec<u8> = "abc".encode_utf16().flat_map(u16::to_le_bytes).collect();
        assert_eq!(decode_sz("", &raw).unwrap(), "abc");

        // Only the last NUL goes
        let mut doubled = encode_sz("x");
        doubled.extend_from_slice(&[0, 0]);
        assert_eq!(decode_sz("", &doubled).unwrap(), "x\0");
    }

    #[test]
    fn test_decode_sz_edge_cases() {
        assert_eq!(decode_sz("", &[]).unwrap(), "");
        assert_eq!(decode_sz("", &[0, 0]).unwrap(), "");
        assert_eq!(decode_sz("", &[b'A', 0, 0]).unwrap(), "A");

        let tricky = "jhihsihjo; ;oj9dn9u8y []\\;;lll[]]\\[;'.,.\\áýáýíwýžž+=éíáýýž;;```";
        assert_eq!(decode_sz("", &encode_sz(tricky)).unwrap(), tricky);

        let err = decode_sz("bad", &[0x00, 0xD8]).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidData { ref name, .. } if name == "bad"));
    }

    #[test]
    fn test_decode_dispatch() {
        assert_eq!(
            RegistryValue::decode("X", ValueKind::Dword, &(-61i32).to_le_bytes()).unwrap(),
            RegistryValue::I32(-61)
        );
        assert_eq!(
            RegistryValue::decode("X", ValueKind::Qword, &i64::MIN.to_le_bytes()).unwrap(),
            RegistryValue::I64(i64::MIN)
        );
        assert_eq!(
            RegistryValue::decode("X", ValueKind::ExpandString, &encode_sz("%TEMP%")).unwrap(),
            RegistryValue::Text("%TEMP%".into())
        );
        assert_eq!(
            RegistryValue::decode("X", ValueKind::Binary, &[1, 2, 255]).unwrap(),
            RegistryValue::Bytes(vec![1, 2, 255])
        );
        assert_eq!(
            RegistryValue::decode("X", ValueKind::MultiString, &[0, 0, 0, 0]).unwrap(),
            RegistryValue::Absent
        );
        assert!(RegistryValue::decode("X", ValueKind::Dword, &[1, 2]).is_err());
    }

    #[test]
    fn test_encode() {
        assert_eq!(RegistryValue::Absent.encode(), None);
        assert_eq!(
            RegistryValue::Bool(true).encode(),
            Some((ValueKind::Dword, vec![1, 0, 0, 0]))
        );
        assert_eq!(
            RegistryValue::I32(-1).encode(),
            Some((ValueKind::Dword, vec![0xFF; 4]))
        );
        assert_eq!(
            RegistryValue::from("").encode(),
            Some((ValueKind::String, vec![0, 0]))
        );
    }

    #[test]
    fn test_accessors() {
        let value = RegistryValue::from(7i32);
        assert!(value.is_number());
        assert_eq!(value.as_i32(), Some(7));
        assert_eq!(value.as_i64(), Some(7));
        assert_eq!(value.as_str(), None);
        assert!(RegistryValue::default().is_absent());
        assert_eq!(RegistryValue::from(false).as_bool(), Some(false));
        assert_eq!(RegistryValue::from(vec![9u8]).as_bytes(), Some(&[9u8][..]));
    }

    #[test]
    fn test_serde_shape() {
        let json = serde_json::to_string(&RegistryValue::I64(5)).unwrap();
        assert_eq!(json, r#"{"type":"I64","data":5}"#);
        let back: RegistryValue = serde_json::from_str(r#"{"type":"Text","data":"hi"}"#).unwrap();
        assert_eq!(back, RegistryValue::Text("hi".into()));
        let absent = serde_json::to_string(&RegistryValue::Absent).unwrap();
        assert_eq!(absent, r#"{"type":"Absent"}"#);
    }
}
