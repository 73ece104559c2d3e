//! WiFi credential persistence.
//!
//! The record is a single line of text, `{"ssid":"<name>","pass":"<secret>"}`,
//! overwritten in full on every save. Values are written verbatim: a `"` inside
//! a value produces a record that will not parse back.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::form::extract_json_string_field;

/// Longest stored network name, in bytes.
pub const SSID_MAX_LEN: usize = 31;
/// Longest stored passphrase, in bytes.
pub const PASS_MAX_LEN: usize = 63;

/// Upper bound on the bytes read back from storage.
const RECORD_CAPACITY: usize = 127;

#[derive(Debug)]
pub enum StoreError {
    /// No credential file exists.
    NotFound,
    /// The file exists but does not hold a usable record.
    Corrupt,
    Io(std::io::Error),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::NotFound => write!(f, "no saved credentials"),
            StoreError::Corrupt => write!(f, "saved credentials are corrupt"),
            StoreError::Io(e) => write!(f, "storage error: {}", e),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::NotFound {
            StoreError::NotFound
        } else {
            StoreError::Io(e)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    ssid: heapless::String<SSID_MAX_LEN>,
    pass: heapless::String<PASS_MAX_LEN>,
}

impl Credentials {
    /// Builds a record, truncating each value to its bound.
    pub fn new(ssid: &str, pass: &str) -> Self {
        Self {
            ssid: truncated(ssid),
            pass: truncated(pass),
        }
    }

    pub fn ssid(&self) -> &str {
        &self.ssid
    }

    pub fn pass(&self) -> &str {
        &self.pass
    }

    pub fn to_record(&self) -> String {
        format!("{{\"ssid\":\"{}\",\"pass\":\"{}\"}}", self.ssid, self.pass)
    }

    /// Parses a stored record. `ssid` is required, a missing `pass` means an
    /// open network.
    pub fn from_record(text: &str) -> Result<Self, StoreError> {
        let ssid = extract_json_string_field(text, "ssid").ok_or(StoreError::Corrupt)?;
        let pass = if text.contains("\"pass\"") {
            extract_json_string_field(text, "pass").ok_or(StoreError::Corrupt)?
        } else {
            ""
        };
        Ok(Self::new(ssid, pass))
    }
}

/// Longest prefix of `src` that fits in `N` bytes without splitting a char.
pub fn truncated<const N: usize>(src: &str) -> heapless::String<N> {
    let mut out = heapless::String::new();
    for c in src.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

/// Byte-oriented file access on the mounted persistent storage.
pub trait Storage {
    /// Reads up to `buf.len()` bytes of `name`.
    fn read(&self, name: &str, buf: &mut [u8]) -> std::io::Result<usize>;
    /// Replaces the whole content of `name`.
    fn write(&mut self, name: &str, data: &[u8]) -> std::io::Result<()>;
}

/// Files under a directory of the host filesystem or of a mounted VFS partition.
#[derive(Debug, Clone)]
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    /// Uses `root` as the storage root, creating it when missing.
    pub fn mount(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        log::info!("Storage mounted at {}", root.display());
        Ok(Self { root })
    }

    /// Uses a root that is already mounted, such as a flat SPIFFS partition
    /// where directories cannot be created.
    pub fn open(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        log::info!("Storage opened at {}", root.display());
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Storage for FsStorage {
    fn read(&self, name: &str, buf: &mut [u8]) -> std::io::Result<usize> {
        let file = std::fs::File::open(self.root.join(name))?;
        let mut limited = file.take(buf.len() as u64);
        let mut filled = 0;
        loop {
            let n = limited.read(&mut buf[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        Ok(filled)
    }

    fn write(&mut self, name: &str, data: &[u8]) -> std::io::Result<()> {
        let mut file = std::fs::File::create(self.root.join(name))?;
        file.write_all(data)?;
        file.flush()
    }
}

pub struct CredentialStore<S> {
    storage: S,
    file: String,
}

impl<S: Storage> CredentialStore<S> {
    pub fn new(storage: S, file: &str) -> Self {
        Self {
            storage,
            file: file.to_string(),
        }
    }

    pub fn load(&self) -> Result<Credentials, StoreError> {
        let mut buf = [0u8; RECORD_CAPACITY];
        let len = self.storage.read(&self.file, &mut buf)?;
        let text = std::str::from_utf8(&buf[..len]).map_err(|_| StoreError::Corrupt)?;
        Credentials::from_record(text)
    }

    pub fn save(&mut self, creds: &Credentials) -> Result<(), StoreError> {
        self.storage
            .write(&self.file, creds.to_record().as_bytes())
            .map_err(StoreError::Io)
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MemStorage {
        files: HashMap<String, Vec<u8>>,
    }

    impl Storage for MemStorage {
        fn read(&self, name: &str, buf: &mut [u8]) -> std::io::Result<usize> {
            let data = self
                .files
                .get(name)
                .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotFound))?;
            let n = data.len().min(buf.len());
            buf[..n].copy_from_slice(&data[..n]);
            Ok(n)
        }

        fn write(&mut self, name: &str, data: &[u8]) -> std::io::Result<()> {
            self.files.insert(name.to_string(), data.to_vec());
            Ok(())
        }
    }

    fn store_with(record: Option<&str>) -> CredentialStore<MemStorage> {
        let mut storage = MemStorage::default();
        if let Some(record) = record {
            storage
                .files
                .insert("wifi.json".to_string(), record.as_bytes().to_vec());
        }
        CredentialStore::new(storage, "wifi.json")
    }

    #[test]
    fn test_record_format() {
        let creds = Credentials::new("Home", "hunter22");
        assert_eq!(creds.to_record(), r#"{"ssid":"Home","pass":"hunter22"}"#);
    }

    #[test]
    fn test_load_missing_file() {
        let store = store_with(None);
        assert!(matches!(store.load(), Err(StoreError::NotFound)));
    }

    #[test]
    fn test_load_corrupt() {
        assert!(matches!(
            store_with(Some("garbage")).load(),
            Err(StoreError::Corrupt)
        ));
        assert!(matches!(
            store_with(Some(r#"{"ssid":"Home","pass":}"#)).load(),
            Err(StoreError::Corrupt)
        ));

        let mut storage = MemStorage::default();
        storage
            .files
            .insert("wifi.json".to_string(), vec![b'{', 0xff, 0xfe, b'}']);
        let store = CredentialStore::new(storage, "wifi.json");
        assert!(matches!(store.load(), Err(StoreError::Corrupt)));
    }

    #[test]
    fn test_load_without_pass_is_open_network() {
        let creds = store_with(Some(r#"{"ssid":"Cafe"}"#)).load().unwrap();
        assert_eq!(creds.ssid(), "Cafe");
        assert_eq!(creds.pass(), "");
    }

    #[test]
    fn test_save_then_load() {
        let mut store = store_with(None);
        let creds = Credentials::new("My Net", "p@ss w0rd&more");
        store.save(&creds).unwrap();
        assert_eq!(store.load().unwrap(), creds);

        // saves replace the whole record
        let other = Credentials::new("B", "");
        store.save(&other).unwrap();
        assert_eq!(store.load().unwrap(), other);
    }

    #[test]
    fn test_values_are_truncated() {
        let long_ssid = "s".repeat(40);
        let long_pass = "p".repeat(80);
        let creds = Credentials::new(&long_ssid, &long_pass);
        assert_eq!(creds.ssid().len(), SSID_MAX_LEN);
        assert_eq!(creds.pass().len(), PASS_MAX_LEN);

        let mut store = store_with(None);
        store.save(&creds).unwrap();
        assert_eq!(store.load().unwrap(), creds);
    }

    #[test]
    fn test_truncation_keeps_char_boundaries() {
        // 15 two-byte chars = 30 bytes, the 16th would overflow 31
        let name = "é".repeat(16);
        let creds = Credentials::new(&name, "");
        assert_eq!(creds.ssid(), "é".repeat(15));
    }

    #[test]
    fn test_quote_in_value_corrupts_record() {
        let mut store = store_with(None);
        store.save(&Credentials::new("Bad\"Name", "x")).unwrap();
        // the parser stops at the embedded quote
        assert_eq!(store.load().unwrap().ssid(), "Bad");
    }

    #[test]
    fn test_fs_storage() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsStorage::mount(dir.path().join("qspi")).unwrap();
        let mut store = CredentialStore::new(storage, "wifi.json");
        assert!(matches!(store.load(), Err(StoreError::NotFound)));

        let creds = Credentials::new("Lab", "12345678");
        store.save(&creds).unwrap();
        assert_eq!(store.load().unwrap(), creds);

        let raw = std::fs::read_to_string(store.storage().root().join("wifi.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["ssid"], "Lab");
        assert_eq!(value["pass"], "12345678");
    }

    #[test]
    fn test_fs_storage_open_leaves_root_alone() {
        let dir = tempfile::tempdir().unwrap();

        let missing = dir.path().join("spiffs");
        let store = CredentialStore::new(FsStorage::open(&missing), "wifi.json");
        assert!(!missing.exists());
        assert!(matches!(store.load(), Err(StoreError::NotFound)));

        // an already mounted root is used as-is
        let mut store = CredentialStore::new(FsStorage::open(dir.path()), "wifi.json");
        store.save(&Credentials::new("Lab", "")).unwrap();
        assert!(dir.path().join("wifi.json").is_file());
        assert_eq!(store.load().unwrap().ssid(), "Lab");
    }
}
