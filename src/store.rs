use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::rc::Rc;

/// Minimal string key-value persistence. Writes are independent per key and
/// idempotent, so failures are logged and otherwise ignored.
pub trait KvStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str);
}

impl<S: KvStore + ?Sized> KvStore for Rc<RefCell<S>> {
    fn get(&self, key: &str) -> Option<String> {
        self.borrow().get(key)
    }

    fn set(&mut self, key: &str, value: &str) {
        self.borrow_mut().set(key, value)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    values: HashMap<String, String>,
}

/// Ron-file-backed store. The file is read once at open and rewritten on
/// every set.
pub struct FileStore {
    path: PathBuf,
    values: HashMap<String, String>,
}

impl FileStore {
    pub fn open(path: PathBuf) -> Self {
        let values = match fs::read_to_string(&path) {
            Ok(content) => match ron::from_str::<StoreFile>(&content) {
                Ok(file) => file.values,
                Err(e) => {
                    eprintln!("Failed to parse {}: {}", path.display(), e);
                    HashMap::new()
                }
            },
            // A missing file is the normal first run.
            Err(_) => HashMap::new(),
        };
        Self { path, values }
    }

    pub fn open_default() -> Option<Self> {
        profile_path().map(Self::open)
    }

    fn flush(&self) -> io::Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let config = ron::ser::PrettyConfig::new().indentor("  ".to_string());
        let file = StoreFile {
            values: self.values.clone(),
        };
        let content = ron::ser::to_string_pretty(&file, config)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(&self.path, content)
    }
}

impl KvStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
        if let Err(e) = self.flush() {
            eprintln!("Failed to write {}: {}", self.path.display(), e);
        }
    }
}

pub fn profile_path() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| {
        PathBuf::from(home)
            .join(".config")
            .join("relpitch")
            .join("profile.ron")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("relpitch_{}_{}", std::process::id(), name))
    }

    #[test]
    fn test_memory_store() {
        let mut store = MemoryStore::new();
        assert_eq!(store.get("missing"), None);
        store.set("lastDiff_Do4", "+10");
        assert_eq!(store.get("lastDiff_Do4"), Some("+10".to_string()));
        store.set("lastDiff_Do4", "-3");
        assert_eq!(store.get("lastDiff_Do4"), Some("-3".to_string()));
    }

    #[test]
    fn test_file_store_roundtrip() {
        let path = temp_file("roundtrip.ron");
        let _ = fs::remove_file(&path);

        let mut store = FileStore::open(path.clone());
        assert_eq!(store.get("timbre"), None);
        store.set("timbre", "fm-soft");
        store.set("lastDiff_Mi4", "+42");

        let reopened = FileStore::open(path.clone());
        assert_eq!(reopened.get("timbre"), Some("fm-soft".to_string()));
        assert_eq!(reopened.get("lastDiff_Mi4"), Some("+42".to_string()));

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_file_store_survives_garbage() {
        let path = temp_file("garbage.ron");
        fs::write(&path, "not ron at all {{{").unwrap();

        let store = FileStore::open(path.clone());
        assert_eq!(store.get("timbre"), None);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_shared_store_handle() {
        let shared = Rc::new(RefCell::new(MemoryStore::new()));
        let mut handle: Rc<RefCell<MemoryStore>> = Rc::clone(&shared);
        handle.set("timbre", "triangle");
        assert_eq!(shared.borrow().get("timbre"), Some("triangle".to_string()));
    }
}
