use std::path::{Path, PathBuf};

use keyring::Entry;
use log::{debug, warn};

const SERVICE: &str = "retroboard";
const USER: &str = "display_name";

/// Where the chosen display name is remembered between runs: the OS keyring,
/// plus a plain file when `KEYRING_FALLBACK=true`.
#[derive(Debug, Clone)]
pub struct NameStore {
    fallback_path: Option<PathBuf>,
    use_keyring: bool,
}

impl NameStore {
    pub fn from_env() -> Self {
        let allow_fallback = std::env::var("KEYRING_FALLBACK").unwrap_or_default() == "true";
        Self {
            fallback_path: allow_fallback.then(|| Path::new("data").join("display_name.txt")),
            use_keyring: true,
        }
    }

    /// File-only store, bypassing the keyring.
    pub fn file_only(path: impl Into<PathBuf>) -> Self {
        Self {
            fallback_path: Some(path.into()),
            use_keyring: false,
        }
    }

    pub fn save(&self, name: &str) -> anyhow::Result<()> {
        if self.use_keyring {
            match Entry::new(SERVICE, USER).set_password(name) {
                Ok(()) => return Ok(()),
                Err(e) => debug!("[SESSION_STORE] keyring unavailable: {}", e),
            }
        }
        match &self.fallback_path {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(path, name)?;
                warn!("[SESSION_STORE] Keyring unavailable, persisted display name to fallback file");
                Ok(())
            }
            None => Err(anyhow::anyhow!("keyring unavailable and file fallback disabled")),
        }
    }

    pub fn load(&self) -> Option<String> {
        if self.use_keyring {
            if let Ok(name) = Entry::new(SERVICE, USER).get_password() {
                if !name.trim().is_empty() {
                    return Some(name.trim().to_string());
                }
            }
        }
        let path = self.fallback_path.as_ref()?;
        let s = std::fs::read_to_string(path).ok()?;
        let name = s.trim();
        (!name.is_empty()).then(|| name.to_string())
    }

    pub fn clear(&self) -> anyhow::Result<()> {
        if self.use_keyring {
            let _ = Entry::new(SERVICE, USER).delete_password();
        }
        if let Some(path) = &self.fallback_path {
            if path.exists() {
                std::fs::remove_file(path)?;
            }
        }
        Ok(())
    }
}

pub fn save_display_name(name: &str) -> anyhow::Result<()> {
    NameStore::from_env().save(name)
}

pub fn load_display_name() -> Option<String> {
    NameStore::from_env().load()
}

pub fn clear_display_name() -> anyhow::Result<()> {
    NameStore::from_env().clear()
}
