use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use log::info;
use once_cell::sync::OnceCell;

use super::settings::AppSettings;

pub const SLOT_FILE_NAME: &str = "data.json";
pub const EXPORT_FILE_NAME: &str = "tree.json";

static SETTINGS_OVERRIDE: OnceCell<AppSettings> = OnceCell::new();

pub fn set_settings_override(settings: AppSettings) {
    let _ = SETTINGS_OVERRIDE.set(settings);
}

pub fn effective_settings() -> AppSettings {
    // If an override is set (e.g. from main.rs), use it.
    if let Some(settings) = SETTINGS_OVERRIDE.get() {
        return settings.clone();
    }
    // Load settings if present; else use defaults
    AppSettings::load().unwrap_or_default()
}

/// The single named slot the editor saves into and loads from at startup.
#[derive(Debug, Clone)]
pub struct Slot {
    dir: PathBuf,
}

impl Slot {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn from_settings(settings: &AppSettings) -> Self {
        Self::new(settings.autosave_dir())
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(SLOT_FILE_NAME)
    }

    pub fn exists(&self) -> bool {
        self.path().exists()
    }

    pub fn save(&self, blob: &str) -> anyhow::Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path();
        atomic_write(&path, blob.as_bytes())?;
        info!("saved document to {}", path.display());
        Ok(path)
    }

    // Ok(None) means nothing has been saved yet.
    pub fn load(&self) -> anyhow::Result<Option<String>> {
        let path = self.path();
        if !path.exists() {
            return Ok(None);
        }
        read_to_string(&path).map(Some)
    }
}

fn atomic_write(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let tmp_path = path.with_extension("json.tmp");
    {
        let mut f = File::create(&tmp_path)?;
        f.write_all(data)?;
        f.flush()?;
    }
    fs::rename(tmp_path, path)?;
    Ok(())
}

pub fn export_path(settings: &AppSettings) -> PathBuf {
    settings.export_dir().join(EXPORT_FILE_NAME)
}

pub fn write_export(path: &Path, text: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() { fs::create_dir_all(parent)?; }
    atomic_write(path, format!("{text}\n").as_bytes())?;
    info!("exported document to {}", path.display());
    Ok(())
}

pub fn read_to_string(path: &Path) -> anyhow::Result<String> {
    let mut f = File::open(path)?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let slot = Slot::new(dir.path().join("state"));
        assert!(slot.load().unwrap().is_none());
        let path = slot.save("[]").unwrap();
        assert!(path.ends_with(SLOT_FILE_NAME));
        assert_eq!(slot.load().unwrap().as_deref(), Some("[]"));
        // Overwrites in place, no temp file left behind.
        slot.save("[1]").unwrap();
        assert_eq!(slot.load().unwrap().as_deref(), Some("[1]"));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn export_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(EXPORT_FILE_NAME);
        write_export(&path, "[]").unwrap();
        assert_eq!(read_to_string(&path).unwrap(), "[]\n");
    }

    #[test]
    fn export_is_written_in_one_step() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(EXPORT_FILE_NAME);
        write_export(&path, "[1]").unwrap();
        write_export(&path, "[2]").unwrap();
        assert_eq!(read_to_string(&path).unwrap(), "[2]\n");
        assert!(!path.with_extension("json.tmp").exists());

        // A write that cannot happen is reported, not swallowed.
        let blocker = dir.path().join("not_a_dir");
        std::fs::write(&blocker, "x").unwrap();
        assert!(write_export(&blocker.join(EXPORT_FILE_NAME), "[]").is_err());
    }
}
