use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::graph_utils::graph::DEFAULT_NODE_SPACING;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSettings {
    // If None, use OS default autosave directory
    #[serde(default)]
    pub autosave_override: Option<PathBuf>,
    // If None, exports go to the OS temporary directory
    #[serde(default)]
    pub export_override: Option<PathBuf>,
    // Vertical gap between a parent and a freshly added child
    #[serde(default = "AppSettings::default_spacing")]
    pub node_spacing: f64,
    // Multiplier applied to pointer movement while panning
    #[serde(default = "AppSettings::default_pan_speed")]
    pub pan_speed: f64,
    #[serde(default = "AppSettings::default_save_on_exit")]
    pub save_on_exit: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            autosave_override: None,
            export_override: None,
            node_spacing: Self::default_spacing(),
            pan_speed: Self::default_pan_speed(),
            save_on_exit: Self::default_save_on_exit(),
        }
    }
}

impl AppSettings {
    fn config_dir() -> PathBuf {
        // Cross-platform user config dir
        #[cfg(target_os = "macos")]
        {
            // ~/Library/Application Support/Mind-Loom
            let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("~"));
            return home.join("Library").join("Application Support").join("Mind-Loom");
        }
        #[cfg(target_os = "windows")]
        {
            // %APPDATA%\Mind-Loom
            if let Ok(appdata) = std::env::var("APPDATA") {
                return PathBuf::from(appdata).join("Mind-Loom");
            }
            return PathBuf::from("Mind-Loom");
        }
        #[cfg(all(unix, not(target_os = "macos")))]
        {
            // $XDG_CONFIG_HOME/Mind-Loom or ~/.config/Mind-Loom
            if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
                return PathBuf::from(xdg).join("Mind-Loom");
            }
            let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("~"));
            return home.join(".config").join("Mind-Loom");
        }
    }

    fn autosave_default_dir() -> PathBuf {
        #[cfg(target_os = "macos")]
        {
            let tmp = std::env::var_os("TMPDIR").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("/tmp"));
            return tmp.join("Mind-Loom");
        }
        #[cfg(target_os = "windows")]
        {
            // %LOCALAPPDATA%\Mind-Loom\Autosave else TEMP
            if let Ok(local) = std::env::var("LOCALAPPDATA") {
                return PathBuf::from(local).join("Mind-Loom").join("Autosave");
            }
            if let Ok(temp) = std::env::var("TEMP") {
                return PathBuf::from(temp).join("Mind-Loom");
            }
            return PathBuf::from("Mind-Loom");
        }
        #[cfg(all(unix, not(target_os = "macos")))]
        {
            // $XDG_STATE_HOME/mind-loom or ~/.local/state/mind-loom, else /tmp/Mind-Loom
            if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
                return PathBuf::from(xdg).join("mind-loom");
            }
            if let Ok(home) = std::env::var("HOME") {
                return PathBuf::from(home).join(".local").join("state").join("mind-loom");
            }
            return PathBuf::from("/tmp").join("Mind-Loom");
        }
    }

    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_dir().join("settings.json"))
    }

    // A missing file means defaults; a present but unreadable one is an error.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let mut f = std::fs::File::open(path)?;
        let mut s = String::new();
        f.read_to_string(&mut s)?;
        let v: Self = serde_json::from_str(&s)?;
        Ok(v)
    }

    pub fn autosave_dir(&self) -> PathBuf {
        if let Some(p) = &self.autosave_override { return p.clone(); }
        Self::autosave_default_dir()
    }

    /// Default export directory when no override is set: OS temporary directory.
    /// Example: {temp_dir}/Mind-Loom/exports
    pub fn export_default_dir() -> PathBuf {
        let mut p = std::env::temp_dir();
        p.push("Mind-Loom");
        p.push("exports");
        p
    }

    pub fn export_dir(&self) -> PathBuf {
        if let Some(p) = &self.export_override { return p.clone(); }
        Self::export_default_dir()
    }

    pub(crate) fn default_spacing() -> f64 { DEFAULT_NODE_SPACING }
    pub(crate) fn default_pan_speed() -> f64 { 1.5 }
    pub(crate) fn default_save_on_exit() -> bool { true }
}
