use log::warn;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ConsoleSelect {
    /// CGB when the cartridge header advertises it, DMG otherwise.
    #[default]
    Auto,
    Dmg,
    Cgb,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub console: ConsoleSelect,
    pub dmg_bootrom_path: Option<PathBuf>,
    pub cgb_bootrom_path: Option<PathBuf>,
    /// Bytes per line in `dump` output.
    pub dump_width: usize,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            console: ConsoleSelect::Auto,
            dmg_bootrom_path: None,
            cgb_bootrom_path: None,
            dump_width: 16,
        }
    }
}

impl ProbeConfig {
    pub fn bootrom_path(&self, cgb: bool) -> Option<&Path> {
        if cgb {
            self.cgb_bootrom_path.as_deref()
        } else {
            self.dmg_bootrom_path.as_deref()
        }
    }
}

pub fn default_config_path() -> PathBuf {
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("gbc-mmu").join("probe.toml");
    }

    if let Some(home) = std::env::var_os("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join("gbc-mmu")
            .join("probe.toml");
    }

    PathBuf::from("probe.toml")
}

/// Missing file means defaults; a malformed one is reported and ignored.
pub fn load_from_file(path: &Path) -> ProbeConfig {
    let text = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(_) => return ProbeConfig::default(),
    };

    match toml::from_str::<ProbeConfig>(&text) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!(
                "Failed to parse probe config {}: {e}; using defaults",
                path.display()
            );
            ProbeConfig::default()
        }
    }
}
