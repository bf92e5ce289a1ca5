//! Application settings persisted across sessions as a `key=value` file.
//!
//! Location:
//!   Linux:    `$XDG_CONFIG_HOME/masktag/masktag_settings.cfg` (or `~/.config`)
//!   Windows:  `%APPDATA%\MaskTag\masktag_settings.cfg`
//!   macOS:    `~/Library/Application Support/MaskTag/masktag_settings.cfg`
//!
//! Unknown keys are ignored on load so older builds can read newer files.

use std::path::PathBuf;

#[derive(Clone, Debug, PartialEq)]
pub struct AppSettings {
    /// Project directory reopened by default in the chooser dialog.
    pub last_project_directory: Option<PathBuf>,
    /// Pressure multiplier for the stroke width curve.
    pub pressure_gain: f32,
    /// Pressure substituted for devices without pressure reporting.
    pub fallback_pressure: f32,
    /// Magenta overlay strength in composite view.
    pub overlay_alpha: u8,
    /// Start in mask-only view.
    pub mask_only: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            last_project_directory: None,
            pressure_gain: 10.0,
            fallback_pressure: 0.5,
            overlay_alpha: 160,
            mask_only: false,
        }
    }
}

impl AppSettings {
    pub(crate) fn settings_path() -> Option<PathBuf> {
        #[cfg(target_os = "linux")]
        {
            let config_dir = std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| {
                    let home = std::env::var("HOME").unwrap_or_else(|_| "~".to_string());
                    PathBuf::from(home).join(".config")
                })
                .join("masktag");
            let _ = std::fs::create_dir_all(&config_dir);
            return Some(config_dir.join("masktag_settings.cfg"));
        }
        #[cfg(target_os = "windows")]
        {
            let appdata = std::env::var("APPDATA")
                .or_else(|_| std::env::var("USERPROFILE"))
                .ok()?;
            let config_dir = PathBuf::from(appdata).join("MaskTag");
            let _ = std::fs::create_dir_all(&config_dir);
            return Some(config_dir.join("masktag_settings.cfg"));
        }
        #[cfg(target_os = "macos")]
        {
            let home = std::env::var("HOME").ok()?;
            let config_dir = PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("MaskTag");
            let _ = std::fs::create_dir_all(&config_dir);
            return Some(config_dir.join("masktag_settings.cfg"));
        }
        #[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
        {
            std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|d| d.join("masktag_settings.cfg")))
        }
    }

    /// Load from disk, falling back to defaults for anything missing.
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else {
            return Self::default();
        };
        match std::fs::read_to_string(&path) {
            Ok(content) => Self::parse(&content),
            Err(_) => Self::default(),
        }
    }

    /// Save to disk. Failures are logged, never fatal.
    pub fn save(&self) {
        let Some(path) = Self::settings_path() else {
            return;
        };
        if let Err(e) = std::fs::write(&path, self.serialize()) {
            crate::log_warn!("failed to save settings to {:?}: {}", path, e);
        }
    }

    pub(crate) fn parse(content: &str) -> Self {
        let mut settings = Self::default();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim();
            match key.trim() {
                "last_project_directory" => {
                    if !value.is_empty() {
                        settings.last_project_directory = Some(PathBuf::from(value));
                    }
                }
                "pressure_gain" => {
                    if let Ok(v) = value.parse::<f32>() {
                        settings.pressure_gain = v.clamp(1.0, 100.0);
                    }
                }
                "fallback_pressure" => {
                    if let Ok(v) = value.parse::<f32>() {
                        settings.fallback_pressure = v.clamp(0.0, 1.0);
                    }
                }
                "overlay_alpha" => {
                    if let Ok(v) = value.parse::<u8>() {
                        settings.overlay_alpha = v;
                    }
                }
                "mask_only" => {
                    settings.mask_only = value == "true";
                }
                _ => {} // unknown key: ignore
            }
        }
        settings
    }

    pub(crate) fn serialize(&self) -> String {
        format!(
            "last_project_directory={}\n\
             pressure_gain={}\n\
             fallback_pressure={}\n\
             overlay_alpha={}\n\
             mask_only={}\n",
            self.last_project_directory
                .as_deref()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default(),
            self.pressure_gain,
            self.fallback_pressure,
            self.overlay_alpha,
            self.mask_only,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialize_parse_round_trip() {
        let settings = AppSettings {
            last_project_directory: Some(PathBuf::from("/data/shots")),
            pressure_gain: 14.0,
            fallback_pressure: 0.35,
            overlay_alpha: 200,
            mask_only: true,
        };
        assert_eq!(AppSettings::parse(&settings.serialize()), settings);
    }

    #[test]
    fn empty_directory_round_trips_to_none() {
        let settings = AppSettings::default();
        let parsed = AppSettings::parse(&settings.serialize());
        assert_eq!(parsed.last_project_directory, None);
    }

    #[test]
    fn unknown_keys_and_garbage_are_ignored() {
        let parsed = AppSettings::parse(
            "# comment\n\
             future_key=whatever\n\
             not a key value line\n\
             pressure_gain=12\n",
        );
        assert_eq!(parsed.pressure_gain, 12.0);
        assert_eq!(parsed.overlay_alpha, AppSettings::default().overlay_alpha);
    }

    #[test]
    fn out_of_range_values_clamp() {
        let parsed = AppSettings::parse("fallback_pressure=7.5\npressure_gain=0.1\n");
        assert_eq!(parsed.fallback_pressure, 1.0);
        assert_eq!(parsed.pressure_gain, 1.0);
    }
}
