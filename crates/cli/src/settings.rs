use std::fs;
use std::path::{Path, PathBuf};

use robocam_core::shared::camera_settings::CameraSettings;

pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("RoboCam").join("settings.json"))
}

/// Loads settings from `explicit`, or from the per-user config file.
///
/// A missing or unreadable file falls back to defaults.
pub fn load(explicit: Option<&Path>) -> CameraSettings {
    let Some(path) = explicit.map(Path::to_path_buf).or_else(config_path) else {
        return CameraSettings::default();
    };
    match fs::read_to_string(&path) {
        Ok(json) => match serde_json::from_str(&json) {
            Ok(settings) => {
                log::info!("Loaded settings from {}", path.display());
                settings
            }
            Err(e) => {
                log::warn!("Ignoring invalid settings file {}: {e}", path.display());
                CameraSettings::default()
            }
        },
        Err(e) => {
            if explicit.is_some() {
                log::warn!("Cannot read {}: {e}; using defaults", path.display());
            }
            CameraSettings::default()
        }
    }
}

pub fn validate(settings: &CameraSettings) -> Result<(), Box<dyn std::error::Error>> {
    if !(1..=100).contains(&settings.image_quality) {
        return Err(format!(
            "Image quality must be between 1 and 100, got {}",
            settings.image_quality
        )
        .into());
    }
    if !(1..=50).contains(&settings.center_threshold_percent) {
        return Err(format!(
            "Center threshold must be between 1 and 50 percent, got {}",
            settings.center_threshold_percent
        )
        .into());
    }
    if !(0.0..=1.0).contains(&settings.detection_confidence) {
        return Err(format!(
            "Detection confidence must be between 0.0 and 1.0, got {}",
            settings.detection_confidence
        )
        .into());
    }
    if !settings.capture_interval_secs.is_finite() || settings.capture_interval_secs < 0.0 {
        return Err(format!(
            "Capture interval must be a non-negative number of seconds, got {}",
            settings.capture_interval_secs
        )
        .into());
    }
    if !settings.stop_timeout_secs.is_finite() || settings.stop_timeout_secs < 0.0 {
        return Err(format!(
            "Stop timeout must be a non-negative number of seconds, got {}",
            settings.stop_timeout_secs
        )
        .into());
    }
    if settings.image_width == 0 || settings.image_height == 0 {
        return Err(format!(
            "Image size must be non-zero, got {}x{}",
            settings.image_width, settings.image_height
        )
        .into());
    }
    if settings.device.trim().is_empty() {
        return Err("Camera device must not be empty".into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"device": "/dev/video3", "capture_interval_secs": 2.5}"#).unwrap();

        let settings = load(Some(&path));
        assert_eq!(settings.device, "/dev/video3");
        assert_eq!(settings.capture_interval_secs, 2.5);
        assert_eq!(settings.image_quality, 95);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load(Some(&dir.path().join("absent.json")));
        assert_eq!(settings, CameraSettings::default());
    }

    #[test]
    fn test_load_invalid_json_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{not json").unwrap();
        assert_eq!(load(Some(&path)), CameraSettings::default());
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate(&CameraSettings::default()).is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range_values() {
        let cases = [
            CameraSettings {
                image_quality: 0,
                ..CameraSettings::default()
            },
            CameraSettings {
                center_threshold_percent: 51,
                ..CameraSettings::default()
            },
            CameraSettings {
                detection_confidence: 1.5,
                ..CameraSettings::default()
            },
            CameraSettings {
                capture_interval_secs: -1.0,
                ..CameraSettings::default()
            },
            CameraSettings {
                image_width: 0,
                ..CameraSettings::default()
            },
            CameraSettings {
                device: " ".into(),
                ..CameraSettings::default()
            },
        ];
        for settings in &cases {
            assert!(validate(settings).is_err(), "accepted {settings:?}");
        }
    }
}
