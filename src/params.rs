//! # Parameter Store Module
//!
//! Key-value flags shared with the rest of the vehicle software.
//!
//! The on-disk store keeps one file per key inside a directory. Boolean
//! values are stored as `1` or `0`; a missing key reads as `false`.

use std::env;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::ParamsConfig;
use crate::error::{JoystickControlError, Result};

/// Set by the vehicle software while it is safe to take manual control.
pub const IS_OFFROAD: &str = "IsOffroad";

/// Tells the control stack to accept joystick commands.
pub const JOYSTICK_DEBUG_MODE: &str = "JoystickDebugMode";

/// Boolean flag storage.
#[cfg_attr(test, mockall::automock)]
pub trait ParamStore {
    /// Reads a boolean flag. Missing keys read as `false`.
    fn get_bool(&self, key: &str) -> Result<bool>;

    /// Writes a boolean flag.
    fn put_bool(&self, key: &str, value: bool) -> Result<()>;
}

/// File-per-key parameter store.
#[derive(Debug, Clone)]
pub struct FileParams {
    root: PathBuf,
}

impl FileParams {
    /// Opens the store rooted at `root`. The directory is created on the
    /// first write.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

impl ParamStore for FileParams {
    fn get_bool(&self, key: &str) -> Result<bool> {
        match fs::read(self.key_path(key)) {
            Ok(contents) => Ok(String::from_utf8_lossy(&contents).trim() == "1"),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn put_bool(&self, key: &str, value: bool) -> Result<()> {
        let path = self.key_path(key);
        fs::create_dir_all(&self.root)?;
        let tmp = self.root.join(format!(".tmp_{}", key));
        fs::write(&tmp, if value { "1" } else { "0" })?;
        fs::rename(&tmp, &path)?;
        debug!("Param {} = {}", key, value);
        Ok(())
    }
}

/// Checks that manual control may start.
///
/// Passes when the vehicle reports offroad, or when the bypass environment
/// variable is set (remote bridge setups have no local params).
///
/// # Errors
///
/// Returns `Precondition` if the vehicle is not offroad.
pub fn check_offroad(params: &dyn ParamStore, config: &ParamsConfig) -> Result<()> {
    let bypassed = !config.bypass_env.is_empty() && env::var_os(&config.bypass_env).is_some();
    check_offroad_with(params, bypassed)
}

fn check_offroad_with(params: &dyn ParamStore, bypassed: bool) -> Result<()> {
    if bypassed {
        info!("Offroad check bypassed");
        return Ok(());
    }

    if params.get_bool(IS_OFFROAD)? {
        Ok(())
    } else {
        Err(JoystickControlError::Precondition(
            "The car must be off before running joystick control.".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_key_reads_false() {
        let dir = tempdir().unwrap();
        let params = FileParams::new(dir.path());
        assert!(!params.get_bool(IS_OFFROAD).unwrap());
    }

    #[test]
    fn test_put_then_get() {
        let dir = tempdir().unwrap();
        let params = FileParams::new(dir.path());

        params.put_bool(JOYSTICK_DEBUG_MODE, true).unwrap();
        assert!(params.get_bool(JOYSTICK_DEBUG_MODE).unwrap());
        assert_eq!(fs::read_to_string(dir.path().join(JOYSTICK_DEBUG_MODE)).unwrap(), "1");

        params.put_bool(JOYSTICK_DEBUG_MODE, false).unwrap();
        assert!(!params.get_bool(JOYSTICK_DEBUG_MODE).unwrap());
    }

    #[test]
    fn test_put_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let params = FileParams::new(dir.path());
        params.put_bool(IS_OFFROAD, true).unwrap();

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from(IS_OFFROAD)]);
    }

    #[test]
    fn test_value_with_newline() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(IS_OFFROAD), "1\n").unwrap();
        let params = FileParams::new(dir.path());
        assert!(params.get_bool(IS_OFFROAD).unwrap());
    }

    #[test]
    fn test_put_creates_missing_dir() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("params").join("d");
        let params = FileParams::new(&root);

        params.put_bool(JOYSTICK_DEBUG_MODE, true).unwrap();
        assert!(params.get_bool(JOYSTICK_DEBUG_MODE).unwrap());
        assert_eq!(fs::read_to_string(root.join(JOYSTICK_DEBUG_MODE)).unwrap(), "1");
    }

    #[test]
    fn test_bypassed_gate_then_debug_flag_on_fresh_store() {
        let dir = tempdir().unwrap();
        let params = FileParams::new(dir.path().join("missing"));

        assert!(check_offroad_with(&params, true).is_ok());
        assert!(params.put_bool(JOYSTICK_DEBUG_MODE, true).is_ok());
    }

    #[test]
    fn test_put_fails_when_root_is_a_file() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("not-a-dir");
        fs::write(&file, "x").unwrap();

        let params = FileParams::new(&file);
        assert!(matches!(
            params.put_bool(JOYSTICK_DEBUG_MODE, true),
            Err(JoystickControlError::Io(_))
        ));
    }

    #[test]
    fn test_offroad_passes() {
        let mut params = MockParamStore::new();
        params
            .expect_get_bool()
            .withf(|key| key == IS_OFFROAD)
            .times(1)
            .returning(|_| Ok(true));
        assert!(check_offroad_with(&params, false).is_ok());
    }

    #[test]
    fn test_onroad_fails() {
        let mut params = MockParamStore::new();
        params.expect_get_bool().returning(|_| Ok(false));
        let result = check_offroad_with(&params, false);
        assert!(matches!(result, Err(JoystickControlError::Precondition(_))));
    }

    #[test]
    fn test_bypass_skips_store() {
        let mut params = MockParamStore::new();
        params.expect_get_bool().never();
        assert!(check_offroad_with(&params, true).is_ok());
    }

    #[test]
    fn test_check_offroad_reads_file_store() {
        let dir = tempdir().unwrap();
        let params = FileParams::new(dir.path());
        let config = ParamsConfig {
            dir: dir.path().to_string_lossy().to_string(),
            bypass_env: String::new(),
        };

        assert!(check_offroad(&params, &config).is_err());
        params.put_bool(IS_OFFROAD, true).unwrap();
        assert!(check_offroad(&params, &config).is_ok());
    }
}
