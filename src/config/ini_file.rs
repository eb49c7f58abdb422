//! Loading [`KinesisOptions`] from INI files.
//!
//! Each output is described by one section; keys are the option names
//! accepted by [`KinesisOptions::set`].
//!
//! ```ini
//! [kinesis]
//! aws_key_id = AKIA...
//! aws_sec_key = ...
//! region = us-east-1
//! stream_name = events
//! partition_key = user_id
//! ```

use std::path::Path;

use ini::Ini;

use super::{ConfigError, KinesisOptions};

impl KinesisOptions {
    /// Read options from `section` of the INI file at `path`.
    pub fn from_ini_file(path: impl AsRef<Path>, section: &str) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let ini = Ini::load_from_file(path).map_err(|err| ConfigError::Ini {
            source_name: path.display().to_string(),
            message: err.to_string(),
        })?;
        Self::from_ini(&ini, section)
    }

    /// Read options from `section` of INI-formatted `text`.
    pub fn from_ini_str(text: &str, section: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text).map_err(|err| ConfigError::Ini {
            source_name: "<string>".to_owned(),
            message: err.to_string(),
        })?;
        Self::from_ini(&ini, section)
    }

    fn from_ini(ini: &Ini, section: &str) -> Result<Self, ConfigError> {
        let properties = ini
            .section(Some(section))
            .ok_or_else(|| ConfigError::MissingSection(section.to_owned()))?;
        Self::from_pairs(properties.iter())
    }
}
