//! Optional YAML config file and the style layering rules.
//!
//! Layers are applied in this order, later ones winning field by field:
//! built-in defaults, the file's top-level keys, the selected message type
//! (built-in scheme first, then the file's definition of the same name) and
//! finally the command-line overrides.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use style_model::{Placement, StyleConfig, StyleOverrides, builtin_type};
use tracing::debug;

use crate::error::Error;

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case", default)]
pub struct FileConfig {
    /// Top-level style keys apply to every message type.
    #[serde(flatten)]
    pub style: StyleOverrides,
    /// Named message types, selectable with `--type`.
    pub types: BTreeMap<String, StyleOverrides>,
    /// Auto-dismiss delay, e.g. `5s` or `1m 30s`. Zero disables it.
    #[serde(with = "humantime_serde")]
    pub close_timeout: Option<Duration>,
    pub close_timeout_cancel: Option<bool>,
    pub exclusive_zone: Option<bool>,
}

impl FileConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, Error> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config = Self::from_yaml_str(&raw)?;
        debug!(path = %path.display(), types = config.types.len(), "loaded config file");
        Ok(config)
    }

    /// Overrides for message type `name`: the built-in scheme, if any, with
    /// the file's definition layered on top.
    pub fn type_overrides(&self, name: &str) -> Result<StyleOverrides, Error> {
        match (builtin_type(name), self.types.get(name)) {
            (Some(builtin), Some(custom)) => Ok(builtin.merged(custom)),
            (Some(builtin), None) => Ok(builtin),
            (None, Some(custom)) => Ok(custom.clone()),
            (None, None) => Err(Error::UnknownType(name.to_string())),
        }
    }

    /// Stacks every layer and validates the result.
    pub fn resolve_style(
        &self,
        type_name: &str,
        args: &StyleOverrides,
    ) -> Result<(StyleConfig, Placement), Error> {
        let mut layers = self.style.clone();
        layers.merge(&self.type_overrides(type_name)?);
        layers.merge(args);
        layers.resolve().map_err(|err| Error::invalid("style", err))
    }
}
