// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use alloc::{string::ToString, vec, vec::Vec};

use serde::Deserialize;

use crate::error::{MarkingError, Result};
use crate::program::SubsetMode;

/// Configuration of a marking run.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct MarkingOptions {
    /// Mode of entities with no annotation anywhere in their scope chain.
    /// `None` excludes offending entities without reporting.
    pub default_mode: Option<SubsetMode>,
    pub max_integer_bits: u32,
    pub max_modulus_bits: u32,
    pub supported_float_digits: Vec<u32>,
    pub max_array_dimensions: usize,
    /// Report unknown pragmas as violations instead of warnings.
    pub reject_unknown_pragmas: bool,
}

impl Default for MarkingOptions {
    fn default() -> Self {
        Self {
            default_mode: None,
            max_integer_bits: 128,
            max_modulus_bits: 128,
            supported_float_digits: vec![6, 15, 18],
            max_array_dimensions: 4,
            reject_unknown_pragmas: false,
        }
    }
}

impl MarkingOptions {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| MarkingError::Load {
            what: "options",
            message: e.to_string(),
        })
    }

    #[cfg(feature = "yaml")]
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| MarkingError::Load {
            what: "options",
            message: e.to_string(),
        })
    }

    pub fn with_default_mode(mut self, mode: SubsetMode) -> Self {
        self.default_mode = Some(mode);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_options_keep_defaults() {
        let options =
            MarkingOptions::from_json_str(r#"{ "default_mode": "on", "max_array_dimensions": 2 }"#)
                .unwrap();
        assert_eq!(options.default_mode, Some(SubsetMode::On));
        assert_eq!(options.max_array_dimensions, 2);
        assert_eq!(options.max_modulus_bits, 128);
        assert_eq!(options.supported_float_digits, vec![6, 15, 18]);
    }

    #[test]
    fn malformed_options_fail_to_load() {
        assert!(matches!(
            MarkingOptions::from_json_str("{ \"max_integer_bits\": \"many\" }"),
            Err(MarkingError::Load { .. })
        ));
    }
}
