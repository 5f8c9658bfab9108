//! Explicit generator configuration, validated once at startup.
//!
//! Replaces a dynamic property-bag style of configuration: every recognized
//! option is a typed field, unknown keys are rejected at load time, and
//! anything inconsistent fails before the pipeline starts. The wire names
//! (`outputDirectory`, `apiSpecFile`, …) match what the build integration
//! passes in.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::GenError;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Destination for committed generated files.
    #[serde(default)]
    pub output_directory: PathBuf,

    /// Local spec document. Wins over `api_spec_download_url` when both are
    /// set.
    #[serde(default)]
    pub api_spec_file: Option<PathBuf>,

    /// Remote spec source. Fetching is the caller's job, not the generator's.
    #[serde(default)]
    pub api_spec_download_url: Option<String>,

    /// Appended to every synthesized type's base identifier before casing
    /// normalization and collision checking.
    #[serde(default)]
    pub generator_suffix: String,

    /// Allow-list of root schema names. Empty means "everything reachable".
    #[serde(default)]
    pub includes: Vec<String>,
}

/// Where the raw document bytes come from. Local file takes precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecSource<'a> {
    File(&'a Path),
    Download(&'a str),
}

impl GeneratorConfig {
    /// Load from a JSON or YAML configuration file. Callers validate for
    /// their own mode afterwards (`validate` or `validate_for_check`).
    pub fn from_file(path: &Path) -> Result<Self, GenError> {
        let bytes = std::fs::read(path).map_err(|e| GenError::Config {
            detail: format!("failed to read config file {}: {e}", path.display()),
        })?;
        let first = bytes.iter().copied().find(|b| !b.is_ascii_whitespace());
        let config: GeneratorConfig = if first == Some(b'{') {
            serde_json::from_slice(&bytes).map_err(|e| GenError::Config {
                detail: format!("invalid config file {}: {e}", path.display()),
            })?
        } else {
            serde_yaml::from_slice(&bytes).map_err(|e| GenError::Config {
                detail: format!("invalid config file {}: {e}", path.display()),
            })?
        };
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), GenError> {
        if self.output_directory.as_os_str().is_empty() {
            return Err(GenError::Config {
                detail: "output directory is required".into(),
            });
        }
        self.validate_for_check()
    }

    /// Check-style runs never write, so only a spec source is required.
    pub fn validate_for_check(&self) -> Result<(), GenError> {
        self.spec_source().map(|_| ())
    }

    pub fn spec_source(&self) -> Result<SpecSource<'_>, GenError> {
        if let Some(file) = self.api_spec_file.as_deref() {
            return Ok(SpecSource::File(file));
        }
        if let Some(url) = self.api_spec_download_url.as_deref() {
            return Ok(SpecSource::Download(url));
        }
        Err(GenError::Config {
            detail: "either a spec file or a spec download URL must be set".into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_wins_over_url() {
        let cfg = GeneratorConfig {
            output_directory: "out".into(),
            api_spec_file: Some("spec.json".into()),
            api_spec_download_url: Some("https://example.com/spec.json".into()),
            ..GeneratorConfig::default()
        };
        cfg.validate().unwrap();
        assert_eq!(cfg.spec_source().unwrap(), SpecSource::File(Path::new("spec.json")));
    }

    #[test]
    fn missing_source_is_rejected() {
        let cfg = GeneratorConfig { output_directory: "out".into(), ..GeneratorConfig::default() };
        assert!(matches!(cfg.validate(), Err(GenError::Config { .. })));
    }

    #[test]
    fn missing_output_dir_is_rejected() {
        let cfg = GeneratorConfig {
            api_spec_file: Some("spec.json".into()),
            ..GeneratorConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(GenError::Config { .. })));
        // a run that never writes does not need one
        cfg.validate_for_check().unwrap();
    }

    #[test]
    fn wire_names_are_the_documented_ones() {
        let cfg: GeneratorConfig = serde_json::from_str(
            r#"{
                "outputDirectory": "models",
                "apiSpecFile": "api.yaml",
                "generatorSuffix": "Model",
                "includes": ["Role"]
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.output_directory, PathBuf::from("models"));
        assert_eq!(cfg.generator_suffix, "Model");
        assert_eq!(cfg.includes, ["Role"]);
    }

    #[test]
    fn unknown_config_keys_are_rejected() {
        let result = serde_json::from_str::<GeneratorConfig>(
            r#"{ "outputDirectory": "models", "apiSpecFile": "api.yaml", "typoKey": 1 }"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn yaml_config_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("generator.yaml");
        std::fs::write(
            &path,
            "outputDirectory: models\napiSpecFile: api.yaml\ngeneratorSuffix: Model\n",
        )
        .unwrap();
        let cfg = GeneratorConfig::from_file(&path).unwrap();
        assert_eq!(cfg.generator_suffix, "Model");
    }
}
