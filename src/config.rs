use crate::model::Codes;
use eyre::{Error, WrapErr};
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

pub const DEFAULT_CONFIG_FILE: &str = "necta-stats.toml";

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub output: OutputConfig,
    pub codes: Codes,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Results page address, `{centre}` being replaced by the centre number.
    pub url_template: String,
    /// Request timeout in seconds.
    pub timeout: u64,
}

impl Default for SourceConfig {
    fn default() -> SourceConfig {
        SourceConfig {
            url_template: "https://matokeo.necta.go.tz/results/2025/dsee/results/{centre}.htm"
                .to_owned(),
            timeout: 30,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub json: String,
    pub summary: String,
    pub divisions: String,
}

impl Default for OutputConfig {
    fn default() -> OutputConfig {
        OutputConfig {
            json: "necta_results.json".to_owned(),
            summary: "necta_summary.csv".to_owned(),
            divisions: "necta_div_summary.csv".to_owned(),
        }
    }
}

impl Config {
    pub fn load(file_name: &Path) -> Result<Config, Error> {
        let content = std::fs::read_to_string(file_name)
            .wrap_err_with(|| format!("cannot read configuration file {}", file_name.display()))?;
        Self::parse(&content)
            .wrap_err_with(|| format!("cannot load configuration file {}", file_name.display()))
    }

    pub fn parse(content: &str) -> Result<Config, Error> {
        Ok(toml::from_str(content)?)
    }

    /// Use the given file, or the default one if present, or the built-in defaults.
    pub fn discover(file_name: Option<&Path>) -> Result<Config, Error> {
        match file_name {
            Some(file_name) => Self::load(file_name),
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::load(Path::new(DEFAULT_CONFIG_FILE))
            }
            None => {
                debug!("no configuration file, using defaults");
                Ok(Config::default())
            }
        }
    }
}
