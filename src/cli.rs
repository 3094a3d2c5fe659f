use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser};

use crate::generation::{DEFAULT_IMAGE_MODEL, DEFAULT_TEXT_MODEL};
use crate::model::{self, ConfigOptions};
use crate::session::{SessionConfig, DEFAULT_BASE_URL};
use anyhow::Result;

/// Command-line options for the AutoForge configurator.
#[derive(Debug, Clone, Parser)]
#[command(author, version, about = "AutoForge AI concept car configurator", long_about = None)]
pub struct CliArgs {
    /// API key for the generative service.
    #[arg(long = "api-key", env = "API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Base URL of the generative service.
    #[arg(long = "base-url", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Model used to invent the car's specifications.
    #[arg(long = "text-model", default_value = DEFAULT_TEXT_MODEL)]
    pub text_model: String,

    /// Model used to render the car.
    #[arg(long = "image-model", default_value = DEFAULT_IMAGE_MODEL)]
    pub image_model: String,

    /// Chassis style.
    #[arg(long = "style", default_value = "supercar", value_parser = model::style_value_parser())]
    pub style: String,

    /// Powertrain.
    #[arg(long = "fuel", default_value = "electric", value_parser = model::fuel_value_parser())]
    pub fuel: String,

    /// Exterior color.
    #[arg(long = "color", default_value = model::DEFAULT_COLOR)]
    pub color: String,

    /// Special directives passed to the designer, e.g. "gull-wing doors".
    #[arg(long = "directive", default_value = "")]
    pub directive: String,

    /// Generate a single concept from the flags above and exit.
    #[arg(long = "once", action = ArgAction::SetTrue, conflicts_with = "serve")]
    pub once: bool,

    /// Print the generated concept as JSON (requires `--once`).
    #[arg(long = "json", action = ArgAction::SetTrue, requires = "once")]
    pub json: bool,

    /// Write every rendered image into this directory.
    #[arg(long = "image-dir", value_name = "DIR")]
    pub image_dir: Option<PathBuf>,

    /// Serve the browser configurator instead of the terminal one.
    #[arg(long = "serve", action = ArgAction::SetTrue)]
    pub serve: bool,

    /// Listen address for the browser configurator (requires `--serve`).
    #[arg(long = "listen", value_name = "ADDR", requires = "serve")]
    pub listen: Option<String>,

    /// Network timeout (seconds) for generation calls. Unset means no timeout.
    #[arg(long = "timeout", value_parser = clap::value_parser!(u64).range(1..=600))]
    timeout_secs: Option<u64>,
}

impl CliArgs {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Initial build specification taken from the flags.
    pub fn config(&self) -> Result<ConfigOptions> {
        Ok(ConfigOptions {
            style: self.style.parse()?,
            fuel: self.fuel.parse()?,
            color: self.color.clone(),
            additional_prompt: self.directive.clone(),
        })
    }

    /// Convert CLI arguments into a session configuration.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::new(self.base_url.clone(), self.api_key.clone(), self.timeout())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CarStyle, FuelType};

    #[test]
    fn defaults_match_initial_configuration() {
        let args = CliArgs::try_parse_from(["autoforge"]).unwrap();
        assert_eq!(args.config().unwrap(), ConfigOptions::default());
        assert!(args.timeout().is_none());
        assert_eq!(args.text_model, DEFAULT_TEXT_MODEL);
    }

    #[test]
    fn parses_build_flags() {
        let args = CliArgs::try_parse_from([
            "autoforge",
            "--style",
            "offroad",
            "--fuel",
            "v12",
            "--color",
            "Desert Sand",
            "--directive",
            "snorkel intake",
            "--once",
            "--json",
            "--timeout",
            "45",
        ])
        .unwrap();
        let config = args.config().unwrap();
        assert_eq!(config.style, CarStyle::OffRoadBeast);
        assert_eq!(config.fuel, FuelType::V12Gasoline);
        assert_eq!(config.additional_prompt, "snorkel intake");
        assert_eq!(args.timeout(), Some(Duration::from_secs(45)));
    }

    #[test]
    fn rejects_unknown_style() {
        assert!(CliArgs::try_parse_from(["autoforge", "--style", "tractor"]).is_err());
    }

    #[test]
    fn accepts_empty_color() {
        let args = CliArgs::try_parse_from(["autoforge", "--color", ""]).unwrap();
        assert_eq!(args.config().unwrap().color, "");
    }

    #[test]
    fn json_requires_once() {
        assert!(CliArgs::try_parse_from(["autoforge", "--json"]).is_err());
    }
}
