//! Configuration and result records shared by every surface.

use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use clap::builder::PossibleValuesParser;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_COLOR: &str = "Obsidian Black";

/// Chassis styles offered by the configurator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CarStyle {
    #[serde(rename = "Supercar")]
    Supercar,
    #[serde(rename = "Luxury SUV")]
    LuxurySuv,
    #[serde(rename = "Executive Sedan")]
    ExecutiveSedan,
    #[serde(rename = "Off-Road Beast")]
    OffRoadBeast,
    #[serde(rename = "Track-Focused Hypercar")]
    TrackHypercar,
    #[serde(rename = "Next-Gen EV")]
    NextGenEv,
}

impl CarStyle {
    pub const ALL: [CarStyle; 6] = [
        CarStyle::Supercar,
        CarStyle::LuxurySuv,
        CarStyle::ExecutiveSedan,
        CarStyle::OffRoadBeast,
        CarStyle::TrackHypercar,
        CarStyle::NextGenEv,
    ];

    /// Human-readable label, also used in prompts and on the wire.
    pub fn label(self) -> &'static str {
        match self {
            CarStyle::Supercar => "Supercar",
            CarStyle::LuxurySuv => "Luxury SUV",
            CarStyle::ExecutiveSedan => "Executive Sedan",
            CarStyle::OffRoadBeast => "Off-Road Beast",
            CarStyle::TrackHypercar => "Track-Focused Hypercar",
            CarStyle::NextGenEv => "Next-Gen EV",
        }
    }

    /// Short identifier accepted on the command line.
    pub fn slug(self) -> &'static str {
        match self {
            CarStyle::Supercar => "supercar",
            CarStyle::LuxurySuv => "suv",
            CarStyle::ExecutiveSedan => "sedan",
            CarStyle::OffRoadBeast => "offroad",
            CarStyle::TrackHypercar => "hypercar",
            CarStyle::NextGenEv => "ev",
        }
    }
}

impl fmt::Display for CarStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for CarStyle {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        CarStyle::ALL
            .into_iter()
            .find(|style| {
                style.slug().eq_ignore_ascii_case(value) || style.label().eq_ignore_ascii_case(value)
            })
            .ok_or_else(|| anyhow!("unknown chassis style `{value}`"))
    }
}

/// Powertrain options offered by the configurator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FuelType {
    #[serde(rename = "Electric")]
    Electric,
    #[serde(rename = "Hydrogen")]
    Hydrogen,
    #[serde(rename = "Hybrid")]
    Hybrid,
    #[serde(rename = "V12 Gasoline")]
    V12Gasoline,
}

impl FuelType {
    pub const ALL: [FuelType; 4] = [
        FuelType::Electric,
        FuelType::Hydrogen,
        FuelType::Hybrid,
        FuelType::V12Gasoline,
    ];

    pub fn label(self) -> &'static str {
        match self {
            FuelType::Electric => "Electric",
            FuelType::Hydrogen => "Hydrogen",
            FuelType::Hybrid => "Hybrid",
            FuelType::V12Gasoline => "V12 Gasoline",
        }
    }

    pub fn slug(self) -> &'static str {
        match self {
            FuelType::Electric => "electric",
            FuelType::Hydrogen => "hydrogen",
            FuelType::Hybrid => "hybrid",
            FuelType::V12Gasoline => "v12",
        }
    }
}

impl fmt::Display for FuelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for FuelType {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        FuelType::ALL
            .into_iter()
            .find(|fuel| {
                fuel.slug().eq_ignore_ascii_case(value) || fuel.label().eq_ignore_ascii_case(value)
            })
            .ok_or_else(|| anyhow!("unknown fuel type `{value}`"))
    }
}

/// Build a Clap value parser that restricts input to the known chassis slugs.
pub fn style_value_parser() -> PossibleValuesParser {
    PossibleValuesParser::new(CarStyle::ALL.map(CarStyle::slug))
}

/// Build a Clap value parser that restricts input to the known fuel slugs.
pub fn fuel_value_parser() -> PossibleValuesParser {
    PossibleValuesParser::new(FuelType::ALL.map(FuelType::slug))
}

/// The user's build specification. Edits replace the whole snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigOptions {
    pub style: CarStyle,
    pub fuel: FuelType,
    pub color: String,
    #[serde(default)]
    pub additional_prompt: String,
}

impl Default for ConfigOptions {
    fn default() -> Self {
        Self {
            style: CarStyle::Supercar,
            fuel: FuelType::Electric,
            color: DEFAULT_COLOR.to_owned(),
            additional_prompt: String::new(),
        }
    }
}

/// Performance figures: mph, seconds 0-60, miles, hp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceStats {
    pub top_speed: f64,
    pub acceleration: f64,
    pub range: f64,
    pub horsepower: f64,
}

impl PerformanceStats {
    pub const FALLBACK: PerformanceStats = PerformanceStats {
        top_speed: 200.0,
        acceleration: 3.5,
        range: 400.0,
        horsepower: 800.0,
    };
}

impl Default for PerformanceStats {
    fn default() -> Self {
        Self::FALLBACK
    }
}

/// Stats as returned by the text model, before reconciliation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PartialStats {
    pub top_speed: Option<f64>,
    pub acceleration: Option<f64>,
    pub range: Option<f64>,
    pub horsepower: Option<f64>,
}

impl PartialStats {
    fn fill(self, defaults: &PerformanceStats) -> PerformanceStats {
        PerformanceStats {
            top_speed: self.top_speed.unwrap_or(defaults.top_speed),
            acceleration: self.acceleration.unwrap_or(defaults.acceleration),
            range: self.range.unwrap_or(defaults.range),
            horsepower: self.horsepower.unwrap_or(defaults.horsepower),
        }
    }
}

impl From<PerformanceStats> for PartialStats {
    fn from(stats: PerformanceStats) -> Self {
        Self {
            top_speed: Some(stats.top_speed),
            acceleration: Some(stats.acceleration),
            range: Some(stats.range),
            horsepower: Some(stats.horsepower),
        }
    }
}

/// Car attributes as parsed from the structured text response. Any field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PartialCarAttributes {
    pub name: Option<String>,
    pub brand: Option<String>,
    pub description: Option<String>,
    pub specs: Option<PartialStats>,
    pub features: Option<Vec<String>>,
    pub launch_year: Option<f64>,
}

/// Fallback values used when the generated record leaves a field out.
#[derive(Debug, Clone, PartialEq)]
pub struct CarDefaults {
    pub name: String,
    pub brand: String,
    pub description: String,
    pub specs: PerformanceStats,
    pub features: Vec<String>,
    pub launch_year: i32,
}

impl Default for CarDefaults {
    fn default() -> Self {
        Self {
            name: "Prototype X".to_owned(),
            brand: "AutoForge".to_owned(),
            description: String::new(),
            specs: PerformanceStats::FALLBACK,
            features: Vec::new(),
            launch_year: 2026,
        }
    }
}

/// Fully reconciled generated attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct CarAttributes {
    pub name: String,
    pub brand: String,
    pub description: String,
    pub specs: PerformanceStats,
    pub features: Vec<String>,
    pub launch_year: i32,
}

impl PartialCarAttributes {
    /// Resolve every absent field against `defaults`.
    ///
    /// Empty names and brands and a zero launch year count as absent. An empty
    /// feature list is kept as generated.
    pub fn reconcile(self, defaults: &CarDefaults) -> CarAttributes {
        CarAttributes {
            name: non_empty(self.name).unwrap_or_else(|| defaults.name.clone()),
            brand: non_empty(self.brand).unwrap_or_else(|| defaults.brand.clone()),
            description: self
                .description
                .unwrap_or_else(|| defaults.description.clone()),
            specs: self
                .specs
                .map(|specs| specs.fill(&defaults.specs))
                .unwrap_or(defaults.specs),
            features: self.features.unwrap_or_else(|| defaults.features.clone()),
            launch_year: self
                .launch_year
                .filter(|year| year.is_finite() && *year != 0.0)
                .map(|year| year.round() as i32)
                .unwrap_or(defaults.launch_year),
        }
    }

    /// Generated name if it is usable, otherwise `fallback`.
    pub fn name_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(fallback)
    }
}

impl From<CarAttributes> for PartialCarAttributes {
    fn from(attributes: CarAttributes) -> Self {
        Self {
            name: Some(attributes.name),
            brand: Some(attributes.brand),
            description: Some(attributes.description),
            specs: Some(attributes.specs.into()),
            features: Some(attributes.features),
            launch_year: Some(f64::from(attributes.launch_year)),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}

/// One generated concept. Never mutated after assembly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarModel {
    pub id: String,
    pub name: String,
    pub brand: String,
    pub style: CarStyle,
    pub fuel: FuelType,
    pub primary_color: String,
    pub description: String,
    pub specs: PerformanceStats,
    /// `data:` URI, or empty when the image model returned no picture.
    pub image_url: String,
    pub features: Vec<String>,
    pub launch_year: i32,
}

impl CarModel {
    /// Combine the request-time configuration with reconciled attributes.
    pub fn assemble(config: &ConfigOptions, attributes: CarAttributes, image_url: String) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            name: attributes.name,
            brand: attributes.brand,
            style: config.style,
            fuel: config.fuel,
            primary_color: config.color.clone(),
            description: attributes.description,
            specs: attributes.specs,
            image_url,
            features: attributes.features,
            launch_year: attributes.launch_year,
        }
    }

    pub fn has_image(&self) -> bool {
        !self.image_url.is_empty()
    }
}
