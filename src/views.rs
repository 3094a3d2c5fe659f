//! Askama view models for the browser configurator.

use askama::Template;

use crate::controller::SessionSnapshot;
use crate::model::{CarModel, CarStyle, FuelType};
use crate::render::{performance_bars, stat_tiles, ChartBar, StatTile};

pub struct SelectOption {
    pub label: &'static str,
    pub selected: bool,
}

pub struct BarView {
    pub label: &'static str,
    pub color: &'static str,
    pub percent: String,
    pub tooltip: String,
}

impl From<ChartBar> for BarView {
    fn from(bar: ChartBar) -> Self {
        Self {
            percent: format!("{:.1}", bar.fraction() * 100.0),
            label: bar.label,
            color: bar.color,
            tooltip: bar.tooltip,
        }
    }
}

pub struct CarView {
    pub id: String,
    pub name: String,
    pub brand: String,
    pub launch_year: i32,
    pub description: String,
    pub features: Vec<String>,
    pub has_image: bool,
    pub bars: Vec<BarView>,
    pub tiles: Vec<StatTile>,
}

impl From<&CarModel> for CarView {
    fn from(car: &CarModel) -> Self {
        Self {
            id: car.id.clone(),
            name: car.name.clone(),
            brand: car.brand.clone(),
            launch_year: car.launch_year,
            description: car.description.clone(),
            features: car.features.clone(),
            has_image: car.has_image(),
            bars: performance_bars(&car.specs).into_iter().map(BarView::from).collect(),
            tiles: stat_tiles(&car.specs).into_iter().collect(),
        }
    }
}

pub struct HistoryView {
    pub id: String,
    pub name: String,
    pub brand: String,
    pub has_image: bool,
    pub active: bool,
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub styles: Vec<SelectOption>,
    pub fuels: Vec<SelectOption>,
    pub color: String,
    pub directive: String,
    pub notice: Option<&'static str>,
    pub car: Option<CarView>,
    pub history: Vec<HistoryView>,
    pub loading: bool,
    pub stage_label: String,
}

impl IndexTemplate {
    pub fn new(snapshot: &SessionSnapshot, notice: Option<&'static str>) -> Self {
        let config = &snapshot.config;
        let current_id = snapshot.current.as_ref().map(|car| car.id.as_str());
        Self {
            styles: CarStyle::ALL
                .iter()
                .map(|style| SelectOption {
                    label: style.label(),
                    selected: *style == config.style,
                })
                .collect(),
            fuels: FuelType::ALL
                .iter()
                .map(|fuel| SelectOption {
                    label: fuel.label(),
                    selected: *fuel == config.fuel,
                })
                .collect(),
            color: config.color.clone(),
            directive: config.additional_prompt.clone(),
            notice,
            car: snapshot.current.as_ref().map(CarView::from),
            history: snapshot
                .history
                .iter()
                .map(|car| HistoryView {
                    id: car.id.clone(),
                    name: car.name.clone(),
                    brand: car.brand.clone(),
                    has_image: car.has_image(),
                    active: Some(car.id.as_str()) == current_id,
                })
                .collect(),
            loading: snapshot.is_loading(),
            stage_label: snapshot
                .stage
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
        }
    }
}
