//! Text rendering of the configurator views, plus the chart and tile data the
//! web views share.

use std::fmt;

use crate::model::{CarModel, PerformanceStats};
use crate::pipeline::Stage;

pub const SPINNER_FRAMES: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

const CHART_WIDTH: usize = 32;
const ACCELERATION_CEILING: f64 = 10.0;

/// One horizontal bar of the performance chart.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartBar {
    pub label: &'static str,
    /// Plotted value; for acceleration this is the inverted score, not seconds.
    pub value: f64,
    pub max: f64,
    pub color: &'static str,
    /// The underlying stat as the user reads it.
    pub display: String,
    pub tooltip: String,
}

impl ChartBar {
    /// Filled share of the bar, clamped to `0.0..=1.0`.
    pub fn fraction(&self) -> f64 {
        let fraction = self.value / self.max;
        if fraction.is_finite() {
            fraction.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Maps stats onto bars normalized against fixed reference maxima.
///
/// Acceleration is plotted as `(10 - seconds) * 100` so quicker cars draw longer
/// bars; the seconds value stays in `display` and `tooltip`.
pub fn performance_bars(stats: &PerformanceStats) -> [ChartBar; 4] {
    [
        plain_bar("Horsepower", stats.horsepower, 2000.0, "#3b82f6"),
        plain_bar("Top Speed", stats.top_speed, 300.0, "#ef4444"),
        plain_bar("Range", stats.range, 1000.0, "#10b981"),
        ChartBar {
            label: "0-60 Accel",
            value: (ACCELERATION_CEILING - stats.acceleration) * 100.0,
            max: 1000.0,
            color: "#f59e0b",
            display: stats.acceleration.to_string(),
            tooltip: format!("{}s", stats.acceleration),
        },
    ]
}

fn plain_bar(label: &'static str, value: f64, max: f64, color: &'static str) -> ChartBar {
    ChartBar {
        label,
        value,
        max,
        color,
        display: value.to_string(),
        tooltip: value.to_string(),
    }
}

/// A headline figure in the result panel.
#[derive(Debug, Clone, PartialEq)]
pub struct StatTile {
    pub label: &'static str,
    pub value: String,
    pub unit: &'static str,
    pub color: &'static str,
}

pub fn stat_tiles(stats: &PerformanceStats) -> [StatTile; 4] {
    let tile = |label, value: f64, unit, color| StatTile {
        label,
        value: value.to_string(),
        unit,
        color,
    };
    [
        tile("Top Velocity", stats.top_speed, "MPH", "#ef4444"),
        tile("Output", stats.horsepower, "HP", "#3b82f6"),
        tile("Acceleration", stats.acceleration, "SEC", "#eab308"),
        tile("Operational Range", stats.range, "MI", "#10b981"),
    ]
}

/// One frame of the loading indicator.
pub struct LoadingOverlay<'a> {
    pub stage: &'a Stage,
    pub frame: usize,
}

impl fmt::Display for LoadingOverlay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let spinner = SPINNER_FRAMES[self.frame % SPINNER_FRAMES.len()];
        write!(f, "{spinner} Engineered by AI :: {}...", self.stage)
    }
}

pub struct PerformanceChart<'a>(pub &'a PerformanceStats);

impl fmt::Display for PerformanceChart<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "PERFORMANCE METRICS")?;
        for bar in performance_bars(self.0) {
            let filled = (bar.fraction() * CHART_WIDTH as f64).round() as usize;
            writeln!(
                f,
                "  {:<11} {}{} {}",
                bar.label,
                "█".repeat(filled),
                "·".repeat(CHART_WIDTH - filled),
                bar.display
            )?;
        }
        Ok(())
    }
}

/// Result panel for the current concept, or the empty state.
pub struct ResultPanel<'a>(pub Option<&'a CarModel>);

impl fmt::Display for ResultPanel<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(car) = self.0 else {
            writeln!(f, "Awaiting Specifications")?;
            return writeln!(f, "Configure and generate to forge your first vehicle.");
        };

        writeln!(f, "{}", car.brand.to_uppercase())?;
        writeln!(f, "{}", car.name)?;
        writeln!(
            f,
            "{} · {} · {} · LAUNCH READY: {}",
            car.style, car.fuel, car.primary_color, car.launch_year
        )?;
        if car.has_image() {
            writeln!(f, "[image: {} bytes encoded]", car.image_url.len())?;
        } else {
            writeln!(f, "[no image rendered]")?;
        }
        writeln!(f)?;
        writeln!(f, "DESIGN PHILOSOPHY")?;
        writeln!(f, "{}", car.description)?;
        writeln!(f)?;
        writeln!(f, "PROPULSION & INNOVATION")?;
        for feature in &car.features {
            writeln!(f, "  • {feature}")?;
        }
        writeln!(f)?;
        write!(f, "{}", PerformanceChart(&car.specs))?;
        writeln!(f)?;
        let tiles = stat_tiles(&car.specs)
            .iter()
            .map(|tile| format!("{} {} {}", tile.label.to_uppercase(), tile.value, tile.unit))
            .collect::<Vec<_>>();
        writeln!(f, "{}", tiles.join(" | "))
    }
}

/// Archive listing, marking the entry currently on display.
pub struct HistoryStrip<'a> {
    pub history: &'a [CarModel],
    pub current_id: Option<&'a str>,
}

impl fmt::Display for HistoryStrip<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.history.is_empty() {
            return Ok(());
        }
        writeln!(f, "RECENT ARCHIVE")?;
        for (index, car) in self.history.iter().enumerate() {
            let marker = if Some(car.id.as_str()) == self.current_id {
                '▸'
            } else {
                ' '
            };
            writeln!(f, "{marker} {:>2}. {}", index + 1, history_label(car))?;
        }
        Ok(())
    }
}

pub fn history_label(car: &CarModel) -> String {
    format!("{} · {}", car.name, car.brand.to_uppercase())
}
