//! Terminal front-end: the dialoguer configuration form, the spinner overlay and
//! the one-shot mode.

use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Context};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, Select};
use tokio::sync::watch;

use crate::controller::{Controller, ControllerError, FAILURE_NOTICE};
use crate::error::Result;
use crate::generation::CarGenerator;
use crate::model::{CarModel, CarStyle, ConfigOptions, FuelType};
use crate::pipeline::Stage;
use crate::render::{history_label, HistoryStrip, LoadingOverlay, ResultPanel};
use crate::util::export_image;

const SPINNER_INTERVAL: Duration = Duration::from_millis(100);

const MENU: [&str; 4] = [
    "Generate concept",
    "Edit build specifications",
    "Recent archive",
    "Quit",
];

/// Interactive configurator loop.
pub async fn run_interactive<G: CarGenerator>(
    controller: &Controller<G>,
    image_dir: Option<&Path>,
) -> Result<()> {
    let theme = ColorfulTheme::default();
    println!("AUTOFORGE AI");
    println!("Conceptualize the next generation of performance.\n");

    loop {
        print_specifications(&controller.config());
        let choice = Select::with_theme(&theme)
            .with_prompt("Build menu")
            .items(&MENU)
            .default(0)
            .interact()
            .context("reading menu selection")?;

        match choice {
            0 => {
                if let Some(car) = generate_with_overlay(controller).await {
                    show_car(&car, image_dir).await;
                }
            }
            1 => {
                let config = edit_config(&theme, &controller.config())?;
                controller.set_config(config);
            }
            2 => browse_history(&theme, controller).await?,
            _ => break,
        }
    }

    Ok(())
}

/// Generates one concept from the configured flags and prints it.
pub async fn run_once<G: CarGenerator>(
    controller: &Controller<G>,
    image_dir: Option<&Path>,
    json: bool,
) -> Result<()> {
    let car = generate_with_overlay(controller)
        .await
        .ok_or_else(|| anyhow!("generation failed"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&car)?);
    } else {
        println!("{}", ResultPanel(Some(&car)));
    }
    if let Some(dir) = image_dir {
        if let Some(path) = export_image(dir, &car).await? {
            eprintln!("Image saved to {}", path.display());
        }
    }
    Ok(())
}

/// Runs a generation while the spinner shows the current stage.
///
/// Failures are reported with the generic notice; details go to the log.
async fn generate_with_overlay<G: CarGenerator>(controller: &Controller<G>) -> Option<CarModel> {
    let overlay = tokio::spawn(show_overlay(controller.subscribe()));
    let result = controller.generate().await;
    overlay.abort();
    let _ = overlay.await;
    eprint!("\r\x1b[2K");

    match result {
        Ok(car) => Some(car),
        Err(ControllerError::AlreadyGenerating) => {
            eprintln!("A concept is already on the assembly line.");
            None
        }
        Err(ControllerError::Generation(_)) => {
            eprintln!("{FAILURE_NOTICE}");
            None
        }
    }
}

async fn show_overlay(stage: watch::Receiver<Option<Stage>>) {
    let mut ticker = tokio::time::interval(SPINNER_INTERVAL);
    let mut frame = 0usize;
    loop {
        ticker.tick().await;
        let current = stage.borrow().clone();
        if let Some(stage) = current {
            let mut stderr = io::stderr();
            let _ = write!(stderr, "\r\x1b[2K{}", LoadingOverlay { stage: &stage, frame });
            let _ = stderr.flush();
            frame = frame.wrapping_add(1);
        }
    }
}

async fn show_car(car: &CarModel, image_dir: Option<&Path>) {
    println!("\n{}", ResultPanel(Some(car)));
    if let Some(dir) = image_dir {
        match export_image(dir, car).await {
            Ok(Some(path)) => println!("Image saved to {}", path.display()),
            Ok(None) => {}
            Err(err) => tracing::warn!("failed to export image: {err:?}"),
        }
    }
}

fn print_specifications(config: &ConfigOptions) {
    println!(
        "Chassis: {} | Powertrain: {} | Color: {}",
        config.style, config.fuel, config.color
    );
    if !config.additional_prompt.is_empty() {
        println!("Directives: {}", config.additional_prompt);
    }
}

fn edit_config(theme: &ColorfulTheme, current: &ConfigOptions) -> Result<ConfigOptions> {
    let styles = CarStyle::ALL.map(CarStyle::label);
    let style_index = Select::with_theme(theme)
        .with_prompt("Chassis style")
        .items(&styles)
        .default(position(&CarStyle::ALL, &current.style))
        .interact()?;

    let fuels = FuelType::ALL.map(FuelType::label);
    let fuel_index = Select::with_theme(theme)
        .with_prompt("Powertrain")
        .items(&fuels)
        .default(position(&FuelType::ALL, &current.fuel))
        .interact()?;

    let color: String = Input::with_theme(theme)
        .with_prompt("Exterior color")
        .with_initial_text(current.color.clone())
        .allow_empty(true)
        .interact_text()?;

    let additional_prompt: String = Input::with_theme(theme)
        .with_prompt("Special directives")
        .with_initial_text(current.additional_prompt.clone())
        .allow_empty(true)
        .interact_text()?;

    Ok(ConfigOptions {
        style: CarStyle::ALL[style_index],
        fuel: FuelType::ALL[fuel_index],
        color,
        additional_prompt,
    })
}

async fn browse_history<G: CarGenerator>(
    theme: &ColorfulTheme,
    controller: &Controller<G>,
) -> Result<()> {
    let snapshot = controller.snapshot();
    if snapshot.history.is_empty() {
        println!("The archive is empty. Generate a concept first.");
        return Ok(());
    }

    print!(
        "{}",
        HistoryStrip {
            history: &snapshot.history,
            current_id: snapshot.current.as_ref().map(|car| car.id.as_str()),
        }
    );
    let labels: Vec<String> = snapshot.history.iter().map(history_label).collect();
    let picked = Select::with_theme(theme)
        .with_prompt("Open from archive (Esc to go back)")
        .items(&labels)
        .default(0)
        .interact_opt()?;

    if let Some(index) = picked {
        if let Some(car) = controller.select_history(&snapshot.history[index].id) {
            show_car(&car, None).await;
        }
    }
    Ok(())
}

fn position<T: PartialEq>(all: &[T], value: &T) -> usize {
    all.iter().position(|item| item == value).unwrap_or(0)
}
