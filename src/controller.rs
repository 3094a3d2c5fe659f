//! Application controller: owns the session store and the loading stage.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;

use crate::error::GenerationError;
use crate::generation::CarGenerator;
use crate::model::{CarDefaults, CarModel, ConfigOptions};
use crate::pipeline::{Pipeline, Stage};
use crate::store::SessionStore;

/// Notification shown for any failed generation.
pub const FAILURE_NOTICE: &str =
    "Failed to build the car. The AI engineers need a break. Try again!";

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("a concept is already being generated")]
    AlreadyGenerating,

    #[error(transparent)]
    Generation(#[from] GenerationError),
}

/// Everything a renderer needs, cloned out of the controller.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub config: ConfigOptions,
    pub current: Option<CarModel>,
    pub history: Vec<CarModel>,
    pub stage: Option<Stage>,
}

impl SessionSnapshot {
    pub fn is_loading(&self) -> bool {
        self.stage.is_some()
    }
}

pub struct Controller<G> {
    generator: G,
    defaults: CarDefaults,
    store: Mutex<SessionStore>,
    stage: watch::Sender<Option<Stage>>,
}

impl<G: CarGenerator> Controller<G> {
    pub fn new(generator: G, config: ConfigOptions) -> Self {
        let (stage, _) = watch::channel(None);
        Self {
            generator,
            defaults: CarDefaults::default(),
            store: Mutex::new(SessionStore::new(config)),
            stage,
        }
    }

    pub fn config(&self) -> ConfigOptions {
        self.lock().config().clone()
    }

    pub fn set_config(&self, config: ConfigOptions) {
        self.lock().set_config(config);
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let store = self.lock();
        SessionSnapshot {
            config: store.config().clone(),
            current: store.current().cloned(),
            history: store.history().to_vec(),
            stage: self.stage.borrow().clone(),
        }
    }

    /// Live stage updates; `None` means idle.
    pub fn subscribe(&self) -> watch::Receiver<Option<Stage>> {
        self.stage.subscribe()
    }

    /// Makes an archived concept current without regenerating or reordering.
    pub fn select_history(&self, id: &str) -> Option<CarModel> {
        let selected = self.lock().select_history(id);
        if selected.is_none() {
            tracing::debug!(%id, "history entry not found");
        }
        selected
    }

    /// Current or archived concept with `id`.
    pub fn find(&self, id: &str) -> Option<CarModel> {
        self.lock().find(id).cloned()
    }

    /// Runs one generation cycle against the current configuration.
    ///
    /// Only one cycle may be in flight; a second call returns
    /// [`ControllerError::AlreadyGenerating`]. On failure the current result and
    /// history are left as they were. The loading stage is cleared on every exit,
    /// including when the returned future is dropped.
    pub async fn generate(&self) -> Result<CarModel, ControllerError> {
        let loading = self.begin()?;
        let config = self.config();
        self.run_cycle(loading, config).await
    }

    /// Stores `config` and generates from it as one step.
    ///
    /// A busy controller rejects the call before `config` is stored.
    pub async fn generate_with(&self, config: ConfigOptions) -> Result<CarModel, ControllerError> {
        let loading = self.begin()?;
        self.set_config(config.clone());
        self.run_cycle(loading, config).await
    }

    fn begin(&self) -> Result<LoadingGuard<'_>, ControllerError> {
        LoadingGuard::acquire(&self.stage).ok_or_else(|| {
            tracing::warn!("generation requested while another is in flight");
            ControllerError::AlreadyGenerating
        })
    }

    async fn run_cycle(
        &self,
        _loading: LoadingGuard<'_>,
        config: ConfigOptions,
    ) -> Result<CarModel, ControllerError> {
        let outcome = Pipeline::new(&self.generator, &self.defaults)
            .run(config, |stage| {
                tracing::debug!("{stage}");
                self.stage.send_replace(Some(stage));
            })
            .await;

        match outcome {
            Ok(car) => {
                let mut store = self.lock();
                store.set_result(car.clone());
                store.push_history(car.clone());
                tracing::info!(id = %car.id, name = %car.name, brand = %car.brand, "concept generated");
                Ok(car)
            }
            Err(err) => {
                tracing::error!("Generation failed: {err}");
                Err(err.into())
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Holds the loading stage for the duration of a generation cycle.
struct LoadingGuard<'a> {
    stage: &'a watch::Sender<Option<Stage>>,
}

impl<'a> LoadingGuard<'a> {
    /// Enters the loading state unless a cycle is already running.
    fn acquire(stage: &'a watch::Sender<Option<Stage>>) -> Option<Self> {
        let acquired = stage.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(Stage::Analyzing);
            true
        });
        acquired.then(|| Self { stage })
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.stage.send_replace(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use assert_matches::assert_matches;
    use tokio::sync::Notify;

    use crate::model::{CarStyle, FuelType, PartialCarAttributes, PartialStats, PerformanceStats};
    use crate::store::HISTORY_LIMIT;

    const IMAGE: &str = "data:image/png;base64,iVBORw0KGgo=";

    /// Replays queued text responses; the image call returns `image`.
    #[derive(Default)]
    struct ScriptedGenerator {
        responses: Mutex<VecDeque<Result<PartialCarAttributes, GenerationError>>>,
        image: String,
        fail_image: bool,
        gate: Option<Arc<Notify>>,
        text_calls: AtomicUsize,
    }

    impl ScriptedGenerator {
        fn with_responses(
            responses: impl IntoIterator<Item = Result<PartialCarAttributes, GenerationError>>,
        ) -> Self {
            Self {
                responses: Mutex::new(responses.into_iter().collect()),
                image: IMAGE.to_owned(),
                ..Self::default()
            }
        }

        fn gated(gate: Arc<Notify>) -> Self {
            Self {
                image: IMAGE.to_owned(),
                gate: Some(gate),
                ..Self::default()
            }
        }
    }

    impl CarGenerator for ScriptedGenerator {
        async fn request_car_data(
            &self,
            _config: &ConfigOptions,
        ) -> Result<PartialCarAttributes, GenerationError> {
            self.text_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            let next = self.responses.lock().unwrap().pop_front();
            next.unwrap_or_else(|| Ok(PartialCarAttributes::default()))
        }

        async fn request_car_image(
            &self,
            _config: &ConfigOptions,
            _car_name: &str,
        ) -> Result<String, GenerationError> {
            if self.fail_image {
                return Err(GenerationError::Upstream {
                    status: 500,
                    body: "boom".into(),
                });
            }
            Ok(self.image.clone())
        }
    }

    fn full_response(name: &str) -> PartialCarAttributes {
        PartialCarAttributes {
            name: Some(name.to_owned()),
            brand: Some("Aurelian".into()),
            description: Some("Two paragraphs of pure speed.".into()),
            specs: Some(PartialStats {
                top_speed: Some(260.0),
                acceleration: Some(1.9),
                range: Some(610.0),
                horsepower: Some(1500.0),
            }),
            features: Some(vec!["Active aero".into(), "Torque vectoring".into()]),
            launch_year: Some(2032.0),
        }
    }

    fn config() -> ConfigOptions {
        ConfigOptions {
            style: CarStyle::LuxurySuv,
            fuel: FuelType::Hybrid,
            color: "Satin White".into(),
            additional_prompt: "panoramic roof".into(),
        }
    }

    fn history_names<G: CarGenerator>(controller: &Controller<G>) -> Vec<String> {
        controller
            .snapshot()
            .history
            .into_iter()
            .map(|car| car.name)
            .collect()
    }

    #[tokio::test]
    async fn full_response_maps_field_for_field() {
        let controller = Controller::new(
            ScriptedGenerator::with_responses([Ok(full_response("Vortex"))]),
            config(),
        );

        let car = controller.generate().await.unwrap();

        assert_eq!(car.name, "Vortex");
        assert_eq!(car.brand, "Aurelian");
        assert_eq!(car.description, "Two paragraphs of pure speed.");
        assert_eq!(
            car.specs,
            PerformanceStats {
                top_speed: 260.0,
                acceleration: 1.9,
                range: 610.0,
                horsepower: 1500.0,
            }
        );
        assert_eq!(car.features, vec!["Active aero", "Torque vectoring"]);
        assert_eq!(car.launch_year, 2032);
        assert_eq!(car.image_url, IMAGE);
        assert_eq!(car.style, CarStyle::LuxurySuv);
        assert_eq!(car.fuel, FuelType::Hybrid);
        assert_eq!(car.primary_color, "Satin White");

        let snapshot = controller.snapshot();
        assert_eq!(snapshot.current.as_ref(), Some(&car));
        assert_eq!(snapshot.history, vec![car]);
        assert!(!snapshot.is_loading());
    }

    #[tokio::test]
    async fn missing_fields_resolve_to_defaults_individually() {
        let defaults = CarDefaults::default();
        let strip: [fn(&mut PartialCarAttributes); 6] = [
            |p| p.name = None,
            |p| p.brand = None,
            |p| p.description = None,
            |p| p.specs = None,
            |p| p.features = None,
            |p| p.launch_year = None,
        ];

        for (index, remove) in strip.iter().enumerate() {
            let mut partial = full_response("Vortex");
            remove(&mut partial);
            let controller =
                Controller::new(ScriptedGenerator::with_responses([Ok(partial)]), config());
            let car = controller.generate().await.unwrap();
            let full = full_response("Vortex").reconcile(&defaults);

            let expect = |field: usize| index != field;
            assert_eq!(car.name == full.name, expect(0), "name, case {index}");
            assert_eq!(car.brand == full.brand, expect(1), "brand, case {index}");
            assert_eq!(
                car.description == full.description,
                expect(2),
                "description, case {index}"
            );
            assert_eq!(car.specs == full.specs, expect(3), "specs, case {index}");
            assert_eq!(car.features == full.features, expect(4), "features, case {index}");
            assert_eq!(
                car.launch_year == full.launch_year,
                expect(5),
                "launch year, case {index}"
            );
        }
    }

    #[tokio::test]
    async fn empty_response_uses_every_default() {
        let controller = Controller::new(
            ScriptedGenerator::with_responses([Ok(PartialCarAttributes::default())]),
            config(),
        );
        let car = controller.generate().await.unwrap();
        assert_eq!(car.name, "Prototype X");
        assert_eq!(car.brand, "AutoForge");
        assert_eq!(car.description, "");
        assert_eq!(car.specs, PerformanceStats::FALLBACK);
        assert!(car.features.is_empty());
        assert_eq!(car.launch_year, 2026);
    }

    #[tokio::test]
    async fn history_keeps_last_ten_newest_first() {
        let responses = (0..=HISTORY_LIMIT).map(|i| Ok(full_response(&format!("Car {i}"))));
        let controller = Controller::new(ScriptedGenerator::with_responses(responses), config());

        for _ in 0..=HISTORY_LIMIT {
            controller.generate().await.unwrap();
        }

        let expected: Vec<String> = (1..=HISTORY_LIMIT).rev().map(|i| format!("Car {i}")).collect();
        assert_eq!(history_names(&controller), expected);
        assert_eq!(
            controller.snapshot().current.map(|car| car.name),
            Some(format!("Car {HISTORY_LIMIT}"))
        );
    }

    #[tokio::test]
    async fn selecting_history_leaves_order_alone() {
        let responses = ["Alpha", "Bravo", "Charlie"].map(|name| Ok(full_response(name)));
        let controller = Controller::new(ScriptedGenerator::with_responses(responses), config());
        for _ in 0..3 {
            controller.generate().await.unwrap();
        }
        let before = controller.snapshot().history;
        let oldest = before.last().cloned().unwrap();

        let selected = controller.select_history(&oldest.id).unwrap();

        let after = controller.snapshot();
        assert_eq!(selected, oldest);
        assert_eq!(after.current, Some(oldest));
        assert_eq!(after.history, before);
        assert!(controller.select_history("unknown").is_none());
    }

    #[tokio::test]
    async fn rejected_text_call_leaves_state_untouched() {
        let controller = Controller::new(
            ScriptedGenerator::with_responses([
                Ok(full_response("Keeper")),
                Err(GenerationError::MissingText),
            ]),
            config(),
        );
        controller.generate().await.unwrap();
        let before = controller.snapshot();

        let err = controller.generate().await.unwrap_err();

        assert_matches!(err, ControllerError::Generation(GenerationError::MissingText));
        let after = controller.snapshot();
        assert!(!after.is_loading());
        assert_eq!(after.current, before.current);
        assert_eq!(after.history, before.history);
    }

    #[tokio::test]
    async fn rejected_image_call_leaves_state_untouched() {
        let mut generator = ScriptedGenerator::with_responses([Ok(full_response("Lost"))]);
        generator.fail_image = true;
        let controller = Controller::new(generator, config());

        let err = controller.generate().await.unwrap_err();

        assert_matches!(
            err,
            ControllerError::Generation(GenerationError::Upstream { status: 500, .. })
        );
        let snapshot = controller.snapshot();
        assert!(snapshot.current.is_none());
        assert!(snapshot.history.is_empty());
        assert!(!controller.snapshot().is_loading());
    }

    #[tokio::test]
    async fn missing_image_yields_empty_url() {
        let mut generator = ScriptedGenerator::with_responses([Ok(full_response("Ghost"))]);
        generator.image = String::new();
        let controller = Controller::new(generator, config());

        let car = controller.generate().await.unwrap();

        assert_eq!(car.image_url, "");
        assert_eq!(car.name, "Ghost");
        assert_eq!(car.brand, "Aurelian");
        assert_eq!(car.launch_year, 2032);
    }

    #[tokio::test]
    async fn rejects_reentry_while_loading() {
        let gate = Arc::new(Notify::new());
        let controller = Arc::new(Controller::new(
            ScriptedGenerator::gated(gate.clone()),
            config(),
        ));
        let mut stage = controller.subscribe();

        let first = tokio::spawn({
            let controller = controller.clone();
            async move { controller.generate().await }
        });
        stage.wait_for(Option::is_some).await.unwrap();

        assert_matches!(
            controller.generate().await,
            Err(ControllerError::AlreadyGenerating)
        );
        assert_eq!(controller.snapshot().stage, Some(Stage::Analyzing));

        gate.notify_one();
        let car = first.await.unwrap().unwrap();
        assert_eq!(controller.snapshot().history, vec![car]);
        assert!(!controller.snapshot().is_loading());
    }

    #[tokio::test]
    async fn rejected_call_keeps_the_running_cycle_loading() {
        let gate = Arc::new(Notify::new());
        let controller = Arc::new(Controller::new(
            ScriptedGenerator::gated(gate.clone()),
            config(),
        ));
        let mut stage = controller.subscribe();

        let first = tokio::spawn({
            let controller = controller.clone();
            async move { controller.generate().await }
        });
        stage.wait_for(Option::is_some).await.unwrap();

        for _ in 0..2 {
            assert_matches!(
                controller.generate().await,
                Err(ControllerError::AlreadyGenerating)
            );
            assert!(controller.snapshot().is_loading());
        }
        assert_eq!(controller.generator.text_calls.load(Ordering::SeqCst), 1);

        gate.notify_one();
        first.await.unwrap().unwrap();
        assert_eq!(controller.generator.text_calls.load(Ordering::SeqCst), 1);
        assert_eq!(controller.snapshot().history.len(), 1);
        assert!(!controller.snapshot().is_loading());
    }

    #[tokio::test]
    async fn generate_with_stores_config_only_when_accepted() {
        let gate = Arc::new(Notify::new());
        let controller = Arc::new(Controller::new(
            ScriptedGenerator::gated(gate.clone()),
            ConfigOptions::default(),
        ));
        let mut stage = controller.subscribe();

        let first = tokio::spawn({
            let controller = controller.clone();
            async move { controller.generate_with(config()).await }
        });
        stage.wait_for(Option::is_some).await.unwrap();
        assert_eq!(controller.config(), config());

        let rival = ConfigOptions {
            style: CarStyle::OffRoadBeast,
            ..ConfigOptions::default()
        };
        assert_matches!(
            controller.generate_with(rival).await,
            Err(ControllerError::AlreadyGenerating)
        );
        assert_eq!(controller.config(), config());

        gate.notify_one();
        let car = first.await.unwrap().unwrap();
        assert_eq!(car.style, CarStyle::LuxurySuv);
        assert_eq!(car.primary_color, "Satin White");
    }

    #[tokio::test]
    async fn dropped_generation_clears_loading() {
        let gate = Arc::new(Notify::new());
        let controller = Controller::new(ScriptedGenerator::gated(gate), config());

        let outcome = tokio::time::timeout(Duration::from_millis(20), controller.generate()).await;

        assert!(outcome.is_err());
        assert!(!controller.snapshot().is_loading());
        assert!(controller.snapshot().current.is_none());
    }

    #[tokio::test]
    async fn uses_configuration_at_call_time() {
        let controller = Controller::new(
            ScriptedGenerator::with_responses([Ok(full_response("Later"))]),
            ConfigOptions::default(),
        );
        controller.set_config(config());
        let car = controller.generate().await.unwrap();
        assert_eq!(car.style, CarStyle::LuxurySuv);
        assert_eq!(controller.config(), config());
    }
}
