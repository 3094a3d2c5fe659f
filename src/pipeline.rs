//! The two-stage generation sequence: structured text first, then the image.

use std::fmt;

use serde::Serialize;

use crate::error::GenerationError;
use crate::generation::CarGenerator;
use crate::model::{CarDefaults, CarModel, ConfigOptions, PartialCarAttributes};

/// Name used for the render stage and the image prompt when the text model gave none.
pub const CONCEPT_NAME: &str = "Concept";

/// The call currently in flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "stage", rename_all = "camelCase")]
pub enum Stage {
    Analyzing,
    Rendering { name: String },
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Analyzing => f.write_str("Analyzing aerodynamic profiles"),
            Stage::Rendering { name } => write!(f, "Rendering {name} visuals"),
        }
    }
}

/// Output of the text stage, consumed by the image stage.
#[derive(Debug, Clone)]
pub struct Draft {
    config: ConfigOptions,
    attributes: PartialCarAttributes,
    name: String,
}

impl Draft {
    /// Name the image stage renders under.
    pub fn name(&self) -> &str {
        &self.name
    }
}

pub struct Pipeline<'a, G> {
    generator: &'a G,
    defaults: &'a CarDefaults,
}

impl<'a, G: CarGenerator> Pipeline<'a, G> {
    pub fn new(generator: &'a G, defaults: &'a CarDefaults) -> Self {
        Self {
            generator,
            defaults,
        }
    }

    pub async fn draft(&self, config: ConfigOptions) -> Result<Draft, GenerationError> {
        let attributes = self.generator.request_car_data(&config).await?;
        let name = attributes.name_or(CONCEPT_NAME).to_owned();
        Ok(Draft {
            config,
            attributes,
            name,
        })
    }

    pub async fn render(&self, draft: Draft) -> Result<CarModel, GenerationError> {
        let image_url = self
            .generator
            .request_car_image(&draft.config, &draft.name)
            .await?;
        let attributes = draft.attributes.reconcile(self.defaults);
        Ok(CarModel::assemble(&draft.config, attributes, image_url))
    }

    /// Runs both stages in order, reporting each stage before its call is issued.
    pub async fn run(
        &self,
        config: ConfigOptions,
        mut on_stage: impl FnMut(Stage) + Send,
    ) -> Result<CarModel, GenerationError> {
        on_stage(Stage::Analyzing);
        let draft = self.draft(config).await?;
        on_stage(Stage::Rendering {
            name: draft.name().to_owned(),
        });
        self.render(draft).await
    }
}
