use std::future::Future;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::GenerationError;
use crate::model::{ConfigOptions, PartialCarAttributes};
use crate::session::HttpSession;
use crate::util::{data_uri, truncate_chars};

pub const DEFAULT_TEXT_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";

const IMAGE_ASPECT_RATIO: &str = "16:9";
const DEFAULT_IMAGE_MIME: &str = "image/png";
const MAX_ERROR_BODY: usize = 2000;

/// The two calls a generation cycle makes against the generative service.
///
/// Each call is a single attempt; implementations do not retry.
pub trait CarGenerator: Send + Sync {
    /// Ask the text model for structured car attributes.
    fn request_car_data(
        &self,
        config: &ConfigOptions,
    ) -> impl Future<Output = Result<PartialCarAttributes, GenerationError>> + Send;

    /// Ask the image model for a picture of `car_name`.
    ///
    /// Returns a `data:` URI, or an empty string when the response holds no image.
    fn request_car_image(
        &self,
        config: &ConfigOptions,
        car_name: &str,
    ) -> impl Future<Output = Result<String, GenerationError>> + Send;
}

/// `CarGenerator` backed by the REST `generateContent` API.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    session: HttpSession,
    text_model: String,
    image_model: String,
}

impl GeminiClient {
    pub fn new(
        session: HttpSession,
        text_model: impl Into<String>,
        image_model: impl Into<String>,
    ) -> Self {
        Self {
            session,
            text_model: text_model.into(),
            image_model: image_model.into(),
        }
    }

    async fn generate_content(
        &self,
        model: &str,
        payload: &Value,
    ) -> Result<GenerateContentResponse, GenerationError> {
        let url = self.session.generate_content_url(model)?;
        tracing::debug!(%model, base = %self.session.base_url(), "sending generateContent request");

        let response = self.session.client().post(url).json(payload).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(GenerationError::Upstream {
                status: status.as_u16(),
                body: truncate_chars(&body, MAX_ERROR_BODY),
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

impl CarGenerator for GeminiClient {
    async fn request_car_data(
        &self,
        config: &ConfigOptions,
    ) -> Result<PartialCarAttributes, GenerationError> {
        let payload = build_car_data_payload(&car_data_prompt(config));
        let response = self.generate_content(&self.text_model, &payload).await?;
        let text = response.text().ok_or(GenerationError::MissingText)?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn request_car_image(
        &self,
        config: &ConfigOptions,
        car_name: &str,
    ) -> Result<String, GenerationError> {
        let payload = build_image_payload(&car_image_prompt(config, car_name));
        let response = self.generate_content(&self.image_model, &payload).await?;

        match response.first_inline_image() {
            Some(image) => Ok(data_uri(
                image.mime_type.as_deref().unwrap_or(DEFAULT_IMAGE_MIME),
                &image.data,
            )),
            None => {
                tracing::warn!(car = car_name, "image response carried no inline image");
                Ok(String::new())
            }
        }
    }
}

fn car_data_prompt(config: &ConfigOptions) -> String {
    format!(
        "Generate a futuristic car model based on these parameters:\n\
         Style: {style}\n\
         Energy Source: {fuel}\n\
         Primary Color: {color}\n\
         Extra Context: {extra}\n\n\
         Return a JSON object describing this car. Include a creative name, a fictional \
         high-end brand name, a detailed two-paragraph marketing description, technical \
         specifications (topSpeed in mph, acceleration as 0-60 seconds, range in miles, \
         horsepower), a list of 4 key innovative features and a launch year.",
        style = config.style,
        fuel = config.fuel,
        color = config.color,
        extra = config.additional_prompt,
    )
}

fn car_image_prompt(config: &ConfigOptions, car_name: &str) -> String {
    format!(
        "Professional studio automotive photography of a {style}, car name \"{car_name}\", \
         color {color}. The car should be {fuel} themed. Futuristic design, sleek \
         aerodynamics, 8k resolution, cinematic lighting, highly detailed textures, carbon \
         fiber accents, realistic lighting reflections. No text in the image.",
        style = config.style,
        color = config.color,
        fuel = config.fuel,
    )
}

fn car_data_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "name": { "type": "STRING" },
            "brand": { "type": "STRING" },
            "description": { "type": "STRING" },
            "specs": {
                "type": "OBJECT",
                "properties": {
                    "topSpeed": { "type": "NUMBER" },
                    "acceleration": { "type": "NUMBER" },
                    "range": { "type": "NUMBER" },
                    "horsepower": { "type": "NUMBER" },
                },
                "required": ["topSpeed", "acceleration", "range", "horsepower"],
            },
            "features": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
            },
            "launchYear": { "type": "NUMBER" },
        },
        "required": ["name", "brand", "description", "specs", "features", "launchYear"],
    })
}

fn build_car_data_payload(prompt: &str) -> Value {
    json!({
        "contents": [
            {
                "role": "user",
                "parts": [{ "text": prompt }],
            }
        ],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": car_data_schema(),
        },
    })
}

fn build_image_payload(prompt: &str) -> Value {
    json!({
        "contents": [
            {
                "role": "user",
                "parts": [{ "text": prompt }],
            }
        ],
        "generationConfig": {
            "imageConfig": { "aspectRatio": IMAGE_ASPECT_RATIO },
        },
    })
}

#[derive(Debug, Default, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Default, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    text: Option<String>,
    inline_data: Option<InlineData>,
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: Option<String>,
    data: String,
}

impl GenerateContentResponse {
    fn first_parts(&self) -> &[Part] {
        self.candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .map(|content| content.parts.as_slice())
            .unwrap_or_default()
    }

    /// Concatenated text of the first candidate, skipping thought summaries.
    fn text(&self) -> Option<String> {
        let mut text = None::<String>;
        for part in self.first_parts().iter().filter(|part| !part.thought) {
            if let Some(segment) = &part.text {
                text.get_or_insert_with(String::new).push_str(segment);
            }
        }
        text
    }

    fn first_inline_image(&self) -> Option<&InlineData> {
        self.first_parts()
            .iter()
            .find_map(|part| part.inline_data.as_ref())
    }
}
