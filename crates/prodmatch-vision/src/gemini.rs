use serde_json::{json, Value};

use prodmatch_core::config::ExtractionSettings;
use prodmatch_core::extraction::{clip, parse_envelope, Extraction};
use prodmatch_core::{Error, Result};

use crate::image::ImageInput;

const EXTRACTION_PROMPT: &str = r#"Act as a product recognition and text extraction system and analyze the image carefully.

First read every piece of visible text: labels, packaging, signs and handwriting.
Then list every distinct product in the image with as much detail as can be seen.

Answer with one JSON object with exactly two keys:
- "products": an array with one object per product, or [] when there are none.
- "extracted_text": a string with all text found in the image, or null.

Each product object has these keys (null when unknown):
- "brand": brand name
- "product_name": specific product name
- "type": general category such as "Shampoo", "Coffee Mug" or "Pen"
- "size": size, volume or quantity such as "500ml" or "12-pack"
- "visible_text": text printed on this product or its packaging
- "keywords": array of 5 to 8 search keywords for this product, most relevant first
- "description": short description of this product
- "color": main colors, comma separated
- "material": main materials, comma separated

Example:
{"products":[{"brand":"PenBrand","product_name":"Gel Pen Fine Point","type":"Pen","size":null,"visible_text":"0.5mm Black Ink","keywords":["gel pen","fine point","black ink","writing"],"description":"Black gel pen with a 0.5mm tip.","color":"black","material":"plastic"}],"extracted_text":"0.5mm Black Ink\nBuy Milk"}

When nothing can be identified answer {"products": [], "extracted_text": null}.
Output only the JSON object."#;

/// Client for a Gemini `generateContent` endpoint.
pub struct GeminiExtractor {
    client: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl GeminiExtractor {
    /// Build a client with the configured timeout. A missing API key is a
    /// configuration error.
    pub fn from_settings(settings: &ExtractionSettings) -> Result<Self> {
        let api_key = settings
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| Error::InvalidConfig("extraction.api_key is not set".into()))?;
        let client = reqwest::Client::builder()
            .timeout(settings.timeout())
            .build()
            .map_err(|e| Error::InvalidConfig(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_key: api_key.to_string(),
            model: settings.model.clone(),
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
        })
    }

    /// Endpoint URL without the key, safe to log.
    pub fn request_url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }

    /// Send one image and decode the identified products and text.
    pub async fn extract(&self, image: &ImageInput) -> Result<Extraction> {
        let url = self.request_url();
        tracing::info!(model = %self.model, mime = %image.mime_type, bytes = image.bytes.len(), "requesting extraction");
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&build_request_body(image))
            .send()
            .await
            .map_err(|e| {
                let what = if e.is_timeout() { "timed out" } else { "unreachable" };
                tracing::error!(error = %e, "extraction service {what}");
                Error::extraction(format!("extraction service {what}: {}", e.without_url()), None)
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::extraction(format!("failed to read extraction response: {}", e.without_url()), None))?;
        if !status.is_success() {
            let message = upstream_error_message(status.as_u16(), &body);
            tracing::error!(status = status.as_u16(), %message, "extraction service returned an error");
            return Err(Error::extraction(message, Some(clip(&body))));
        }
        parse_envelope(&body).inspect_err(|e| tracing::error!(error = %e, "extraction response rejected"))
    }
}

/// Request body: the prompt, the inline image and a generation config that
/// asks for deterministic JSON.
pub fn build_request_body(image: &ImageInput) -> Value {
    json!({
        "contents": [{
            "parts": [
                { "text": EXTRACTION_PROMPT },
                { "inline_data": { "mime_type": image.mime_type, "data": image.to_base64() } }
            ]
        }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "temperature": 0.1,
            "topP": 0.95,
            "topK": 40,
            "maxOutputTokens": 2048
        }
    })
}

/// Readable message for a non-success response, preferring the upstream
/// `error.message`.
pub fn upstream_error_message(status: u16, body: &str) -> String {
    let detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.pointer("/error/message").and_then(Value::as_str).map(str::to_string));
    match detail {
        Some(detail) => format!("API error ({status}): {detail}"),
        None => format!("API error ({status})"),
    }
}
