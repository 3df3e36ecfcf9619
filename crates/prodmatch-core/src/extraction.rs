//! Decoding of the extraction service's output into [`IdentifiedItem`]s.
//!
//! The service answers with a `generateContent`-style envelope whose first
//! candidate part carries a JSON document shaped like
//! `{"products": [...], "extracted_text": "..." | null}`. Anything short of
//! a `products` array is fatal for the request; missing item fields are
//! filled with `None`, bad `keywords` become an empty list, and color and
//! material tokens are appended to `keywords`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::types::IdentifiedItem;

/// Upstream bodies are clipped to this many characters when attached to
/// errors.
pub const RAW_SNIPPET_CHARS: usize = 1000;

const TEXT_POINTER: &str = "/candidates/0/content/parts/0/text";

/// Decoded extraction payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Extraction {
    pub products: Vec<IdentifiedItem>,
    pub extracted_text: Option<String>,
    /// The model text this was decoded from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_output: Option<String>,
}

/// Decode a full response envelope body.
pub fn parse_envelope(body: &str) -> Result<Extraction> {
    let envelope: Value = serde_json::from_str(body).map_err(|e| {
        Error::extraction(format!("error decoding response from extraction service: {e}"), Some(clip(body)))
    })?;
    let text = envelope
        .pointer(TEXT_POINTER)
        .and_then(Value::as_str)
        .ok_or_else(|| Error::extraction("unexpected response structure: missing text part", Some(clip(body))))?;
    parse_model_text(text)
}

/// Decode the model's JSON text (the inner document of the envelope).
pub fn parse_model_text(text: &str) -> Result<Extraction> {
    let doc: Value = serde_json::from_str(text).map_err(|e| {
        Error::extraction(format!("failed to decode JSON from model response: {e}"), Some(text.to_string()))
    })?;

    let products = match doc.get("products") {
        Some(Value::Array(products)) => products,
        _ => {
            return Err(Error::malformed(
                "response JSON does not contain the expected 'products' array",
                Some(text.to_string()),
            ))
        }
    };

    let mut items = Vec::with_capacity(products.len());
    for (index, product) in products.iter().enumerate() {
        if !product.is_object() {
            return Err(Error::malformed(
                format!("item at index {index} in 'products' array is not an object"),
                Some(text.to_string()),
            ));
        }
        let mut item = IdentifiedItem::deserialize(product)
            .map_err(|e| Error::malformed(format!("item at index {index}: {e}"), Some(text.to_string())))?;
        item.merge_attribute_keywords();
        items.push(item);
    }

    let extracted_text = match doc.get("extracted_text") {
        Some(Value::String(s)) => Some(s.clone()),
        _ => None,
    };

    tracing::debug!(items = items.len(), has_text = extracted_text.is_some(), "decoded extraction payload");
    Ok(Extraction { products: items, extracted_text, raw_output: Some(text.to_string()) })
}

/// First [`RAW_SNIPPET_CHARS`] characters of `raw`.
pub fn clip(raw: &str) -> String {
    raw.chars().take(RAW_SNIPPET_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn missing_fields_default_to_none() {
        let out = parse_model_text(r#"{"products":[{"product_name":"Gel Pen"}],"extracted_text":null}"#).unwrap();
        let item = &out.products[0];
        assert_eq!(item.product_name.as_deref(), Some("Gel Pen"));
        assert!(item.brand.is_none() && item.kind.is_none() && item.size.is_none());
        assert!(item.keywords.is_empty());
        assert!(out.extracted_text.is_none());
    }

    #[test]
    fn malformed_keywords_are_coerced_to_empty() {
        let out = parse_model_text(r#"{"products":[{"keywords":"pen, ink"},{"keywords":["a",3,null,"b"]}]}"#).unwrap();
        assert!(out.products[0].keywords.is_empty());
        assert_eq!(out.products[1].keywords, vec!["a", "3", "b"]);
    }

    #[test]
    fn color_and_material_tokens_join_keywords() {
        let out = parse_model_text(
            r#"{"products":[{"keywords":["mug","Blue"],"color":"Blue, white,","material":" ceramic ,mug"}]}"#,
        )
        .unwrap();
        assert_eq!(out.products[0].keywords, vec!["mug", "Blue", "white", "ceramic"]);
        assert_eq!(out.products[0].color.as_deref(), Some("Blue, white,"));

        let bare = parse_model_text(r#"{"products":[{"keywords":"oops","color":"red"}]}"#).unwrap();
        assert_eq!(bare.products[0].keywords, vec!["red"]);
    }

    #[test]
    fn successful_decode_keeps_model_text() {
        let text = r#"{"products":[],"extracted_text":"Buy Milk"}"#;
        let out = parse_model_text(text).unwrap();
        assert_eq!(out.raw_output.as_deref(), Some(text));
    }

    #[test]
    fn envelope_without_text_part_is_an_extraction_failure() {
        let err = parse_envelope(r#"{"candidates":[]}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExtractionFailure);
        assert!(err.raw_output().is_some());
    }

    #[test]
    fn clip_is_char_bounded() {
        let long = "é".repeat(RAW_SNIPPET_CHARS + 10);
        assert_eq!(clip(&long).chars().count(), RAW_SNIPPET_CHARS);
    }
}
