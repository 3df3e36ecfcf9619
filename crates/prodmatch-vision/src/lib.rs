//! prodmatch-vision
//!
//! Client for the image extraction service. [`ImageInput`] validates the
//! upload, [`GeminiExtractor`] sends it to a Gemini `generateContent`
//! endpoint and decodes the answer into an
//! [`Extraction`](prodmatch_core::extraction::Extraction).

pub mod gemini;
pub mod image;

pub use gemini::GeminiExtractor;
pub use image::{ImageInput, SUPPORTED_MIME_TYPES};
