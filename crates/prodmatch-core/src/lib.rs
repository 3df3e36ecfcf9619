//! prodmatch-core
//!
//! Shared model for matching image-extracted product descriptions against a
//! catalog: item/hit types, collaborator traits, the error taxonomy, the
//! text normalizer and configuration loading.

#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod config;
pub mod error;
pub mod extraction;
pub mod normalize;
pub mod traits;
pub mod types;

pub use error::{Error, ErrorKind, Result};
pub use normalize::normalize;
