//! Column transforms applied after feature engineering.
//!
//! This module provides:
//! - Standardization (zero mean, unit population variance)
//! - Min-max normalization to `[0, 1]`
//! - One-hot encoding with an optional reference level

mod encoding;
mod scaling;

pub use encoding::{EncodingOutcome, OneHotEncoder};
pub use scaling::{ScaledColumns, Scaler};
