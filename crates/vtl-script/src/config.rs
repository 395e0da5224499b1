//! Engine configuration shared by the operation layer.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Re-check the sort contract of streams served by external sources.
    /// A violation surfaces as a precondition error in the stream.
    pub verify_sorted_inputs: bool,

    /// Capacity hint for the buffer used when an operation has to sort a
    /// stream locally.
    pub sort_buffer_hint: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            verify_sorted_inputs: false,
            sort_buffer_hint: None,
        }
    }
}

impl EngineConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `VTL_VERIFY_SORTED_INPUTS`: re-check sort contracts (bool)
    /// - `VTL_SORT_BUFFER_HINT`: local sort buffer capacity hint
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(s) = std::env::var("VTL_VERIFY_SORTED_INPUTS") {
            if let Ok(v) = s.parse::<bool>() {
                cfg.verify_sorted_inputs = v;
            }
        }

        if let Ok(s) = std::env::var("VTL_SORT_BUFFER_HINT") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.sort_buffer_hint = Some(v);
            }
        }

        cfg
    }
}
