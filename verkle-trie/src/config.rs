//! Commitment-scheme configuration.
//!
//! Building the CRS and the barycentric weights is expensive, so the
//! configuration is computed once per process and shared read-only. It is
//! still passed by reference into the builder and verifier, so tests and
//! embedders can inject their own.

use crate::constants::{DEFAULT_TRANSCRIPT_LABEL, NODE_WIDTH};
use ipa_multipoint::{crs::CRS, lagrange_basis::PrecomputedWeights};
use once_cell::sync::Lazy;

/// Precomputed tables for committing and opening, plus the transcript
/// label both sides of the protocol must agree on.
pub struct Config {
    pub crs: CRS,
    pub precomputed_weights: PrecomputedWeights,
    pub transcript_label: &'static [u8],
}

impl Config {
    pub fn new() -> Config {
        Config {
            crs: CRS::default(),
            precomputed_weights: PrecomputedWeights::new(NODE_WIDTH),
            transcript_label: DEFAULT_TRANSCRIPT_LABEL,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::new()
    }
}

static CONFIG: Lazy<Config> = Lazy::new(Config::new);

/// The process-wide configuration.
pub fn config() -> &'static Config {
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_matches_the_tree_width() {
        let cfg = config();
        assert_eq!(cfg.crs.n, NODE_WIDTH);
        assert_eq!(cfg.precomputed_weights.domain_size(), NODE_WIDTH);
        assert_eq!(cfg.transcript_label, b"vt");
    }
}
