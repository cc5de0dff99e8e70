//! Configuration management for the navigator bridge

use serde::Deserialize;
use std::env;

use crate::error::{BridgeError, Result};
use crate::host::Fit;

/// Bridge-wide tunables
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BridgeConfig {
    /// Slack around clickable rects when hit-testing decorations, in px
    pub click_tolerance: f64,
    /// Characters of context captured before and after a selection
    pub selection_context_chars: usize,
    /// Attribute marking the clickable parts of a decoration template
    pub activation_attribute: String,
    /// Fit policy used until the host sets one
    pub default_fit: Fit,
    /// `tracing` filter directive for the replay tool
    pub log_filter: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        BridgeConfig {
            click_tolerance: 1.0,
            selection_context_chars: 200,
            activation_attribute: "data-activable".to_string(),
            default_fit: Fit::Contain,
            log_filter: "navigator_bridge=info".to_string(),
        }
    }
}

impl BridgeConfig {
    /// Read `NAVIGATOR_*` variables, keeping defaults for unset or invalid ones
    pub fn from_env() -> Self {
        let defaults = BridgeConfig::default();

        BridgeConfig {
            click_tolerance: parse_var("NAVIGATOR_CLICK_TOLERANCE", defaults.click_tolerance),
            selection_context_chars: parse_var(
                "NAVIGATOR_SELECTION_CONTEXT",
                defaults.selection_context_chars,
            ),
            activation_attribute: env::var("NAVIGATOR_ACTIVATION_ATTRIBUTE")
                .unwrap_or(defaults.activation_attribute),
            default_fit: match env::var("NAVIGATOR_FIT").ok().as_deref() {
                Some(value) => Fit::from_name(value).unwrap_or_else(|| {
                    tracing::warn!("Invalid NAVIGATOR_FIT {:?}, using {:?}", value, defaults.default_fit);
                    defaults.default_fit
                }),
                None => defaults.default_fit,
            },
            log_filter: env::var("NAVIGATOR_LOG").unwrap_or(defaults.log_filter),
        }
    }

    /// Reject values no component can work with
    pub fn validate(&self) -> Result<()> {
        if !self.click_tolerance.is_finite() || self.click_tolerance < 0.0 {
            return Err(BridgeError::Config(format!(
                "click tolerance must be a non-negative number, got {}",
                self.click_tolerance
            )));
        }
        if self.activation_attribute.trim().is_empty() {
            return Err(BridgeError::Config(
                "activation attribute must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr + std::fmt::Debug>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid {}={:?}, using {:?}", name, raw, default);
            default
        }),
        Err(_) => default,
    }
}
