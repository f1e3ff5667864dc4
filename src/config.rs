//! Engine configuration.

use crate::model::OrderCategory;

/// Configuration for the intake engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Prefix for generated order numbers (`PREFIX-YYYY-NNN`).
    pub order_prefix: String,
    /// Category assigned to orders created implicitly from a mail.
    pub default_category: OrderCategory,
    /// Customer name used when a mail carries neither address nor name.
    pub placeholder_customer: String,
    /// Order title used when the mail subject is empty.
    pub fallback_order_title: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            order_prefix: "W".to_string(),
            default_category: OrderCategory::Repair,
            placeholder_customer: "Walk-in customer".to_string(),
            fallback_order_title: "Mail without subject".to_string(),
        }
    }
}

impl EngineConfig {
    /// Build config from `MAIL_INTAKE_*` environment variables,
    /// falling back to the defaults for anything unset.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let default_category = std::env::var("MAIL_INTAKE_DEFAULT_CATEGORY")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.default_category);

        Self {
            order_prefix: std::env::var("MAIL_INTAKE_ORDER_PREFIX")
                .unwrap_or(defaults.order_prefix),
            default_category,
            placeholder_customer: std::env::var("MAIL_INTAKE_PLACEHOLDER_CUSTOMER")
                .unwrap_or(defaults.placeholder_customer),
            fallback_order_title: std::env::var("MAIL_INTAKE_FALLBACK_TITLE")
                .unwrap_or(defaults.fallback_order_title),
        }
    }
}
