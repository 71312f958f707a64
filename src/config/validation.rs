//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate endpoint URLs and faucet templates
//! - Validate value ranges (polling interval > 0, gas limit > 0)
//! - Detect duplicate network ids
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ClientConfig → Result<(), Vec<ValidationError>>

use std::collections::HashSet;
use std::fmt;

use crate::config::schema::ClientConfig;

/// Placeholder substituted with the checksummed address in faucet URLs.
pub const FAUCET_ADDRESS_PLACEHOLDER: &str = "$ADDRESS";

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate that a URL is well-formed and uses HTTP or HTTPS.
pub fn validate_url(url: &str) -> bool {
    match url::Url::parse(url) {
        Ok(parsed) => {
            let scheme = parsed.scheme();
            (scheme == "http" || scheme == "https") && parsed.host().is_some()
        }
        Err(_) => false,
    }
}

/// Check a parsed configuration for semantic errors.
pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for (i, network) in config.networks.iter().enumerate() {
        let prefix = format!("networks[{}]", i);

        if !seen.insert(network.network_id) {
            errors.push(ValidationError::new(
                format!("{prefix}.network_id"),
                format!("duplicate network id {:#x}", network.network_id),
            ));
        }

        if !validate_url(&network.rpc_url) {
            errors.push(ValidationError::new(
                format!("{prefix}.rpc_url"),
                format!("invalid RPC URL '{}'", network.rpc_url),
            ));
        }

        if network.has_faucet() {
            let template = &network.faucet_url_template;
            if !template.contains(FAUCET_ADDRESS_PLACEHOLDER) {
                errors.push(ValidationError::new(
                    format!("{prefix}.faucet_url_template"),
                    format!("missing {FAUCET_ADDRESS_PLACEHOLDER} placeholder"),
                ));
            } else if !validate_url(&template.replace(FAUCET_ADDRESS_PLACEHOLDER, "0x0")) {
                errors.push(ValidationError::new(
                    format!("{prefix}.faucet_url_template"),
                    format!("invalid faucet URL '{}'", template),
                ));
            }
        }
    }

    if config.receipts.interval_ms == 0 {
        errors.push(ValidationError::new("receipts.interval_ms", "must be greater than 0"));
    }
    if config.receipts.max_attempts == 0 {
        errors.push(ValidationError::new("receipts.max_attempts", "must be greater than 0"));
    }
    if config.transactions.default_gas_limit == 0 {
        errors.push(ValidationError::new(
            "transactions.default_gas_limit",
            "must be greater than 0",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
