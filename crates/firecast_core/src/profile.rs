//! Portable parameter profiles
//!
//! A profile is a JSON envelope around a flat map of known parameter keys.
//! Unknown keys are dropped in both directions so a profile can never inject
//! settings the simulator does not understand.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::DataError;
use crate::io::atomic_write;

pub const PROFILE_SCHEMA_VERSION: &str = "1.0.0";

pub const ALLOWED_PROFILE_KEYS: &[&str] = &[
    "profile_name",
    // portfolio and market
    "initial_wealth",
    "monthly_contribution",
    "contribution_growth_rate",
    "expected_return",
    "volatility",
    "inflation_rate",
    "annual_spending",
    "swr",
    "current_age",
    "target_age",
    "years",
    "years_in_retirement",
    "return_strategy",
    // taxes
    "fiscal_mode",
    "fiscal_regime",
    "include_optimization",
    "intl_tax_rates",
    "taxable_withdrawal_ratio",
    "tax_year",
    "region",
    // housing
    "home_savings",
    "include_rental_income",
    "rental_gross_annual",
    "rental_costs_pct",
    "rental_irpf_pct",
    "primary_mortgage",
    "investment_mortgage",
    // pensions
    "official_pension_age",
    "public_pension_start_age",
    "pension_adjustment_pct",
    "public_pension_net_annual",
    "private_plan_start_age",
    "private_plan_duration_years",
    "private_plan_net_annual",
    "other_income_post_retirement",
    "pre_pension_extra_cost",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileEnvelope {
    pub schema_version: String,
    pub created_at: String,
    pub app_version: String,
    pub config: Map<String, Value>,
}

fn is_allowed(key: &str) -> bool {
    ALLOWED_PROFILE_KEYS.contains(&key)
}

/// Wrap the allowed subset of `params` in a timestamped envelope.
#[must_use]
pub fn serialize_profile(params: &Map<String, Value>) -> ProfileEnvelope {
    let config = params
        .iter()
        .filter(|(key, _)| is_allowed(key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    ProfileEnvelope {
        schema_version: PROFILE_SCHEMA_VERSION.to_string(),
        created_at: jiff::Timestamp::now().to_string(),
        app_version: env!("CARGO_PKG_VERSION").to_string(),
        config,
    }
}

/// Extract the allowed config from an arbitrary payload.
///
/// Never fails: a payload that cannot be used yields an empty config and a
/// warning explaining why.
pub fn deserialize_profile(payload: &Value) -> (Map<String, Value>, Vec<String>) {
    let Some(object) = payload.as_object() else {
        return (
            Map::new(),
            vec!["invalid format: profile must be a JSON object".to_string()],
        );
    };

    let mut warnings = Vec::new();
    if let Some(version) = object.get("schema_version").and_then(Value::as_str)
        && !version.is_empty()
        && version != PROFILE_SCHEMA_VERSION
    {
        warnings.push(format!(
            "different schema version ({version}); attempting partial compatibility"
        ));
    }

    let Some(raw) = object.get("config").and_then(Value::as_object) else {
        return (
            Map::new(),
            vec!["invalid format: missing 'config' block".to_string()],
        );
    };

    let mut config = Map::new();
    for (key, value) in raw {
        if is_allowed(key) {
            config.insert(key.clone(), value.clone());
        } else {
            warnings.push(format!("unrecognized key ignored: {key}"));
        }
    }
    (config, warnings)
}

pub fn save_profile(path: &Path, params: &Map<String, Value>) -> Result<(), DataError> {
    let envelope = serialize_profile(params);
    let content = serde_json::to_string_pretty(&envelope).map_err(|source| DataError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    atomic_write(path, &content).map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_profile(path: &Path) -> Result<(Map<String, Value>, Vec<String>), DataError> {
    let content = fs::read_to_string(path).map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let payload: Value = serde_json::from_str(&content).map_err(|source| DataError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let (config, warnings) = deserialize_profile(&payload);
    for warning in &warnings {
        tracing::warn!(path = %path.display(), "{warning}");
    }
    Ok((config, warnings))
}
