use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::time::Duration;
use tracing::{error, info};
use serde_json::Value;
use surgefare_core::CoreError;

use crate::app_config::PricingRules;

#[derive(Clone)]
pub struct DbClient {
    pub pool: Pool<Postgres>,
}

impl DbClient {
    pub async fn new(connection_string: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(connection_string)
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("../migrations")
            .run(&self.pool)
            .await?;
        info!("Migrations completed successfully.");
        Ok(())
    }

    /// Overlay rows from `pricing_rules` on top of the file-based defaults.
    /// Rows are `{"value": <number>}` keyed by the `PricingRules` field name.
    pub async fn fetch_pricing_rules(&self, defaults: PricingRules) -> Result<PricingRules, sqlx::Error> {
        let rows: Vec<(String, Value)> = sqlx::query_as("SELECT rule_key, rule_value FROM pricing_rules")
            .fetch_all(&self.pool)
            .await?;

        let mut rules = defaults;
        for (key, value) in rows {
            apply_rule(&mut rules, &key, &value);
        }
        Ok(rules)
    }
}

fn apply_rule(rules: &mut PricingRules, key: &str, value: &Value) {
    let Some(n) = value.get("value").and_then(Value::as_u64) else {
        return;
    };
    match key {
        "surge_threshold" => rules.surge_threshold = n,
        "attempt_window_seconds" => rules.attempt_window_seconds = n,
        "surge_percent" => {
            if let Ok(pct) = u32::try_from(n) {
                rules.surge_percent = pct;
            }
        }
        "surge_duration_seconds" => rules.surge_duration_seconds = n,
        "attempt_retention_seconds" => rules.attempt_retention_seconds = n,
        _ => {}
    }
}

/// Map a driver error to an internal core error, logging the detail.
pub(crate) fn db_error(e: sqlx::Error) -> CoreError {
    error!("Database error: {}", e);
    CoreError::InternalError(e.to_string())
}
