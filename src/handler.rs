use chrono::{DateTime, Utc};
use mongodb::bson::doc;
use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::connection::{ConnectionSlot, Connector, TargetSource};
use crate::document_store::MongoConnector;
use crate::error::HandlerError;
use crate::kv_store::RedisConnector;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GreetRequest {
    pub name: String,
}

#[derive(Debug, Deserialize, Serialize, PartialEq)]
pub struct GreetResponse {
    pub success: bool,
    pub message: String,
}

// One record per greeted name in the document store
#[derive(Debug, Deserialize, Serialize)]
struct NameDocument {
    name: String,
    #[serde(rename = "createdAt")]
    created_at: i64,
}

/// Connection slots shared by every invocation in this container
pub struct AppState {
    pub settings: Settings,
    pub documents: ConnectionSlot<MongoConnector>,
    pub counters: ConnectionSlot<RedisConnector>,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        let documents = ConnectionSlot::new(
            MongoConnector::new(settings.timeouts.connect),
            TargetSource::env(settings.mongodb_uri_var.as_str()),
            settings.timeouts,
        );
        let counters = ConnectionSlot::new(
            RedisConnector::new(settings.timeouts),
            TargetSource::env(settings.redis_uri_var.as_str()),
            settings.timeouts,
        );
        Self {
            settings,
            documents,
            counters,
        }
    }

    /// Log the phase and most recent error of both slots after a failed invocation
    pub async fn log_slot_status(&self) {
        log_slot(&self.documents).await;
        log_slot(&self.counters).await;
    }
}

async fn log_slot<C: Connector>(slot: &ConnectionSlot<C>) {
    let phase = slot.phase().await;
    match slot.last_error().await {
        Some(err) => tracing::warn!(?phase, last_error = %err, "Connection slot status"),
        None => tracing::debug!(?phase, "Connection slot status"),
    }
}

// Format as "January 2, 2006 at 3:04 PM UTC"
fn format_created_at(created_at_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(created_at_ms)
        .unwrap_or_default()
        .format("%B %-d, %Y at %-I:%M %p UTC")
        .to_string()
}

fn greeting(name: &str, count: i64, created_at_ms: i64) -> String {
    format!(
        "Hello, {}! You have been greeted {} times since {}.",
        name,
        count,
        format_created_at(created_at_ms)
    )
}

fn counter_key(name: &str) -> String {
    format!("counter:{}", name)
}

// Blank names are rejected; anything else is used exactly as sent
fn validated_name(request: &GreetRequest) -> Result<&str, HandlerError> {
    if request.name.trim().is_empty() {
        return Err(HandlerError::InvalidInput("name must not be empty".into()));
    }
    Ok(request.name.as_str())
}

// Main Lambda handler - records the name once and counts every greeting
pub async fn function_handler(
    state: &AppState,
    request: GreetRequest,
) -> Result<GreetResponse, HandlerError> {
    let name = validated_name(&request)?;

    // Handles are re-acquired every invocation so each one is health-checked
    let client = state.documents.get_or_create().await?;
    let collection = client
        .database(&state.settings.database)
        .collection::<NameDocument>(&state.settings.collection);

    let created_at = match collection.find_one(doc! { "name": name }).await? {
        Some(existing) => existing.created_at,
        None => {
            let record = NameDocument {
                name: name.to_string(),
                created_at: Utc::now().timestamp_millis(),
            };
            collection.insert_one(&record).await?;
            tracing::info!(name, "Recorded first greeting");
            record.created_at
        }
    };

    let mut conn = state.counters.get_or_create().await?;
    let count: i64 = redis::cmd("INCR")
        .arg(counter_key(name))
        .query_async(&mut conn)
        .await?;

    Ok(GreetResponse {
        success: true,
        message: greeting(name, count, created_at),
    })
}
