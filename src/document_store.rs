//! MongoDB connector for the document-store slot

use std::time::Duration;

use mongodb::bson::doc;
use mongodb::options::ClientOptions;
use mongodb::Client;
use tracing::debug;

use crate::connection::Connector;
use crate::error::ConnectionError;

const STORE: &str = "MongoDB";

/// Builds `mongodb::Client` handles and checks them with `ping`
#[derive(Debug, Clone)]
pub struct MongoConnector {
    connect_timeout: Duration,
}

impl MongoConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Connector for MongoConnector {
    type Handle = Client;

    fn name(&self) -> &'static str {
        STORE
    }

    async fn open(&self, target: &str) -> Result<Client, ConnectionError> {
        let mut options = ClientOptions::parse(target)
            .await
            .map_err(|e| connection_failed(e.to_string()))?;

        // The driver connects lazily; bound its own waits to the slot deadline.
        options.connect_timeout = Some(self.connect_timeout);
        options.server_selection_timeout = Some(self.connect_timeout);

        let client = Client::with_options(options).map_err(|e| connection_failed(e.to_string()))?;
        debug!(store = STORE, "Client created");
        Ok(client)
    }

    async fn probe(&self, handle: &Client) -> Result<(), ConnectionError> {
        handle
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map(|_| ())
            .map_err(|e| ConnectionError::HealthCheckFailed {
                store: STORE,
                reason: e.to_string(),
            })
    }

    async fn close(&self, handle: Client) {
        handle.shutdown().await;
    }
}

fn connection_failed(reason: String) -> ConnectionError {
    ConnectionError::ConnectionFailed {
        store: STORE,
        reason,
    }
}
