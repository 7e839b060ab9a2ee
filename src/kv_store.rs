//! Redis connector for the key-value-store slot

use std::time::Duration;

use redis::aio::MultiplexedConnection;
use tracing::debug;

use crate::connection::{Connector, Timeouts};
use crate::error::ConnectionError;

const STORE: &str = "Redis";

/// Opens multiplexed Redis connections and checks them with `PING`
///
/// Every command on the connection, not just the probe, is bounded by the
/// probe deadline.
#[derive(Debug, Clone)]
pub struct RedisConnector {
    connect_timeout: Duration,
    response_timeout: Duration,
}

impl RedisConnector {
    pub fn new(timeouts: Timeouts) -> Self {
        Self {
            connect_timeout: timeouts.connect,
            response_timeout: timeouts.probe,
        }
    }
}

impl Connector for RedisConnector {
    type Handle = MultiplexedConnection;

    fn name(&self) -> &'static str {
        STORE
    }

    async fn open(&self, target: &str) -> Result<MultiplexedConnection, ConnectionError> {
        let client = redis::Client::open(target).map_err(|e| ConnectionError::ConnectionFailed {
            store: STORE,
            reason: format!("invalid URI: {}", e),
        })?;

        let conn = client
            .get_multiplexed_async_connection_with_timeouts(
                self.response_timeout,
                self.connect_timeout,
            )
            .await
            .map_err(|e| ConnectionError::ConnectionFailed {
                store: STORE,
                reason: e.to_string(),
            })?;

        debug!(store = STORE, "Multiplexed connection opened");
        Ok(conn)
    }

    async fn probe(&self, handle: &MultiplexedConnection) -> Result<(), ConnectionError> {
        let mut conn = handle.clone();
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| ConnectionError::HealthCheckFailed {
                store: STORE,
                reason: e.to_string(),
            })?;

        if pong == "PONG" {
            Ok(())
        } else {
            Err(ConnectionError::HealthCheckFailed {
                store: STORE,
                reason: format!("unexpected reply {:?}", pong),
            })
        }
    }

    async fn close(&self, handle: MultiplexedConnection) {
        // The driver task shuts down once the last clone is dropped.
        drop(handle);
    }
}
