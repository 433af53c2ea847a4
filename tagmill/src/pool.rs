//! Endpoint pool - the fixed set of interchangeable backends
//!
//! Built once at startup from the configured endpoint list and read-only for
//! the rest of the process, so concurrent tasks can look slots up without any
//! locking. Slot order matters: it defines the round-robin sequence.

use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::config::Config;
use crate::llm::{ChatClient, LlmError, OpenAiClient};

/// Errors from pool construction or slot lookup
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("endpoint list is empty")]
    Empty,

    #[error("slot position {position} out of range for pool of {size}")]
    IndexOutOfRange { position: usize, size: usize },

    #[error("credential environment variable {env} is not set")]
    Credential { env: String },

    #[error(transparent)]
    Client(#[from] LlmError),
}

/// One endpoint: a position in the round-robin order, a model identity,
/// and the client that carries this endpoint's credential
pub struct EndpointSlot {
    pub position: usize,
    pub identity: String,
    pub client: Arc<dyn ChatClient>,
}

impl std::fmt::Debug for EndpointSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointSlot")
            .field("position", &self.position)
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

/// Fixed ordered list of endpoint slots
#[derive(Debug)]
pub struct EndpointPool {
    slots: Vec<EndpointSlot>,
}

impl EndpointPool {
    /// Build a pool from pre-constructed clients, in slot order
    pub fn new(endpoints: Vec<(String, Arc<dyn ChatClient>)>) -> Result<Self, PoolError> {
        if endpoints.is_empty() {
            return Err(PoolError::Empty);
        }

        let slots = endpoints
            .into_iter()
            .enumerate()
            .map(|(position, (identity, client))| EndpointSlot {
                position,
                identity,
                client,
            })
            .collect();

        Ok(Self { slots })
    }

    /// Build a pool from configuration, one client per configured endpoint
    ///
    /// Each endpoint's credential is read from its environment variable.
    pub fn from_config(config: &Config) -> Result<Self, PoolError> {
        debug!(endpoint_count = config.endpoints.len(), "EndpointPool::from_config: called");

        let mut endpoints: Vec<(String, Arc<dyn ChatClient>)> = Vec::with_capacity(config.endpoints.len());
        for endpoint in &config.endpoints {
            let api_key = std::env::var(&endpoint.api_key_env).map_err(|_| PoolError::Credential {
                env: endpoint.api_key_env.clone(),
            })?;

            let client = OpenAiClient::new(endpoint.model.as_str(), api_key, config)?;
            endpoints.push((endpoint.model.clone(), Arc::new(client)));
        }

        Self::new(endpoints)
    }

    /// Number of slots in the pool
    pub fn size(&self) -> usize {
        self.slots.len()
    }

    /// Look up the slot at `position`
    pub fn slot_at(&self, position: usize) -> Result<&EndpointSlot, PoolError> {
        self.slots.get(position).ok_or(PoolError::IndexOutOfRange {
            position,
            size: self.slots.len(),
        })
    }
}
