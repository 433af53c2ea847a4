//! Tagmill - round-robin multi-endpoint batch tagger
//!
//! Tagmill enriches a table of movie records with model-generated tags by
//! spreading one call per record across a fixed pool of rate-limited
//! endpoints, each reachable through its own credential. Throughput
//! approaches the sum of the per-endpoint rate limits, and a flaky endpoint
//! costs retries, not the batch.
//!
//! # Core Concepts
//!
//! - **Round-robin failover**: a task starts at slot `index mod N` and each
//!   retryable failure advances to the next slot, up to the attempt budget
//! - **Per-stream pacing**: each of the N concurrent streams spaces its own
//!   calls, so the pool sustains roughly N times one stream's rate
//! - **Soft failure**: a task that exhausts its budget yields an empty
//!   result; the batch always completes in full
//!
//! # Modules
//!
//! - [`pool`] - the fixed endpoint pool
//! - [`throttle`] - per-stream call pacing
//! - [`dispatch`] - the per-task failover state machine
//! - [`scheduler`] - bounded fan-out and result collection
//! - [`llm`] - chat-completion client trait and implementation
//! - [`dataset`] / [`prompt`] - record I/O and payload construction
//! - [`config`] / [`cli`] - configuration and command-line interface

pub mod cli;
pub mod config;
pub mod dataset;
pub mod dispatch;
pub mod llm;
pub mod pool;
pub mod prompt;
pub mod scheduler;
pub mod throttle;

// Re-export commonly used types
pub use config::{Config, EndpointConfig};
pub use dataset::{Cleaner, Record, TaggedRecord};
pub use dispatch::{Dispatcher, Task, TaskResult};
pub use llm::{ChatClient, LlmError, OpenAiClient};
pub use pool::{EndpointPool, EndpointSlot, PoolError};
pub use scheduler::{BatchScheduler, ThrottleLanes};
pub use throttle::Throttle;
