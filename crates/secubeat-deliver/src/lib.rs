//! Reliable, buffered, multi-sink delivery pipeline.
//!
//! Accepts formatted events, batches them per sink, and dispatches with
//! retry and linear backoff. Each sink owns its intake queue and worker
//! task, so a persistently failing sink only affects its own backlog.

mod http;
mod pipeline;
mod sink;
mod stats;
mod syslog;
mod webhook;

pub use http::{HttpSink, HttpSinkConfig};
pub use pipeline::{DeliveryPipeline, DeliveryPipelineBuilder};
pub use sink::{DeliveryPolicy, Sink, SinkError};
pub use stats::{SinkState, SinkStats};
pub use syslog::SyslogSink;
pub use webhook::WebhookSink;
