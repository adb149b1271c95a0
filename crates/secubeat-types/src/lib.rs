//! Command event types for SecuBeat.

mod event;
mod wire;

pub use event::{CommandEvent, CommandEventBuilder, CommandResult, EventKind};
pub use wire::{DeliveryBatch, WireEvent, SOURCE_TAG, WIRE_VERSION};
