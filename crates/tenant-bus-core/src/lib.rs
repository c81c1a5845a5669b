#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **tenant-bus-core** – Typed, bounded-history event bus for the Semptify
//! core runtime.
//!
//! Every state change in the platform — a document landing in the vault, an
//! issue getting detected, a deadline closing in — is represented as an
//! [`Event`] carrying one of a closed set of [`EventPayload`] variants and
//! published on a [`Bus`]. Subscribers (the context loop, websocket
//! gateways, audit hooks) see events in FIFO order *within their own
//! subscription*; there is no ordering guarantee across subscriptions, and
//! none is needed since each subscriber folds events into its own state
//! independently.
//!
//! Backpressure is explicit: the bus never blocks a publisher waiting on a
//! slow subscriber. Once the internal dispatch queue reaches its configured
//! high-water mark, further publishes are dropped and logged rather than
//! applying backpressure upstream — see [`BusConfig::queue_high_water`].

mod bus;
mod event;
mod ring;

pub use bus::{Bus, BusConfig, EventHandler, SinkError, SubscriptionId, WebsocketSink};
pub use event::{Event, EventPayload, ExtractedItem};
