/// Courier - asynchronous side effects for an ActivityPub server
///
/// Mutations made through the client API or received over federation are
/// persisted synchronously and then described by a [`messages::Message`].
/// Messages are queued per origin and drained by worker pools, whose
/// handlers update counters, write notifications, push stream events and
/// federate. A resource lock table serializes read-modify-write sequences,
/// and a scheduler fires poll expiries and scheduled statuses.

pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod federation;
pub mod locks;
pub mod messages;
pub mod metrics;
pub mod model;
pub mod processing;
pub mod stream;
pub mod thread;
pub mod visibility;
pub mod workers;

pub use context::AppContext;
pub use error::{CourierError, CourierResult};
pub use processing::Processor;
