//! Driver-agnostic domain types: addresses, identifiers and server descriptions.

mod address;
mod description;
mod ids;

pub use address::{Address, DEFAULT_PORT};
pub use description::{FailureClass, ServerDescription, ServerError, ServerKind};
pub use ids::{ConnectionId, SubscriptionId};
