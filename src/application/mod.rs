// Application layer: use cases, validation and transactions.
// The CLI and tests talk to `DeliveryService`; nothing above this layer
// touches the repository directly.

pub mod error;
pub mod input;
pub mod reporting;
pub mod service;

pub use error::*;
pub use input::{parse_day, parse_month, parse_price};
pub use reporting::*;
pub use service::*;
