//! Port traits between the relay's services and the outside world.

pub mod error;
pub mod inbound;
pub mod outbound;
pub mod types;
