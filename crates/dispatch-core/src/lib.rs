//! Domain model for the dispatch relay: who is on call, whether an inbound
//! contact opens a conversation, and who gets reminded of a shift.

pub mod conversation;
pub mod error;
pub mod events;
pub mod ids;
pub mod phone;
pub mod schedule;
pub mod staff;
pub mod template;
