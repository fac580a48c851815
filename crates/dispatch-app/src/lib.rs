pub mod conversation_service;
pub mod dispatcher;
pub mod error;
pub mod oncall_service;
pub mod relay_service;
pub mod reminder_service;
pub mod roster_service;
pub mod settings;

#[cfg(test)]
mod testing;
