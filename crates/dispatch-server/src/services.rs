use std::sync::Arc;

use dispatch_adapters::persistence::sqlite::SqliteDb;
use dispatch_app::relay_service::RelayService;
use dispatch_app::reminder_service::ReminderScheduler;
use dispatch_app::roster_service::RosterService;
use dispatch_app::settings::RelaySettings;
use dispatch_ports::inbound::{ContactReceiver, ReminderRunner, RosterAdmin};
use dispatch_ports::outbound::MessageSender;

pub struct Services {
    pub contacts: Arc<dyn ContactReceiver>,
    pub roster: Arc<dyn RosterAdmin>,
    pub reminders: Arc<dyn ReminderRunner>,
}

/// Wires every service onto one store and one sender.
pub fn build<M>(db: SqliteDb, sender: M, settings: RelaySettings) -> Services
where
    M: MessageSender + Clone + 'static,
{
    let reminders = ReminderScheduler::new(
        db.clone(),
        db.clone(),
        db.clone(),
        sender.clone(),
        db.clone(),
        settings.timezone,
        settings.templates.schedule_reminder.clone(),
    );
    let roster = RosterService::new(
        db.clone(),
        db.clone(),
        db.clone(),
        db.clone(),
        settings.timezone,
        settings.timeout,
    );
    let contacts = RelayService::new(
        db.clone(),
        db.clone(),
        db.clone(),
        db.clone(),
        db.clone(),
        sender,
        db,
        settings,
    );

    Services {
        contacts: Arc::new(contacts),
        roster: Arc::new(roster),
        reminders: Arc::new(reminders),
    }
}
