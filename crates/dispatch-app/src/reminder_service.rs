use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use tokio::sync::Mutex;

use dispatch_core::events::{DomainEvent, RemindersSent};
use dispatch_core::schedule::reminder_recipients;
use dispatch_core::template::MessageTemplate;
use dispatch_ports::error::HandleError;
use dispatch_ports::inbound::ReminderRunner;
use dispatch_ports::outbound::{
    ConfigRepository, EventPublisher, MessageSender, ScheduleRepository, StaffRepository,
};
use dispatch_ports::types::ReminderReport;

use crate::dispatcher::NotificationDispatcher;
use crate::error::{require_numbers, AppError};
use crate::oncall_service::OnCallResolver;

/// Once-a-day SMS to staff whose on-call block starts today.
pub struct ReminderScheduler<St, Sc, Cf, M, EP>
where
    St: StaffRepository,
    Sc: ScheduleRepository,
    Cf: ConfigRepository,
    M: MessageSender,
    EP: EventPublisher,
{
    resolver: OnCallResolver<St, Sc>,
    config: Cf,
    dispatcher: NotificationDispatcher<M>,
    events: EP,
    template: MessageTemplate,
    running: Mutex<()>,
}

impl<St, Sc, Cf, M, EP> ReminderScheduler<St, Sc, Cf, M, EP>
where
    St: StaffRepository,
    Sc: ScheduleRepository,
    Cf: ConfigRepository,
    M: MessageSender,
    EP: EventPublisher,
{
    pub fn new(
        staff: St,
        schedules: Sc,
        config: Cf,
        sender: M,
        events: EP,
        timezone: Tz,
        template: MessageTemplate,
    ) -> Self {
        Self {
            resolver: OnCallResolver::new(staff, schedules, timezone),
            config,
            dispatcher: NotificationDispatcher::new(sender),
            events,
            template,
            running: Mutex::new(()),
        }
    }

    /// Local calendar date of `now`.
    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        self.resolver.today(now)
    }

    pub async fn run_pass(
        &self,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<ReminderReport, AppError> {
        let Ok(_guard) = self.running.try_lock() else {
            tracing::warn!(%today, "reminder pass already running");
            return Err(AppError::ReminderInProgress);
        };

        if let Some(last) = self.config.reminder_last_run().await? {
            if last >= today {
                tracing::debug!(%today, %last, "reminders already sent");
                return Ok(ReminderReport::AlreadyRan { date: today });
            }
        }

        let report = self.select_and_send(today, now).await?;
        self.config.set_reminder_last_run(today).await?;
        Ok(report)
    }

    async fn select_and_send(
        &self,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<ReminderReport, AppError> {
        let today_entries = self.resolver.entries_for_date(today).await?;
        if today_entries.is_empty() {
            tracing::info!(%today, "no on-call entries today");
            return Ok(ReminderReport::NothingScheduled { date: today });
        }

        let yesterday_entries = match today.pred_opt() {
            Some(yesterday) => self.resolver.entries_for_date(yesterday).await?,
            None => vec![],
        };

        let active = self.resolver.active_phones().await?;
        let recipients: Vec<_> = reminder_recipients(&today_entries, &yesterday_entries)
            .into_iter()
            .filter(|p| active.contains(p))
            .collect();

        if recipients.is_empty() {
            tracing::info!(%today, "no new on-call blocks today");
            return Ok(ReminderReport::NoNewBlocks { date: today });
        }

        let numbers = require_numbers(self.config.phone_numbers().await)?;
        let date = today.format("%Y-%m-%d").to_string();
        let body = self.template.render(&[("date", date.as_str())]);

        tracing::info!(%today, recipients = recipients.len(), "sending on-call reminders");
        let report = self
            .dispatcher
            .dispatch(&numbers.outbound, &recipients, &body)
            .await;

        let event = DomainEvent::RemindersSent(RemindersSent {
            date: today,
            recipients: report.sent(),
            failed: report.failed(),
            occurred_at: now,
        });
        if let Err(e) = self.events.publish(vec![event]).await {
            tracing::warn!(error = %e, "failed to record reminder event");
        }

        Ok(ReminderReport::Sent {
            date: today,
            report,
        })
    }
}

#[async_trait]
impl<St, Sc, Cf, M, EP> ReminderRunner for ReminderScheduler<St, Sc, Cf, M, EP>
where
    St: StaffRepository,
    Sc: ScheduleRepository,
    Cf: ConfigRepository,
    M: MessageSender,
    EP: EventPublisher,
{
    async fn run_daily_pass(
        &self,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<ReminderReport, HandleError> {
        Ok(self.run_pass(today, now).await?)
    }
}
