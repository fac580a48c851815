//! Periodic trigger for the daily reminder pass.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use chrono_tz::Tz;

use dispatch_ports::error::HandleError;
use dispatch_ports::inbound::ReminderRunner;
use dispatch_ports::types::ReminderReport;

/// Local date whose pass is due at `now`, once the local hour reaches `hour`.
pub fn due_date(now: DateTime<Utc>, tz: Tz, hour: u32) -> Option<NaiveDate> {
    let local = now.with_timezone(&tz);
    (local.hour() >= hour).then(|| local.date_naive())
}

pub async fn run_loop(runner: Arc<dyn ReminderRunner>, tz: Tz, hour: u32, poll: Duration) {
    let mut ticker = tokio::time::interval(poll);
    loop {
        ticker.tick().await;
        let now = Utc::now();
        let Some(today) = due_date(now, tz, hour) else {
            continue;
        };

        match runner.run_daily_pass(today, now).await {
            Ok(ReminderReport::AlreadyRan { .. }) => {}
            Ok(ReminderReport::Sent { date, report }) => tracing::info!(
                %date,
                sent = report.sent().len(),
                failed = report.failed().len(),
                "reminder pass finished"
            ),
            Ok(report) => tracing::info!(?report, "reminder pass finished without sends"),
            Err(HandleError::Busy(_)) => tracing::debug!("reminder pass still running"),
            Err(e) => tracing::error!(error = %e, %today, "reminder pass failed"),
        }
    }
}
