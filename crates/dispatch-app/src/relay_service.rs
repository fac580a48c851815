use async_trait::async_trait;
use chrono::{DateTime, Utc};

use dispatch_core::conversation::ContactDisposition;
use dispatch_core::events::{DomainEvent, StaffPaged};
use dispatch_core::phone::Phone;
use dispatch_core::schedule::OnCallResolution;
use dispatch_ports::error::HandleError;
use dispatch_ports::inbound::ContactReceiver;
use dispatch_ports::outbound::{
    BlocklistRepository, ConfigRepository, EventPublisher, MessageSender, ScheduleRepository,
    StaffRepository, ThreadRepository,
};
use dispatch_ports::types::{
    CallStatusUpdate, DialPlan, DispatchReport, InboundCall, InboundMessage, PhoneNumberConfig,
    Reply,
};

use crate::conversation_service::ConversationTracker;
use crate::dispatcher::NotificationDispatcher;
use crate::error::{require_numbers, within_budget, AppError};
use crate::oncall_service::OnCallResolver;
use crate::settings::RelaySettings;

/// Staff to page and the numbers to page them from.
struct Page {
    on_call: OnCallResolution,
    numbers: PhoneNumberConfig,
}

pub struct RelayService<St, Bl, Sc, Th, Cf, M, EP>
where
    St: StaffRepository + Clone,
    Bl: BlocklistRepository,
    Sc: ScheduleRepository,
    Th: ThreadRepository,
    Cf: ConfigRepository,
    M: MessageSender,
    EP: EventPublisher + Clone,
{
    tracker: ConversationTracker<St, Bl, Th, EP>,
    resolver: OnCallResolver<St, Sc>,
    dispatcher: NotificationDispatcher<M>,
    config: Cf,
    events: EP,
    settings: RelaySettings,
}

impl<St, Bl, Sc, Th, Cf, M, EP> RelayService<St, Bl, Sc, Th, Cf, M, EP>
where
    St: StaffRepository + Clone,
    Bl: BlocklistRepository,
    Sc: ScheduleRepository,
    Th: ThreadRepository,
    Cf: ConfigRepository,
    M: MessageSender,
    EP: EventPublisher + Clone,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        staff: St,
        blocklist: Bl,
        schedules: Sc,
        threads: Th,
        config: Cf,
        sender: M,
        events: EP,
        settings: RelaySettings,
    ) -> Self {
        Self {
            tracker: ConversationTracker::new(
                staff.clone(),
                blocklist,
                threads,
                events.clone(),
                settings.policy,
            ),
            resolver: OnCallResolver::new(staff, schedules, settings.timezone),
            dispatcher: NotificationDispatcher::new(sender),
            config,
            events,
            settings,
        }
    }

    async fn page_for(&self, now: DateTime<Utc>) -> Result<Page, AppError> {
        let on_call = self.resolver.resolve_at(now).await?;
        let numbers = require_numbers(self.config.phone_numbers().await)?;
        Ok(Page { on_call, numbers })
    }

    async fn send_page(
        &self,
        caller: &Phone,
        page: Page,
        body: &str,
        now: DateTime<Utc>,
    ) -> DispatchReport {
        let fallback = page.on_call.fallback();
        let recipients = page.on_call.into_phones();
        if recipients.is_empty() {
            tracing::warn!(from = %caller, "no active staff to notify");
            return DispatchReport::default();
        }

        tracing::info!(from = %caller, staff = recipients.len(), "messaging staff");
        let report = self
            .dispatcher
            .dispatch(&page.numbers.outbound, &recipients, body)
            .await;

        let event = DomainEvent::StaffPaged(StaffPaged {
            from: caller.clone(),
            recipients: report.sent(),
            failed: report.failed(),
            fallback,
            occurred_at: now,
        });
        if let Err(e) = self.events.publish(vec![event]).await {
            tracing::warn!(error = %e, "failed to record page event");
        }
        report
    }

    pub async fn handle_message(
        &self,
        message: InboundMessage,
        now: DateTime<Utc>,
    ) -> Result<Reply, AppError> {
        if message.body.trim().is_empty() {
            return Err(AppError::Invalid(
                "Your text appears to be empty. Please resend".into(),
            ));
        }
        let from = &message.from;

        let (disposition, page) = within_budget(
            self.settings.timeout,
            self.tracker.handle_inbound_contact_with(from, now, || self.page_for(now)),
        )
        .await?;

        if let Some(page) = page.filter(|_| disposition.should_notify_staff()) {
            let time = self.settings.format_time(now);
            let body = self.settings.templates.sms_staff.render(&[
                ("from", from.as_str()),
                ("body", message.body.as_str()),
                ("time", time.as_str()),
            ]);
            self.send_page(from, page, &body, now).await;
        }

        Ok(match disposition {
            ContactDisposition::Accepted(outcome) if outcome.is_new_thread => Reply::Message(
                self.settings.templates.sms_sender_response.as_str().to_string(),
            ),
            _ => Reply::Empty,
        })
    }

    /// Answers a call with a live transfer to the on-call set. The provider
    /// reports the transfer result to [`Self::handle_call_status`].
    pub async fn handle_call(
        &self,
        call: InboundCall,
        now: DateTime<Utc>,
    ) -> Result<Reply, AppError> {
        let from = &call.from;
        tracing::info!(from = %from, call_sid = %call.call_sid, "received voice call");

        let (_, page) = within_budget(
            self.settings.timeout,
            self.tracker.handle_inbound_contact_with(from, now, || self.page_for(now)),
        )
        .await?;

        let Some(page) = page else {
            return Ok(Reply::Empty);
        };

        let mut numbers = page.on_call.into_phones();
        if self.settings.policy.skip_staff_ignore {
            numbers.retain(|p| p != from);
        }
        if numbers.is_empty() {
            tracing::warn!(from = %from, "no staff available for live transfer");
            return Ok(Reply::Say(
                self.settings.templates.voice_unavailable.as_str().to_string(),
            ));
        }

        tracing::info!(from = %from, staff = numbers.len(), "connecting caller to staff");
        Ok(Reply::Dial(DialPlan {
            greeting: self.settings.templates.voice_connecting.as_str().to_string(),
            caller_id: page.numbers.inbound,
            numbers,
            timeout_secs: self.settings.dial_timeout_secs,
            caller: from.clone(),
        }))
    }

    /// Continuation of a live transfer: pages staff by SMS when nobody answered.
    pub async fn handle_call_status(
        &self,
        update: CallStatusUpdate,
        now: DateTime<Utc>,
    ) -> Result<Reply, AppError> {
        let from = &update.from;
        tracing::info!(
            from = %from,
            call_sid = %update.call_sid,
            status = ?update.dial_status,
            "call status update"
        );

        if update.dial_status.was_answered() {
            return Ok(Reply::Say(
                self.settings.templates.voice_completed.as_str().to_string(),
            ));
        }

        let page = within_budget(self.settings.timeout, self.page_for(now)).await?;
        let time = self.settings.format_time(now);
        let body = self
            .settings
            .templates
            .voice_missed_call_staff
            .render(&[("from", from.as_str()), ("time", time.as_str())]);
        self.send_page(from, page, &body, now).await;

        Ok(Reply::Say(
            self.settings
                .templates
                .voice_missed_call_caller
                .as_str()
                .to_string(),
        ))
    }
}

#[async_trait]
impl<St, Bl, Sc, Th, Cf, M, EP> ContactReceiver for RelayService<St, Bl, Sc, Th, Cf, M, EP>
where
    St: StaffRepository + Clone,
    Bl: BlocklistRepository,
    Sc: ScheduleRepository,
    Th: ThreadRepository,
    Cf: ConfigRepository,
    M: MessageSender,
    EP: EventPublisher + Clone,
{
    async fn receive_message(
        &self,
        message: InboundMessage,
        now: DateTime<Utc>,
    ) -> Result<Reply, HandleError> {
        Ok(self.handle_message(message, now).await?)
    }

    async fn receive_call(
        &self,
        call: InboundCall,
        now: DateTime<Utc>,
    ) -> Result<Reply, HandleError> {
        Ok(self.handle_call(call, now).await?)
    }

    async fn receive_call_status(
        &self,
        update: CallStatusUpdate,
        now: DateTime<Utc>,
    ) -> Result<Reply, HandleError> {
        Ok(self.handle_call_status(update, now).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::NaiveDate;
    use dispatch_core::conversation::{ContactPolicy, NotificationStrategy};
    use dispatch_core::schedule::{Recurrence, ScheduleEntry, TimeWindow};
    use dispatch_ports::error::PortError;
    use dispatch_ports::types::DialStatus;

    use crate::testing::{phone, ts, FakeSender, FakeStore, INBOUND, OUTBOUND};

    type Service =
        RelayService<FakeStore, FakeStore, FakeStore, FakeStore, FakeStore, FakeSender, FakeStore>;

    const PUBLIC: &str = "+15105557777";
    const A: &str = "+15105550001";
    const B: &str = "+15105550002";

    fn now() -> DateTime<Utc> {
        ts("2025-01-15T10:00:00Z")
    }

    fn store() -> FakeStore {
        let store = FakeStore::with_numbers();
        store.add_staff(A, true);
        store.add_staff(B, true);
        store
    }

    fn service_with(store: &FakeStore, sender: &FakeSender, policy: ContactPolicy) -> Service {
        RelayService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            sender.clone(),
            store.clone(),
            RelaySettings {
                policy,
                ..RelaySettings::default()
            },
        )
    }

    fn service(store: &FakeStore, sender: &FakeSender) -> Service {
        service_with(store, sender, ContactPolicy::default())
    }

    fn sms(from: &str, body: &str) -> InboundMessage {
        InboundMessage {
            from: phone(from),
            body: body.into(),
        }
    }

    fn call(from: &str) -> InboundCall {
        InboundCall {
            from: phone(from),
            call_sid: "CA123".into(),
        }
    }

    #[tokio::test]
    async fn first_message_pages_staff_once_second_is_quiet() {
        let store = store();
        let sender = FakeSender::default();
        let svc = service(&store, &sender);

        let reply = svc.handle_message(sms(PUBLIC, "help"), now()).await.unwrap();
        assert_eq!(
            reply,
            Reply::Message("Engaging staff. Please wait for a response.".into())
        );
        assert_eq!(store.open_threads(PUBLIC), 1);
        assert_eq!(sender.recipients(), vec![phone(A), phone(B)]);

        let again = svc.handle_message(sms(PUBLIC, "still there?"), now()).await.unwrap();
        assert_eq!(again, Reply::Empty);
        assert_eq!(sender.sent().len(), 2);
        assert_eq!(store.open_threads(PUBLIC), 1);
    }

    #[tokio::test]
    async fn page_renders_template_from_outbound_number() {
        let store = store();
        let sender = FakeSender::default();
        let svc = service(&store, &sender);

        svc.handle_message(sms(PUBLIC, "fire on 5th"), now()).await.unwrap();

        let sent = sender.sent();
        assert_eq!(sent[0].from, phone(OUTBOUND));
        assert!(sent[0].body.contains("From: +15105557777"));
        assert!(sent[0].body.contains("Message: fire on 5th"));
        assert!(sent[0].body.contains("Time: Wed, 15 Jan 2025 10:00:00 UTC"));
    }

    #[tokio::test]
    async fn always_strategy_pages_every_message() {
        let store = store();
        let sender = FakeSender::default();
        let svc = service_with(
            &store,
            &sender,
            ContactPolicy {
                strategy: NotificationStrategy::Always,
                skip_staff_ignore: false,
            },
        );

        for _ in 0..3 {
            svc.handle_message(sms(PUBLIC, "hi"), now()).await.unwrap();
        }
        assert_eq!(sender.sent().len(), 6);
        assert_eq!(store.open_threads(PUBLIC), 1);
    }

    #[tokio::test]
    async fn blocked_sender_gets_empty_reply_and_no_page() {
        let store = store();
        store.block(PUBLIC);
        let sender = FakeSender::default();
        let svc = service(&store, &sender);

        let reply = svc.handle_message(sms(PUBLIC, "spam"), now()).await.unwrap();

        assert_eq!(reply, Reply::Empty);
        assert!(sender.sent().is_empty());
        assert_eq!(store.open_threads(PUBLIC), 0);
    }

    #[tokio::test]
    async fn staff_message_ignored() {
        let store = store();
        let sender = FakeSender::default();
        let svc = service(&store, &sender);

        let reply = svc.handle_message(sms(A, "test"), now()).await.unwrap();

        assert_eq!(reply, Reply::Empty);
        assert!(sender.sent().is_empty());
    }

    #[tokio::test]
    async fn empty_body_rejected() {
        let store = store();
        let sender = FakeSender::default();
        let svc = service(&store, &sender);

        let result = svc.handle_message(sms(PUBLIC, "  "), now()).await;
        assert!(matches!(result, Err(AppError::Invalid(_))));
        assert_eq!(store.open_threads(PUBLIC), 0);
    }

    #[tokio::test]
    async fn page_goes_to_on_call_subset() {
        let store = store();
        store.add_entry(ScheduleEntry::new(
            phone(B),
            TimeWindow::whole_day(),
            Recurrence::Always,
        ));
        let sender = FakeSender::default();
        let svc = service(&store, &sender);

        svc.handle_message(sms(PUBLIC, "help"), now()).await.unwrap();

        assert_eq!(sender.recipients(), vec![phone(B)]);
        assert_eq!(
            store.event_types(),
            vec!["thread.opened", "staff.paged"]
        );
    }

    #[tokio::test]
    async fn send_failure_still_replies_to_sender() {
        let store = store();
        let sender = FakeSender::default();
        sender.fail_for(A);
        let svc = service(&store, &sender);

        let reply = svc.handle_message(sms(PUBLIC, "help"), now()).await.unwrap();

        assert!(matches!(reply, Reply::Message(_)));
        assert_eq!(sender.recipients(), vec![phone(B)]);
    }

    #[tokio::test]
    async fn call_dials_on_call_staff_with_inbound_caller_id() {
        let store = store();
        let sender = FakeSender::default();
        let svc = service(&store, &sender);

        let reply = svc.handle_call(call(PUBLIC), now()).await.unwrap();

        assert_eq!(
            reply,
            Reply::Dial(DialPlan {
                greeting: "Connecting you to dispatch staff. Please hold.".into(),
                caller_id: phone(INBOUND),
                numbers: vec![phone(A), phone(B)],
                timeout_secs: 20,
                caller: phone(PUBLIC),
            })
        );
        assert_eq!(store.open_threads(PUBLIC), 1);
        assert!(sender.sent().is_empty());
    }

    #[tokio::test]
    async fn call_from_staff_hangs_up() {
        let store = store();
        let sender = FakeSender::default();
        let svc = service(&store, &sender);

        let reply = svc.handle_call(call(A), now()).await.unwrap();
        assert_eq!(reply, Reply::Empty);
    }

    #[tokio::test]
    async fn self_test_call_excludes_callers_own_number() {
        let store = store();
        let sender = FakeSender::default();
        let svc = service_with(
            &store,
            &sender,
            ContactPolicy {
                strategy: NotificationStrategy::Thread,
                skip_staff_ignore: true,
            },
        );

        let reply = svc.handle_call(call(A), now()).await.unwrap();
        match reply {
            Reply::Dial(plan) => assert_eq!(plan.numbers, vec![phone(B)]),
            other => panic!("expected dial, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn call_with_no_active_staff_says_unavailable() {
        let store = FakeStore::with_numbers();
        let sender = FakeSender::default();
        let svc = service(&store, &sender);

        let reply = svc.handle_call(call(PUBLIC), now()).await.unwrap();
        assert!(matches!(reply, Reply::Say(text) if text.starts_with("Sorry, no dispatch staff")));
    }

    #[tokio::test]
    async fn answered_transfer_thanks_caller() {
        let store = store();
        let sender = FakeSender::default();
        let svc = service(&store, &sender);

        let reply = svc
            .handle_call_status(
                CallStatusUpdate {
                    from: phone(PUBLIC),
                    call_sid: "CA123".into(),
                    dial_status: DialStatus::Completed,
                },
                now(),
            )
            .await
            .unwrap();

        assert_eq!(reply, Reply::Say("Thank you for contacting dispatch.".into()));
        assert!(sender.sent().is_empty());
    }

    #[tokio::test]
    async fn missed_transfer_pages_staff_by_sms() {
        let store = store();
        let sender = FakeSender::default();
        let svc = service(&store, &sender);

        let reply = svc
            .handle_call_status(
                CallStatusUpdate {
                    from: phone(PUBLIC),
                    call_sid: "CA123".into(),
                    dial_status: DialStatus::NoAnswer,
                },
                now(),
            )
            .await
            .unwrap();

        assert!(matches!(reply, Reply::Say(text) if text.contains("urgent message")));
        let sent = sender.sent();
        assert_eq!(sent.len(), 2);
        assert!(sent[0].body.starts_with("MISSED EMERGENCY CALL from +15105557777"));
    }

    #[tokio::test]
    async fn missing_phone_config_is_a_server_error() {
        let store = FakeStore::default();
        store.add_staff(A, true);
        let sender = FakeSender::default();
        let svc = service(&store, &sender);

        let result = svc.handle_message(sms(PUBLIC, "help"), now()).await;
        assert!(matches!(result, Err(AppError::Unconfigured(_))));
        assert!(sender.sent().is_empty());
    }

    #[tokio::test]
    async fn failed_request_leaves_no_thread_so_retry_pages() {
        let store = FakeStore::default();
        store.add_staff(A, true);
        let sender = FakeSender::default();
        let svc = service(&store, &sender);

        let first = svc.handle_message(sms(PUBLIC, "help"), now()).await;
        assert!(first.is_err());
        assert_eq!(store.open_threads(PUBLIC), 0);

        store.state.lock().unwrap().numbers = Some(PhoneNumberConfig {
            inbound: phone(INBOUND),
            outbound: phone(OUTBOUND),
        });
        let second = svc.handle_message(sms(PUBLIC, "help"), now()).await.unwrap();

        assert_eq!(
            second,
            Reply::Message("Engaging staff. Please wait for a response.".into())
        );
        assert_eq!(sender.recipients(), vec![phone(A)]);
        assert_eq!(store.open_threads(PUBLIC), 1);
    }

    #[tokio::test]
    async fn failed_call_leaves_no_thread() {
        let store = FakeStore::default();
        store.add_staff(A, true);
        let sender = FakeSender::default();
        let svc = service(&store, &sender);

        let result = svc.handle_call(call(PUBLIC), now()).await;

        assert!(matches!(result, Err(AppError::Unconfigured(_))));
        assert_eq!(store.open_threads(PUBLIC), 0);
    }

    #[tokio::test]
    async fn event_log_outage_still_pages() {
        let store = store();
        store.state.lock().unwrap().fail_events = true;
        let sender = FakeSender::default();
        let svc = service(&store, &sender);

        let reply = svc.handle_message(sms(PUBLIC, "help"), now()).await.unwrap();

        assert!(matches!(reply, Reply::Message(_)));
        assert_eq!(sender.sent().len(), 2);
    }

    /// Config store that never answers.
    #[derive(Clone)]
    struct StalledConfig;

    #[async_trait]
    impl ConfigRepository for StalledConfig {
        async fn phone_numbers(&self) -> Result<PhoneNumberConfig, PortError> {
            std::future::pending().await
        }
        async fn set_phone_numbers(&self, _c: &PhoneNumberConfig) -> Result<(), PortError> {
            Ok(())
        }
        async fn reminder_last_run(&self) -> Result<Option<NaiveDate>, PortError> {
            Ok(None)
        }
        async fn set_reminder_last_run(&self, _d: NaiveDate) -> Result<(), PortError> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_store_fails_closed_after_budget() {
        let store = store();
        let sender = FakeSender::default();
        let svc = RelayService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            StalledConfig,
            sender.clone(),
            store.clone(),
            RelaySettings {
                timeout: Duration::from_secs(5),
                ..RelaySettings::default()
            },
        );

        let result = svc.handle_message(sms(PUBLIC, "help"), now()).await;

        assert!(matches!(result, Err(AppError::Timeout)));
        assert!(sender.sent().is_empty());
    }
}
