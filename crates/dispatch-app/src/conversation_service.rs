use std::future::Future;

use chrono::{DateTime, Utc};

use dispatch_core::conversation::{ContactDisposition, ContactPolicy, ConversationThread};
use dispatch_core::events::{ContactIgnored, DomainEvent, ThreadOpened};
use dispatch_core::phone::Phone;
use dispatch_ports::outbound::{
    BlocklistRepository, EventPublisher, StaffRepository, ThreadRepository,
};
use dispatch_ports::types::ThreadInsert;

use crate::error::AppError;

pub struct ConversationTracker<St, Bl, Th, EP>
where
    St: StaffRepository,
    Bl: BlocklistRepository,
    Th: ThreadRepository,
    EP: EventPublisher,
{
    staff: St,
    blocklist: Bl,
    threads: Th,
    events: EP,
    policy: ContactPolicy,
}

impl<St, Bl, Th, EP> ConversationTracker<St, Bl, Th, EP>
where
    St: StaffRepository,
    Bl: BlocklistRepository,
    Th: ThreadRepository,
    EP: EventPublisher,
{
    pub fn new(staff: St, blocklist: Bl, threads: Th, events: EP, policy: ContactPolicy) -> Self {
        Self {
            staff,
            blocklist,
            threads,
            events,
            policy,
        }
    }

    pub fn policy(&self) -> &ContactPolicy {
        &self.policy
    }

    /// Screens the contact, then finds or opens its conversation thread.
    pub async fn handle_inbound_contact(
        &self,
        phone: &Phone,
        now: DateTime<Utc>,
    ) -> Result<ContactDisposition, AppError> {
        let (disposition, _) = self
            .handle_inbound_contact_with(phone, now, || async { Ok(()) })
            .await?;
        Ok(disposition)
    }

    /// Same as [`Self::handle_inbound_contact`], but runs `prepare` for an
    /// accepted contact before any thread is stored. When `prepare` fails the
    /// contact leaves no trace in the thread store.
    pub async fn handle_inbound_contact_with<T, F, Fut>(
        &self,
        phone: &Phone,
        now: DateTime<Utc>,
        prepare: F,
    ) -> Result<(ContactDisposition, Option<T>), AppError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        let blocked = self.blocklist.is_blocked(phone).await?;
        let active_staff = !blocked
            && self
                .staff
                .find_by_phone(phone)
                .await?
                .is_some_and(|m| m.is_active());

        if let Some(reason) = self.policy.screen(blocked, active_staff) {
            tracing::info!(from = %phone, reason = ?reason, "ignoring inbound contact");
            self.record(DomainEvent::ContactIgnored(ContactIgnored {
                phone: phone.clone(),
                reason,
                occurred_at: now,
            }))
            .await;
            return Ok((ContactDisposition::Ignored(reason), None));
        }

        let existing = self.threads.find_open(phone).await?;
        let prepared = prepare().await?;

        let is_new_thread = match existing {
            Some(thread) => {
                tracing::debug!(from = %phone, thread_id = %thread.id(), "open thread found");
                false
            }
            None => self.open_thread(phone, now).await?,
        };

        let outcome = self.policy.outcome(is_new_thread);
        if !outcome.should_notify_staff {
            tracing::info!(from = %phone, "thread already open, skipping staff notification");
        }
        Ok((ContactDisposition::Accepted(outcome), Some(prepared)))
    }

    async fn open_thread(&self, phone: &Phone, now: DateTime<Utc>) -> Result<bool, AppError> {
        let thread = ConversationThread::open(phone.clone(), now);
        match self.threads.insert_open(&thread).await? {
            ThreadInsert::Created => {
                tracing::info!(from = %phone, thread_id = %thread.id(), "starting new thread");
                self.record(DomainEvent::ThreadOpened(ThreadOpened {
                    thread_id: thread.id().clone(),
                    phone: phone.clone(),
                    occurred_at: now,
                }))
                .await;
                Ok(true)
            }
            ThreadInsert::AlreadyOpen => {
                tracing::info!(from = %phone, "thread opened concurrently, joining it");
                Ok(false)
            }
        }
    }

    async fn record(&self, event: DomainEvent) {
        let event_type = event.event_type();
        if let Err(e) = self.events.publish(vec![event]).await {
            tracing::warn!(error = %e, event_type, "failed to record event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{phone, ts, FakeStore};
    use dispatch_core::conversation::{ContactOutcome, IgnoreReason, NotificationStrategy};

    const PUBLIC: &str = "+15105557777";
    const STAFF: &str = "+15105550001";

    fn tracker(
        store: &FakeStore,
        policy: ContactPolicy,
    ) -> ConversationTracker<FakeStore, FakeStore, FakeStore, FakeStore> {
        ConversationTracker::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            policy,
        )
    }

    fn now() -> DateTime<Utc> {
        ts("2025-01-15T10:00:00Z")
    }

    #[tokio::test]
    async fn first_contact_opens_thread_and_notifies() {
        let store = FakeStore::default();
        let t = tracker(&store, ContactPolicy::default());

        let disposition = t.handle_inbound_contact(&phone(PUBLIC), now()).await.unwrap();

        assert_eq!(
            disposition,
            ContactDisposition::Accepted(ContactOutcome {
                is_new_thread: true,
                should_notify_staff: true,
            })
        );
        assert_eq!(store.open_threads(PUBLIC), 1);
        assert_eq!(store.event_types(), vec!["thread.opened"]);
    }

    #[tokio::test]
    async fn second_contact_under_thread_strategy_is_quiet() {
        let store = FakeStore::default();
        let t = tracker(&store, ContactPolicy::default());

        t.handle_inbound_contact(&phone(PUBLIC), now()).await.unwrap();
        let second = t.handle_inbound_contact(&phone(PUBLIC), now()).await.unwrap();

        assert!(!second.should_notify_staff());
        assert_eq!(store.open_threads(PUBLIC), 1);
    }

    #[tokio::test]
    async fn always_strategy_notifies_on_existing_thread() {
        let store = FakeStore::default();
        let t = tracker(
            &store,
            ContactPolicy {
                strategy: NotificationStrategy::Always,
                skip_staff_ignore: false,
            },
        );

        t.handle_inbound_contact(&phone(PUBLIC), now()).await.unwrap();
        let second = t.handle_inbound_contact(&phone(PUBLIC), now()).await.unwrap();

        assert_eq!(
            second,
            ContactDisposition::Accepted(ContactOutcome {
                is_new_thread: false,
                should_notify_staff: true,
            })
        );
    }

    #[tokio::test]
    async fn blocked_number_creates_no_thread() {
        let store = FakeStore::default();
        store.block(PUBLIC);
        let t = tracker(&store, ContactPolicy::default());

        let disposition = t.handle_inbound_contact(&phone(PUBLIC), now()).await.unwrap();

        assert_eq!(disposition, ContactDisposition::Ignored(IgnoreReason::Blocked));
        assert_eq!(store.open_threads(PUBLIC), 0);
        assert_eq!(store.event_types(), vec!["contact.ignored"]);
    }

    #[tokio::test]
    async fn active_staff_ignored_inactive_staff_treated_as_public() {
        let store = FakeStore::default();
        store.add_staff(STAFF, true);
        store.add_staff("+15105550002", false);
        let t = tracker(&store, ContactPolicy::default());

        let staff = t.handle_inbound_contact(&phone(STAFF), now()).await.unwrap();
        assert_eq!(staff, ContactDisposition::Ignored(IgnoreReason::Staff));
        assert_eq!(store.open_threads(STAFF), 0);

        let former = t
            .handle_inbound_contact(&phone("+15105550002"), now())
            .await
            .unwrap();
        assert!(former.should_notify_staff());
    }

    #[tokio::test]
    async fn self_test_mode_lets_staff_through() {
        let store = FakeStore::default();
        store.add_staff(STAFF, true);
        let t = tracker(
            &store,
            ContactPolicy {
                strategy: NotificationStrategy::Thread,
                skip_staff_ignore: true,
            },
        );

        let disposition = t.handle_inbound_contact(&phone(STAFF), now()).await.unwrap();
        assert!(disposition.should_notify_staff());
        assert_eq!(store.open_threads(STAFF), 1);
    }

    #[tokio::test]
    async fn concurrent_creation_joins_existing_thread() {
        let store = FakeStore::default();
        let t = tracker(&store, ContactPolicy::default());
        t.handle_inbound_contact(&phone(PUBLIC), now()).await.unwrap();

        // The next lookup misses, as if another request had not committed yet.
        store.state.lock().unwrap().hide_open_threads = true;
        let racing = t.handle_inbound_contact(&phone(PUBLIC), now()).await.unwrap();

        assert!(!racing.should_notify_staff());
        store.state.lock().unwrap().hide_open_threads = false;
        assert_eq!(store.open_threads(PUBLIC), 1);
    }

    #[tokio::test]
    async fn staff_lookup_failure_propagates() {
        let store = FakeStore::default();
        store.state.lock().unwrap().fail_staff = true;
        let t = tracker(&store, ContactPolicy::default());

        let result = t.handle_inbound_contact(&phone(PUBLIC), now()).await;
        assert!(matches!(result, Err(AppError::Port(_))));
        assert_eq!(store.open_threads(PUBLIC), 0);
    }

    #[tokio::test]
    async fn failed_preparation_stores_no_thread() {
        let store = FakeStore::default();
        let t = tracker(&store, ContactPolicy::default());

        let result = t
            .handle_inbound_contact_with(&phone(PUBLIC), now(), || async {
                Err::<(), _>(AppError::Unconfigured("phone numbers"))
            })
            .await;

        assert!(matches!(result, Err(AppError::Unconfigured(_))));
        assert_eq!(store.open_threads(PUBLIC), 0);
        assert!(store.event_types().is_empty());

        let (retry, prepared) = t
            .handle_inbound_contact_with(&phone(PUBLIC), now(), || async { Ok(7) })
            .await
            .unwrap();
        assert!(retry.should_notify_staff());
        assert_eq!(prepared, Some(7));
    }

    #[tokio::test]
    async fn ignored_contact_skips_preparation() {
        let store = FakeStore::default();
        store.block(PUBLIC);
        let t = tracker(&store, ContactPolicy::default());

        let (disposition, prepared) = t
            .handle_inbound_contact_with(&phone(PUBLIC), now(), || async {
                Err::<(), _>(AppError::Unconfigured("phone numbers"))
            })
            .await
            .unwrap();

        assert_eq!(disposition, ContactDisposition::Ignored(IgnoreReason::Blocked));
        assert_eq!(prepared, None);
    }

    #[tokio::test]
    async fn event_log_failure_does_not_fail_contact() {
        let store = FakeStore::default();
        store.state.lock().unwrap().fail_events = true;
        let t = tracker(&store, ContactPolicy::default());

        let disposition = t.handle_inbound_contact(&phone(PUBLIC), now()).await.unwrap();

        assert!(disposition.should_notify_staff());
        assert_eq!(store.open_threads(PUBLIC), 1);
    }
}
