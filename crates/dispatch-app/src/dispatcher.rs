use dispatch_core::phone::Phone;
use dispatch_ports::outbound::MessageSender;
use dispatch_ports::types::{Delivery, DeliveryStatus, DispatchReport};

/// Sends one message per recipient. A failed send is recorded and the
/// fan-out carries on; nothing is retried.
pub struct NotificationDispatcher<M>
where
    M: MessageSender,
{
    sender: M,
}

impl<M> NotificationDispatcher<M>
where
    M: MessageSender,
{
    pub fn new(sender: M) -> Self {
        Self { sender }
    }

    pub async fn dispatch(&self, from: &Phone, recipients: &[Phone], body: &str) -> DispatchReport {
        let mut deliveries = Vec::with_capacity(recipients.len());

        for to in recipients {
            let status = match self.sender.send(from, to, body).await {
                Ok(receipt) => {
                    tracing::info!(to = %to, external_id = ?receipt.external_id, "message sent");
                    DeliveryStatus::Sent {
                        external_id: receipt.external_id,
                    }
                }
                Err(e) => {
                    tracing::warn!(to = %to, error = %e, "message send failed");
                    DeliveryStatus::Failed {
                        error: e.to_string(),
                    }
                }
            };
            deliveries.push(Delivery {
                recipient: to.clone(),
                status,
            });
        }

        let report = DispatchReport { deliveries };
        tracing::info!(
            attempted = report.attempted(),
            failed = report.failed().len(),
            "fan-out finished"
        );
        report
    }
}
