//! Order notifications.
//!
//! Request handlers only enqueue an [`OrderPlaced`] event; a background task
//! renders the email and sends it to the shop admin and to the customer. Each
//! recipient gets exactly one delivery attempt. Failures are logged and
//! captured to Sentry and never reach the request that placed the order.

use std::future::Future;

use tokio::sync::mpsc;
use tracing::{error, info, instrument, warn};

use cornershop_core::Email;

use super::email::{EmailError, EmailService, OrderPlacedEmail};
use crate::models::OrderWithLines;

/// Emitted after an order has been committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderPlaced {
    pub order: OrderWithLines,
    pub customer_name: String,
    pub customer_email: Email,
}

/// Delivers a rendered notification to one recipient.
pub trait Mailer: Send + Sync + 'static {
    fn send(
        &self,
        to: &str,
        email: &OrderPlacedEmail,
    ) -> impl Future<Output = Result<(), EmailError>> + Send;
}

impl Mailer for EmailService {
    async fn send(&self, to: &str, email: &OrderPlacedEmail) -> Result<(), EmailError> {
        self.send_order_placed(to, email).await
    }
}

/// Mailer used when SMTP is not configured: logs instead of sending.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

impl Mailer for LogMailer {
    async fn send(&self, to: &str, email: &OrderPlacedEmail) -> Result<(), EmailError> {
        info!(to = %to, subject = %email.subject, "SMTP not configured; order notification logged only");
        Ok(())
    }
}

/// Handle for enqueuing order notifications.
#[derive(Debug, Clone)]
pub struct OrderNotifier {
    sender: mpsc::UnboundedSender<OrderPlaced>,
}

impl OrderNotifier {
    /// Spawn the delivery worker and return a handle to it.
    ///
    /// The worker stops once every handle has been dropped.
    #[must_use]
    pub fn spawn<M: Mailer>(mailer: M, admin_address: String) -> Self {
        let (notifier, receiver) = Self::channel();
        tokio::spawn(run_worker(mailer, admin_address, receiver));
        notifier
    }

    /// A handle plus the receiving end, without a worker.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<OrderPlaced>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Enqueue a notification. Never blocks.
    pub fn notify(&self, event: OrderPlaced) {
        let order_id = event.order.order.id;
        if self.sender.send(event).is_err() {
            warn!(order_id = %order_id, "Notification worker is gone; order notification dropped");
        }
    }
}

async fn run_worker<M: Mailer>(
    mailer: M,
    admin_address: String,
    mut receiver: mpsc::UnboundedReceiver<OrderPlaced>,
) {
    info!("Order notification worker started");
    while let Some(event) = receiver.recv().await {
        deliver(&mailer, &admin_address, &event).await;
    }
    info!("Order notification worker stopped");
}

/// Send one notification to the admin and the customer.
///
/// Returns the number of recipients that could not be reached.
#[instrument(skip_all, fields(order_id = %event.order.order.id))]
async fn deliver<M: Mailer>(mailer: &M, admin_address: &str, event: &OrderPlaced) -> usize {
    let email = match OrderPlacedEmail::render(&event.order, &event.customer_name) {
        Ok(email) => email,
        Err(e) => {
            let event_id = sentry::capture_error(&e);
            error!(error = %e, sentry_event_id = %event_id, "Failed to render order notification");
            return 2;
        }
    };

    let mut failed = 0;
    for to in [admin_address, event.customer_email.as_str()] {
        if let Err(e) = mailer.send(to, &email).await {
            failed += 1;
            let event_id = sentry::capture_error(&e);
            error!(
                to = %to,
                error = %e,
                sentry_event_id = %event_id,
                "Failed to send order notification"
            );
        }
    }
    failed
}
