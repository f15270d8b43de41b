//! Email service for order notifications.
//!
//! Uses SMTP via lettre for delivery with Askama HTML and text templates.

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::SmtpConfig;
use crate::models::OrderWithLines;

/// HTML body of the "new order placed" email.
#[derive(Template)]
#[template(path = "email/order_placed.html")]
struct OrderPlacedHtml<'a> {
    order: &'a OrderWithLines,
    customer_name: &'a str,
    placed_at: String,
}

/// Plain text body of the "new order placed" email.
#[derive(Template)]
#[template(path = "email/order_placed.txt")]
struct OrderPlacedText<'a> {
    order: &'a OrderWithLines,
    customer_name: &'a str,
    placed_at: String,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// Rendered order notification, ready to send to any recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderPlacedEmail {
    pub subject: String,
    pub text: String,
    pub html: String,
}

impl OrderPlacedEmail {
    /// Render the notification for `order`.
    ///
    /// # Errors
    ///
    /// Returns `EmailError::Template` if a template fails to render.
    pub fn render(order: &OrderWithLines, customer_name: &str) -> Result<Self, EmailError> {
        let placed_at = order
            .order
            .created_at
            .format("%Y-%m-%d %H:%M UTC")
            .to_string();

        let html = OrderPlacedHtml {
            order,
            customer_name,
            placed_at: placed_at.clone(),
        }
        .render()?;
        let text = OrderPlacedText {
            order,
            customer_name,
            placed_at,
        }
        .render()?;

        Ok(Self {
            subject: format!("New Order Placed: #{}", order.order.id),
            text,
            html,
        })
    }
}

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: &SmtpConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.username.clone(),
            config.password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
            .port(config.port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
        })
    }

    /// Send a rendered order notification to `to`.
    ///
    /// # Errors
    ///
    /// Returns error if the address is invalid or delivery fails.
    pub async fn send_order_placed(
        &self,
        to: &str,
        email: &OrderPlacedEmail,
    ) -> Result<(), EmailError> {
        self.send_multipart_email(to, &email.subject, &email.text, &email.html)
            .await
    }

    /// Send a multipart email with both plain text and HTML versions.
    async fn send_multipart_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )?;

        self.mailer.send(email).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent successfully");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};
    use cornershop_core::{OrderId, OrderStatus, ProductId, UserId};

    use super::*;
    use crate::models::{Order, OrderLine};

    fn sample_order() -> OrderWithLines {
        let placed = Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap();
        OrderWithLines {
            order: Order {
                id: OrderId::new(42),
                user_id: UserId::new(7),
                subtotal: "100.00".parse().unwrap(),
                tax: "10.00".parse().unwrap(),
                shipping: "5.00".parse().unwrap(),
                total: "115.00".parse().unwrap(),
                status: OrderStatus::Pending,
                created_at: placed,
                updated_at: placed,
            },
            items: vec![OrderLine {
                product_id: ProductId::new(3),
                name: "Classic Navy Hoodie".to_string(),
                quantity: 2,
                unit_price: "50.00".parse().unwrap(),
            }],
        }
    }

    #[test]
    fn test_render_order_placed() {
        let email = OrderPlacedEmail::render(&sample_order(), "Test User").unwrap();

        assert_eq!(email.subject, "New Order Placed: #42");
        assert!(email.text.contains("Order #42"));
        assert!(email.text.contains("2026-03-14 09:30 UTC"));
        assert!(email.text.contains("Classic Navy Hoodie"));
        assert!(email.text.contains("115.00"));
        assert!(email.html.contains("<td>Classic Navy Hoodie</td>"));
        assert!(email.html.contains("100.00"));
    }

    #[test]
    fn test_html_escapes_product_names() {
        let mut order = sample_order();
        order.items[0].name = "<b>Tote</b>".to_string();

        let email = OrderPlacedEmail::render(&order, "Test User").unwrap();
        assert!(!email.html.contains("<b>Tote</b>"));
    }
}
