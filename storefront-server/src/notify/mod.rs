//! 订单确认通知 - best-effort，绝不阻塞结账完成
//!
//! 支付成功后发送确认邮件。失败只记日志，
//! 不向上传播，也不影响成功转移。

use async_trait::async_trait;
use aws_sdk_sesv2::Client as SesClient;
use aws_sdk_sesv2::types::{Body, Content, Destination, EmailContent, Message};

use shared::models::Order;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 订单确认通知器
#[async_trait]
pub trait ConfirmationNotifier: Send + Sync {
    async fn order_confirmation(&self, order: &Order, recipient: &str) -> Result<(), BoxError>;
}

/// AWS SES 实现
#[derive(Clone)]
pub struct SesNotifier {
    ses: SesClient,
    from: String,
}

impl SesNotifier {
    pub fn new(ses: SesClient, from: String) -> Self {
        Self { ses, from }
    }
}

#[async_trait]
impl ConfirmationNotifier for SesNotifier {
    async fn order_confirmation(&self, order: &Order, recipient: &str) -> Result<(), BoxError> {
        let order_id = order.id.as_deref().unwrap_or("?");

        let subject = Content::builder()
            .data("Pedido confirmado / Order confirmed")
            .build()?;

        let item_lines: String = order
            .lines
            .iter()
            .map(|l| format!("  {} x{} — {:.2}\n", l.name, l.quantity, l.line_total))
            .collect();

        let body_text = format!(
            "¡Gracias por tu pedido!\n\
             Número de pedido: {order_id}\n\n\
             {item_lines}\n\
             Total: {:.2}\n\n\
             Thank you for your order!\n\
             Order number: {order_id}\n\
             Total: {:.2}",
            order.totals.grand_total, order.totals.grand_total
        );

        let body = Body::builder()
            .text(Content::builder().data(body_text).build()?)
            .build();

        let message = Message::builder().subject(subject).body(body).build();

        self.ses
            .send_email()
            .from_email_address(&self.from)
            .destination(Destination::builder().to_addresses(recipient).build())
            .content(EmailContent::builder().simple(message).build())
            .send()
            .await?;

        tracing::info!(to = recipient, order_id = order_id, "Order confirmation sent");
        Ok(())
    }
}

/// 空实现 - 未配置发件地址时使用
pub struct NoopNotifier;

#[async_trait]
impl ConfirmationNotifier for NoopNotifier {
    async fn order_confirmation(&self, order: &Order, recipient: &str) -> Result<(), BoxError> {
        tracing::debug!(
            to = recipient,
            order_id = order.id.as_deref().unwrap_or("?"),
            "Notifier not configured, skipping order confirmation"
        );
        Ok(())
    }
}
