//! Noop メール送信実装
//!
//! メールを実際に送信せず、ログ出力のみ行う。
//! パイプライン設定の確認（ドライラン）に使用する。
//!
//! メッセージの組み立ては SMTP と同じ処理を通すため、送信元・宛先アドレスの
//! 不正や読めない添付ファイルはドライランでも検出される。

use async_trait::async_trait;
use buildmail_domain::notification::{EmailMessage, NotificationError, Sender};

use super::{MailConnector, MailSession, smtp::build_message};

/// Noop 接続（ログ出力のみ）
#[derive(Debug, Clone)]
pub struct NoopMailConnector {
    sender: Sender,
}

impl NoopMailConnector {
    pub fn new(sender: Sender) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl MailConnector for NoopMailConnector {
    async fn dial(&self) -> Result<Box<dyn MailSession>, NotificationError> {
        tracing::info!("Noop: SMTP 接続をスキップ");
        Ok(Box::new(NoopMailSession {
            sender: self.sender.clone(),
        }))
    }
}

#[derive(Debug)]
struct NoopMailSession {
    sender: Sender,
}

#[async_trait]
impl MailSession for NoopMailSession {
    async fn send_email(&mut self, email: &EmailMessage) -> Result<(), NotificationError> {
        let message = build_message(&self.sender, email).await?;

        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            attachments = email.attachments.len(),
            size = message.formatted().len(),
            "Noop: メール送信をスキップ"
        );
        Ok(())
    }

    async fn close(&mut self) {}
}
