//! # 通知サービス
//!
//! 宛先解決 → テンプレートレンダリング → 本文変換 → 送信 を統合するサービス。
//!
//! ## 設計方針
//!
//! - **接続は 1 本**: 全宛先への送信で同じ SMTP 接続を使い回す
//! - **失敗は即時中断**: 宛先ごとの送信に失敗した時点で残りの宛先には送らない。
//!   送信済みの宛先は取り消さない
//! - **接続は必ず閉じる**: dial に成功した後は、成功・失敗どちらの経路でも
//!   `close` をちょうど 1 回呼ぶ
//! - **依存性注入**: 送信先は [`MailConnector`] trait で抽象化

use std::{path::PathBuf, sync::Arc};

use buildmail_domain::{
    context::BuildContext,
    notification::{EmailMessage, NotificationError},
    recipient::RecipientSet,
};
use buildmail_infra::notification::{MailConnector, MailSession};
use buildmail_shared::{event_log::event, log_business_event};

use super::{TemplateRenderer, compose, resolve_recipients};
use crate::config::NotifierConfig;

/// 全宛先に共通の送信内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub subject:     String,
    pub html_body:   String,
    pub text_body:   String,
    /// 添付候補。存在しないパスは送信時に除外される
    pub attachments: Vec<PathBuf>,
}

/// 通知サービス
pub struct NotificationService {
    connector: Arc<dyn MailConnector>,
}

impl NotificationService {
    pub fn new(connector: Arc<dyn MailConnector>) -> Self {
        Self { connector }
    }

    /// ビルド通知を送信する
    ///
    /// レンダリングと本文変換は接続前に行うため、これらが失敗した場合は
    /// SMTP サーバーに接続しない。
    pub async fn notify(
        &self,
        config: &NotifierConfig,
        context: &BuildContext,
    ) -> Result<(), NotificationError> {
        let recipients = resolve_recipients(config, context.commit_author_email());

        let renderer = TemplateRenderer::new(&config.subject, &config.body).inspect_err(|e| {
            tracing::error!(error = %e, "テンプレートの解析に失敗");
        })?;
        let rendered = renderer.render(context)?;
        let body = compose(&rendered.body)?;

        let message = RenderedMessage {
            subject:     rendered.subject,
            html_body:   body.html,
            text_body:   body.text,
            attachments: config.attachment_paths(),
        };

        self.dispatch(&recipients, &message).await
    }

    /// 1 本の接続で全宛先に送信する
    ///
    /// 宛先は順に 1 件ずつ送信し、最初の失敗でエラーを返す。
    pub async fn dispatch(
        &self,
        recipients: &RecipientSet,
        message: &RenderedMessage,
    ) -> Result<(), NotificationError> {
        let mut session = self.connector.dial().await.inspect_err(|e| {
            tracing::error!(error = %e, "SMTP サーバーへの接続に失敗");
        })?;

        let result = send_all(session.as_mut(), recipients, message).await;
        session.close().await;

        result
    }
}

async fn send_all(
    session: &mut dyn MailSession,
    recipients: &RecipientSet,
    message: &RenderedMessage,
) -> Result<(), NotificationError> {
    for recipient in recipients {
        let email = EmailMessage {
            to:          recipient.clone(),
            subject:     message.subject.clone(),
            html_body:   message.html_body.clone(),
            text_body:   message.text_body.clone(),
            attachments: existing_attachments(&message.attachments).await,
        };

        match session.send_email(&email).await {
            Ok(()) => {
                log_business_event!(
                    event.category = event::category::NOTIFICATION,
                    event.action = event::action::NOTIFICATION_SENT,
                    event.result = event::result::SUCCESS,
                    notification.recipient = %recipient,
                    notification.attachments = email.attachments.len(),
                    "通知メール送信成功"
                );
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    recipient = %recipient,
                    "宛先への送信に失敗したため残りの送信を中断"
                );
                log_business_event!(
                    event.category = event::category::NOTIFICATION,
                    event.action = event::action::NOTIFICATION_FAILED,
                    event.result = event::result::FAILURE,
                    notification.recipient = %recipient,
                    error = %e,
                    "通知メール送信失敗"
                );
                return Err(e);
            }
        }
    }

    Ok(())
}

/// 存在するパスだけを残す（存在しないものはログも出さずに除外）
async fn existing_attachments(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut existing = Vec::with_capacity(paths.len());
    for path in paths {
        if tokio::fs::metadata(path).await.is_ok() {
            existing.push(path.clone());
        }
    }
    existing
}
