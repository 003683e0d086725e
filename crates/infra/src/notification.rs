//! # メール送信セッション
//!
//! 通知 1 回分のメール送信を担当するインフラストラクチャモジュール。
//!
//! ## 設計方針
//!
//! - **接続は 1 回だけ**: [`MailConnector::dial`] で 1 本の接続を開き、全宛先の送信で使い回す
//! - **close は呼び出し側の責務**: dial に成功したセッションは、送信の成否に関わらず
//!   [`MailSession::close`] をちょうど 1 回呼ぶ
//! - **2 つの実装**: SMTP（本番）、Noop（ドライラン）。`NOTIFICATION_BACKEND` で選択する

mod noop;
mod smtp;

use async_trait::async_trait;
use buildmail_domain::notification::{EmailMessage, NotificationError};
pub use noop::NoopMailConnector;
pub use smtp::{SmtpConfig, SmtpConnector, SmtpSession};

/// メール送信セッションを開くトレイト
#[async_trait]
pub trait MailConnector: Send + Sync {
    /// サーバーに接続し、送信可能なセッションを返す
    ///
    /// 失敗した場合はセッションが存在しないため close は不要。
    async fn dial(&self) -> Result<Box<dyn MailSession>, NotificationError>;
}

/// 開かれた 1 本の接続上でメールを送信するトレイト
#[async_trait]
pub trait MailSession: Send {
    /// メールを 1 通送信する
    async fn send_email(&mut self, email: &EmailMessage) -> Result<(), NotificationError>;

    /// 接続を閉じる
    ///
    /// 切断時のエラーは送信結果に影響しないため、ログ出力のみ行う。
    async fn close(&mut self);
}
