//! # Buildmail インフラ層
//!
//! SMTP サーバーとの接続・通信を担当するインフラストラクチャ層。
//!
//! ## 設計方針
//!
//! 通知サービスは [`notification::MailConnector`] / [`notification::MailSession`]
//! トレイトにのみ依存し、SMTP の詳細はこのクレートにカプセル化する。
//!
//! ## 依存関係
//!
//! ```text
//! notifier → infra → domain
//! ```
//!
//! ## モジュール構成
//!
//! - [`notification`] - メール送信セッション（SMTP / Noop）
//! - `mock` - テスト用のインメモリ実装（`test-utils` feature）

pub mod notification;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use notification::{MailConnector, MailSession};
