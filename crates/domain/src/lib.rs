//! # Buildmail ドメイン層
//!
//! CI ジョブ終了時のビルド通知メールを組み立てるためのドメインモデルを定義する。
//!
//! ## 設計方針
//!
//! - **純粋なデータ**: ファイル I/O やネットワーク I/O は一切行わない
//! - **不変条件は型で守る**: 宛先集合に空文字列が入らないことを [`RecipientSet`] が保証する
//! - **エラーは 1 種類**: 通知パイプラインの致命的エラーは [`NotificationError`] に集約する
//!
//! ## 依存関係の方向
//!
//! ```text
//! notifier → infra → domain
//! ```
//!
//! ## モジュール構成
//!
//! - [`context`] - テンプレートに渡すリポジトリ・コミット・ビルド情報
//! - [`recipient`] - 重複なしの宛先集合
//! - [`notification`] - 送信メッセージとエラー定義

pub mod context;
pub mod notification;
pub mod recipient;

pub use context::BuildContext;
pub use notification::{AddressField, EmailMessage, NotificationError, Sender};
pub use recipient::RecipientSet;
