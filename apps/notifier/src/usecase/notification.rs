//! # 通知ユースケース
//!
//! CI ジョブ終了時のビルド通知メールの生成・送信を統合する。
//!
//! ## モジュール構成
//!
//! - [`recipient_resolver`] - 設定・コミット作成者・宛先ファイルからの宛先解決
//! - [`template_renderer`] - tera テンプレートエンジンによる件名・本文の生成
//! - [`body_compositor`] - CSS インライン化とプレーンテキスト版の導出
//! - [`service`] - 解決 + レンダリング + 変換 + 送信の統合サービス

pub mod body_compositor;
pub mod recipient_resolver;
pub mod service;
pub mod template_renderer;

pub use body_compositor::{ComposedBody, compose};
pub use recipient_resolver::resolve_recipients;
pub use service::{NotificationService, RenderedMessage};
pub use template_renderer::{RenderedTemplates, TemplateRenderer};
