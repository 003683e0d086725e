//! # Buildmail 共有ユーティリティ
//!
//! トレーシング初期化と構造化ログのヘルパーを提供する。
//!
//! ## 設計方針
//!
//! - ビジネスロジックを含まない純粋なユーティリティのみを配置
//! - subscriber 関連の依存は `observability` feature の背後に置く

pub mod event_log;
pub mod observability;
