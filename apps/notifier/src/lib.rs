//! # Buildmail Notifier
//!
//! CI パイプラインの最後に実行され、ビルド結果をメールで通知するプラグイン。
//!
//! ## 処理の流れ
//!
//! ```text
//! 環境変数 → 設定 / コンテキスト → 宛先解決 → レンダリング → 本文変換 → SMTP 送信
//! ```
//!
//! ## モジュール構成
//!
//! - [`config`] - `PLUGIN_*` 環境変数からの設定読み込み
//! - [`ci_env`] - `DRONE_*` 環境変数からのビルドコンテキスト読み込み
//! - [`usecase`] - 通知の送信フロー

pub mod ci_env;
pub mod config;
pub mod usecase;
