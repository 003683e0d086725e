//! # ユースケース層
//!
//! ビルド通知の送信フローを実装する。

pub mod notification;
