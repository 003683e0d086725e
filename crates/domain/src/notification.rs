//! # 通知
//!
//! メール通知の送信単位とエラーを定義する。
//!
//! ## 設計方針
//!
//! - **宛先ごとに 1 メッセージ**: [`EmailMessage`] は 1 人の宛先に送る 1 通を表す
//! - **失敗は即時中断**: [`NotificationError`] はすべて致命的で、発生した時点で残りの処理を打ち切る
//! - **スキップ可能な事象はエラーにしない**: 空の宛先や存在しない添付ファイルはログのみで続行する

use std::path::PathBuf;

use derive_more::Display;
use thiserror::Error;

/// アドレスを設定するヘッダ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum AddressField {
    From,
    To,
}

/// 通知パイプラインのエラー
///
/// いずれも致命的で、呼び出し元には単一の終端エラーとして返される。
/// 途中まで送信済みの宛先があっても部分成功としては報告しない。
#[derive(Debug, Error)]
pub enum NotificationError {
    /// テンプレートの解析・レンダリングに失敗
    #[error("テンプレートレンダリングに失敗: {0}")]
    TemplateFailed(String),

    /// CSS インライン化またはプレーンテキスト変換に失敗
    #[error("本文の変換に失敗: {0}")]
    RenderFailed(String),

    /// メールクライアントの構築に失敗
    #[error("メールクライアントの構築に失敗: {0}")]
    ClientFailed(String),

    /// SMTP サーバーへの接続に失敗
    #[error("SMTP サーバーへの接続に失敗: {0}")]
    ConnectionFailed(String),

    /// From / To のアドレスが不正
    #[error("{field} ヘッダのアドレスが不正 ({address:?}): {reason}")]
    InvalidAddress {
        field:   AddressField,
        address: String,
        reason:  String,
    },

    /// メッセージの送信に失敗
    #[error("{recipient} へのメール送信に失敗: {reason}")]
    SendFailed { recipient: String, reason: String },
}

impl NotificationError {
    /// 失敗した宛先を返す（宛先に紐づくエラーの場合のみ）
    pub fn recipient(&self) -> Option<&str> {
        match self {
            Self::SendFailed { recipient, .. } => Some(recipient),
            Self::InvalidAddress {
                field: AddressField::To,
                address,
                ..
            } => Some(address),
            _ => None,
        }
    }
}

/// 送信者
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub address: String,
    /// 表示名。空の場合はアドレスのみを From に設定する
    pub name:    String,
}

/// メールメッセージ
///
/// 宛先 1 人分の送信内容。件名・本文は全宛先で共通。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    /// 送信先メールアドレス
    pub to:          String,
    /// 件名
    pub subject:     String,
    /// HTML 本文（CSS インライン化済み）
    pub html_body:   String,
    /// プレーンテキスト本文
    pub text_body:   String,
    /// 添付ファイル（存在確認済み）
    pub attachments: Vec<PathBuf>,
}
