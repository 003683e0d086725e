//! # Notifier 設定
//!
//! CI プラグインとして渡される環境変数（`PLUGIN_*`）から通知設定を読み込む。
//!
//! 値の妥当性（ホスト名やアドレスの書式）はここでは検証しない。
//! 不正な値は SMTP クライアント構築時やメッセージ構築時に致命的エラーとなる。

use std::{env, path::PathBuf};

use buildmail_domain::notification::Sender;
use buildmail_infra::notification::SmtpConfig;
use thiserror::Error;

/// `PLUGIN_SUBJECT` 未指定時の件名テンプレート
pub const DEFAULT_SUBJECT: &str = include_str!("../templates/default_subject.txt");

/// `PLUGIN_BODY` 未指定時の本文テンプレート
pub const DEFAULT_BODY: &str = include_str!("../templates/default_body.html");

const DEFAULT_SMTP_PORT: u16 = 587;

/// 設定読み込みエラー
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} の値が不正です ({value:?}): {reason}")]
    InvalidValue {
        key:    &'static str,
        value:  String,
        reason: String,
    },
}

/// 送信バックエンド
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum NotificationBackend {
    /// SMTP サーバー経由で送信
    #[default]
    Smtp,
    /// 送信しない（ログ出力のみ）
    Noop,
}

/// 通知設定
///
/// 1 回の実行中は不変。
#[derive(Debug, Clone, Default)]
pub struct NotifierConfig {
    pub backend:         NotificationBackend,
    pub from_address:    String,
    pub from_name:       String,
    pub host:            String,
    pub port:            u16,
    pub username:        String,
    pub password:        String,
    pub skip_verify:     bool,
    pub no_starttls:     bool,
    pub recipients:      Vec<String>,
    pub recipients_file: Option<PathBuf>,
    pub recipients_only: bool,
    pub subject:         String,
    pub body:            String,
    pub attachment:      Option<PathBuf>,
    pub attachments:     Vec<PathBuf>,
    pub client_hostname: Option<String>,
}

impl NotifierConfig {
    /// 環境変数から設定を読み込む
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 任意のキー参照関数から設定を読み込む
    ///
    /// 空文字列の値は未設定として扱う。
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.is_empty());

        let backend: NotificationBackend = match get("NOTIFICATION_BACKEND") {
            Some(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
                key: "NOTIFICATION_BACKEND",
                value,
                reason: "smtp または noop を指定してください".to_string(),
            })?,
            None => NotificationBackend::default(),
        };

        let port: u16 = match get("PLUGIN_PORT") {
            Some(value) => value.parse().map_err(|e: std::num::ParseIntError| {
                ConfigError::InvalidValue {
                    key: "PLUGIN_PORT",
                    value,
                    reason: e.to_string(),
                }
            })?,
            None => DEFAULT_SMTP_PORT,
        };

        Ok(Self {
            backend,
            from_address: get("PLUGIN_FROM_ADDRESS").unwrap_or_default(),
            from_name: get("PLUGIN_FROM_NAME").unwrap_or_default(),
            host: get("PLUGIN_HOST").unwrap_or_default(),
            port,
            username: get("PLUGIN_USERNAME").unwrap_or_default(),
            password: get("PLUGIN_PASSWORD").unwrap_or_default(),
            skip_verify: bool_value("PLUGIN_SKIP_VERIFY", get("PLUGIN_SKIP_VERIFY"))?,
            no_starttls: bool_value("PLUGIN_NO_STARTTLS", get("PLUGIN_NO_STARTTLS"))?,
            recipients: get("PLUGIN_RECIPIENTS")
                .map(|value| split_list(&value))
                .unwrap_or_default(),
            recipients_file: get("PLUGIN_RECIPIENTS_FILE").map(PathBuf::from),
            recipients_only: bool_value("PLUGIN_RECIPIENTS_ONLY", get("PLUGIN_RECIPIENTS_ONLY"))?,
            subject: get("PLUGIN_SUBJECT").unwrap_or_else(|| DEFAULT_SUBJECT.to_string()),
            body: get("PLUGIN_BODY").unwrap_or_else(|| DEFAULT_BODY.to_string()),
            attachment: get("PLUGIN_ATTACHMENT").map(PathBuf::from),
            attachments: get("PLUGIN_ATTACHMENTS")
                .map(|value| {
                    split_list(&value)
                        .into_iter()
                        .filter(|path| !path.is_empty())
                        .map(PathBuf::from)
                        .collect()
                })
                .unwrap_or_default(),
            client_hostname: get("PLUGIN_CLIENT_HOSTNAME"),
        })
    }

    /// 送信者
    pub fn sender(&self) -> Sender {
        Sender {
            address: self.from_address.clone(),
            name:    self.from_name.clone(),
        }
    }

    /// SMTP クライアントの設定
    pub fn smtp_config(&self) -> SmtpConfig {
        SmtpConfig {
            host:            self.host.clone(),
            port:            self.port,
            client_hostname: self.client_hostname.clone(),
            username:        self.username.clone(),
            password:        self.password.clone(),
            skip_verify:     self.skip_verify,
            no_starttls:     self.no_starttls,
            sender:          self.sender(),
        }
    }

    /// 添付候補のパス（単一指定 → 複数指定の順）
    ///
    /// 存在確認はしない。送信時に存在しないものは黙って除外される。
    pub fn attachment_paths(&self) -> Vec<PathBuf> {
        self.attachment
            .iter()
            .chain(self.attachments.iter())
            .cloned()
            .collect()
    }
}

/// `true/false/1/0/yes/no/on/off`（大文字小文字を区別しない）を bool に変換する
pub(crate) fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// 未設定は `false`
fn bool_value(key: &'static str, value: Option<String>) -> Result<bool, ConfigError> {
    match value {
        None => Ok(false),
        Some(value) => parse_bool(&value).ok_or_else(|| ConfigError::InvalidValue {
            key,
            value,
            reason: "true または false を指定してください".to_string(),
        }),
    }
}

/// カンマ区切りのリストを分割する
///
/// 各要素は前後の空白を除去する。空要素は残す（宛先の空要素は解決時に警告を出すため）。
pub(crate) fn split_list(value: &str) -> Vec<String> {
    value.split(',').map(|item| item.trim().to_string()).collect()
}
