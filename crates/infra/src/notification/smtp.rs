//! SMTP メール送信実装
//!
//! lettre の `AsyncSmtpConnection` を直接扱い、1 本の接続を全宛先で使い回す。
//! `AsyncSmtpTransport` は送信ごとに接続プールから取り出す設計のため、
//! 接続の開閉タイミングを制御したいここでは使わない。
//!
//! 接続手順:
//!
//! 1. TCP 接続 + EHLO
//! 2. STARTTLS（サーバーが対応している場合のみ。`no_starttls` で無効化）
//! 3. PLAIN 認証（ユーザー名・パスワードが両方指定されている場合のみ）

use std::path::Path;

use async_trait::async_trait;
use buildmail_domain::notification::{AddressField, EmailMessage, NotificationError, Sender};
use lettre::{
    Message,
    message::{Attachment, Mailbox, MultiPart, header::ContentType},
    transport::smtp::{
        authentication::{Credentials, Mechanism},
        client::{AsyncSmtpConnection, TlsParameters},
        extension::ClientId,
    },
};

use super::{MailConnector, MailSession};

/// SMTP 接続設定
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host:            String,
    pub port:            u16,
    /// HELO/EHLO で名乗るホスト名。未指定ならローカルのホスト名を使う
    pub client_hostname: Option<String>,
    pub username:        String,
    pub password:        String,
    /// 証明書検証を無効化する（自己署名証明書・ホスト名不一致を許容）
    pub skip_verify:     bool,
    /// STARTTLS を一切試みない
    pub no_starttls:     bool,
    pub sender:          Sender,
}

/// SMTP 接続の生成器
///
/// 構築時に設定を検証し、[`dial`](MailConnector::dial) で接続を開く。
pub struct SmtpConnector {
    host:        String,
    port:        u16,
    hello_name:  ClientId,
    credentials: Option<Credentials>,
    /// STARTTLS 用の TLS 設定。`None` なら STARTTLS しない
    tls:         Option<TlsParameters>,
    sender:      Sender,
}

impl SmtpConnector {
    /// 設定から SMTP クライアントを構築する
    ///
    /// ホスト・ポートの組み合わせが不正な場合や TLS 設定の構築に失敗した場合は
    /// [`NotificationError::ClientFailed`] を返す。
    pub fn new(config: SmtpConfig) -> Result<Self, NotificationError> {
        if config.host.trim().is_empty() {
            return Err(NotificationError::ClientFailed(
                "SMTP ホストが指定されていません".to_string(),
            ));
        }
        if config.port == 0 {
            return Err(NotificationError::ClientFailed(format!(
                "SMTP ポートが不正です: {}:{}",
                config.host, config.port
            )));
        }

        let hello_name = match config.client_hostname {
            Some(hostname) if !hostname.is_empty() => ClientId::Domain(hostname),
            _ => ClientId::default(),
        };

        let credentials = (!config.username.is_empty() && !config.password.is_empty())
            .then(|| Credentials::new(config.username, config.password));

        let tls = if config.no_starttls {
            None
        } else {
            let parameters = TlsParameters::builder(config.host.clone())
                .dangerous_accept_invalid_certs(config.skip_verify)
                .build()
                .map_err(|e| {
                    NotificationError::ClientFailed(format!("TLS 設定の構築に失敗: {e}"))
                })?;
            Some(parameters)
        };

        Ok(Self {
            host: config.host,
            port: config.port,
            hello_name,
            credentials,
            tls,
            sender: config.sender,
        })
    }
}

#[async_trait]
impl MailConnector for SmtpConnector {
    async fn dial(&self) -> Result<Box<dyn MailSession>, NotificationError> {
        let mut connection = AsyncSmtpConnection::connect_tokio1(
            (self.host.as_str(), self.port),
            None,
            &self.hello_name,
            None,
            None,
        )
        .await
        .map_err(|e| NotificationError::ConnectionFailed(e.to_string()))?;

        if let Some(tls) = &self.tls {
            if connection.can_starttls() {
                connection
                    .starttls(tls.clone(), &self.hello_name)
                    .await
                    .map_err(|e| {
                        NotificationError::ConnectionFailed(format!("STARTTLS に失敗: {e}"))
                    })?;
                tracing::debug!("STARTTLS で接続を暗号化しました");
            } else {
                tracing::debug!("サーバーが STARTTLS に対応していないため平文で続行します");
            }
        }

        if let Some(credentials) = &self.credentials {
            connection
                .auth(&[Mechanism::Plain], credentials)
                .await
                .map_err(|e| NotificationError::ConnectionFailed(format!("SMTP 認証に失敗: {e}")))?;
        }

        tracing::info!(host = %self.host, port = self.port, "SMTP サーバーに接続しました");

        Ok(Box::new(SmtpSession {
            connection,
            sender: self.sender.clone(),
        }))
    }
}

/// 開かれた SMTP 接続
pub struct SmtpSession {
    connection: AsyncSmtpConnection,
    sender:     Sender,
}

#[async_trait]
impl MailSession for SmtpSession {
    async fn send_email(&mut self, email: &EmailMessage) -> Result<(), NotificationError> {
        let message = build_message(&self.sender, email).await?;

        self.connection
            .send(message.envelope(), &message.formatted())
            .await
            .map_err(|e| NotificationError::SendFailed {
                recipient: email.to.clone(),
                reason:    e.to_string(),
            })?;

        Ok(())
    }

    async fn close(&mut self) {
        if let Err(e) = self.connection.quit().await {
            tracing::warn!(error = %e, "SMTP 接続の切断に失敗");
        }
    }
}

/// 宛先 1 人分のメッセージを構築する
///
/// 本文は plain text を主、HTML を代替表現とした `multipart/alternative`。
/// 添付ファイルがある場合は `multipart/mixed` で包む。
pub(crate) async fn build_message(
    sender: &Sender,
    email: &EmailMessage,
) -> Result<Message, NotificationError> {
    let display_name = (!sender.name.is_empty()).then(|| sender.name.clone());
    let from = parse_mailbox(AddressField::From, &sender.address, display_name)?;
    let to = parse_mailbox(AddressField::To, &email.to, None)?;

    let body =
        MultiPart::alternative_plain_html(email.text_body.clone(), email.html_body.clone());

    let builder = Message::builder()
        .from(from)
        .to(to)
        .subject(email.subject.as_str());

    let result = if email.attachments.is_empty() {
        builder.multipart(body)
    } else {
        let mut mixed = MultiPart::mixed().multipart(body);
        for path in &email.attachments {
            mixed = mixed.singlepart(attachment_part(path, &email.to).await?);
        }
        builder.multipart(mixed)
    };

    result.map_err(|e| NotificationError::SendFailed {
        recipient: email.to.clone(),
        reason:    format!("メッセージ構築失敗: {e}"),
    })
}

/// `Name <addr>` 形式と前後の空白を許容してパースする
///
/// `name` が指定された場合はパース結果の表示名を置き換える。
fn parse_mailbox(
    field: AddressField,
    address: &str,
    name: Option<String>,
) -> Result<Mailbox, NotificationError> {
    let mut mailbox: Mailbox = address
        .parse()
        .map_err(|e: lettre::address::AddressError| NotificationError::InvalidAddress {
            field,
            address: address.to_string(),
            reason: e.to_string(),
        })?;
    if name.is_some() {
        mailbox.name = name;
    }
    Ok(mailbox)
}

/// ファイルを読み込み、ファイル名と推定 MIME タイプで添付パートを作る
async fn attachment_part(
    path: &Path,
    recipient: &str,
) -> Result<lettre::message::SinglePart, NotificationError> {
    let send_failed = |reason: String| NotificationError::SendFailed {
        recipient: recipient.to_string(),
        reason,
    };

    let content = tokio::fs::read(path)
        .await
        .map_err(|e| send_failed(format!("添付ファイルの読み込みに失敗 ({}): {e}", path.display())))?;

    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let mime = mime_guess::from_path(path).first_or_octet_stream();
    let content_type = ContentType::parse(mime.essence_str())
        .map_err(|e| send_failed(format!("添付ファイルの MIME タイプが不正 ({mime}): {e}")))?;

    Ok(Attachment::new(filename).body(content, content_type))
}
