//! # 宛先解決
//!
//! 設定の宛先リスト・コミット作成者・宛先ファイルの 3 つのソースを
//! 重複なしの [`RecipientSet`] にまとめる。
//!
//! 解決処理は失敗しない。空の宛先や読めない宛先ファイルはログに残して
//! スキップし、残りの入力で処理を続ける。

use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use buildmail_domain::recipient::RecipientSet;
use buildmail_shared::{event_log::event, log_business_event};

use crate::config::NotifierConfig;

/// 通知の宛先集合を解決する
///
/// アドレスは完全一致で重複排除する（大文字小文字や前後の空白は正規化しない）。
pub fn resolve_recipients(config: &NotifierConfig, commit_author_email: &str) -> RecipientSet {
    let mut recipients = RecipientSet::new();

    for recipient in &config.recipients {
        if recipient.is_empty() {
            tracing::warn!("設定の宛先に空の要素があるためスキップ");
            continue;
        }
        recipients.insert(recipient.as_str());
    }

    if !config.recipients_only {
        if commit_author_email.is_empty() {
            tracing::warn!("コミット作成者のメールアドレスが空");
        } else {
            recipients.insert(commit_author_email);
        }
    }

    if let Some(path) = &config.recipients_file {
        read_recipients_file(path, &mut recipients);
    }

    log_business_event!(
        event.category = event::category::NOTIFICATION,
        event.action = event::action::RECIPIENTS_RESOLVED,
        event.result = event::result::SUCCESS,
        notification.recipient_count = recipients.len(),
        notification.recipients = %recipients,
        "宛先を解決"
    );

    recipients
}

/// 宛先ファイルを 1 行 1 アドレスとして読み込む
///
/// 開けない場合は何も追加しない。UTF-8 でない行は警告してスキップする。
/// 読み込み途中の I/O エラーはそれ以降の行を諦める。
fn read_recipients_file(path: &Path, recipients: &mut RecipientSet) {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            tracing::error!(
                error = %e,
                path = %path.display(),
                "宛先ファイルを開けないためスキップ"
            );
            return;
        }
    };

    // 行単位はバイト列で読む。UTF-8 でない行だけを飛ばし、後続の行は読み続ける
    for (index, line) in BufReader::new(file).split(b'\n').enumerate() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    path = %path.display(),
                    "宛先ファイルの読み込みを中断"
                );
                return;
            }
        };

        // CRLF の改行に対応する
        let line = line.strip_suffix(b"\r").unwrap_or(line.as_slice());
        let Ok(recipient) = std::str::from_utf8(line) else {
            tracing::warn!(
                path = %path.display(),
                line = index + 1,
                "UTF-8 として解釈できない行をスキップ"
            );
            continue;
        };
        if recipient.is_empty() {
            tracing::warn!(path = %path.display(), "宛先ファイルの空行をスキップ");
            continue;
        }
        recipients.insert(recipient);
    }
}
