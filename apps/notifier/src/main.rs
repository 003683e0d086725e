//! # buildmail
//!
//! CI パイプラインのステップとして実行し、ビルド結果をメールで通知する。
//!
//! ## 環境変数
//!
//! | 変数名 | 必須 | 説明 |
//! |--------|------|------|
//! | `PLUGIN_HOST` | **Yes** | SMTP サーバーのホスト名 |
//! | `PLUGIN_FROM_ADDRESS` | **Yes** | 送信元アドレス |
//! | `PLUGIN_PORT` | No | ポート番号（デフォルト: `587`） |
//! | `PLUGIN_RECIPIENTS` | No | カンマ区切りの宛先 |
//! | `NOTIFICATION_BACKEND` | No | `smtp`（デフォルト）または `noop` |
//! | `LOG_FORMAT` | No | `json` または `pretty`（デフォルト） |
//!
//! そのほかの `PLUGIN_*` は [`buildmail_notifier::config`] を参照。
//! ビルド情報は `DRONE_*` 環境変数から読み込む。
//!
//! ## 起動方法
//!
//! ```bash
//! # ドライラン（送信せずログのみ）
//! NOTIFICATION_BACKEND=noop cargo run -p buildmail-notifier
//! ```

use std::sync::Arc;

use buildmail_infra::notification::{MailConnector, NoopMailConnector, SmtpConnector};
use buildmail_notifier::{
    ci_env,
    config::{NotificationBackend, NotifierConfig},
    usecase::notification::NotificationService,
};
use buildmail_shared::observability::{TracingConfig, init_tracing};
use tracing::Instrument as _;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env ファイルを読み込む（存在する場合）
    dotenvy::dotenv().ok();

    let tracing_config = TracingConfig::from_env("buildmail");
    init_tracing(&tracing_config);

    run().instrument(tracing_config.root_span()).await
}

async fn run() -> anyhow::Result<()> {
    let config = NotifierConfig::from_env().inspect_err(|e| {
        tracing::error!(error = %e, "設定の読み込みに失敗");
    })?;
    let context = ci_env::load_context_from_env();

    tracing::info!(
        backend = %config.backend,
        repo = %context.repo.full_name,
        build = context.build.number,
        "ビルド通知を開始します"
    );

    let connector: Arc<dyn MailConnector> = match config.backend {
        NotificationBackend::Smtp => {
            let connector = SmtpConnector::new(config.smtp_config()).inspect_err(|e| {
                tracing::error!(error = %e, "SMTP クライアントの構築に失敗");
            })?;
            Arc::new(connector)
        }
        NotificationBackend::Noop => Arc::new(NoopMailConnector::new(config.sender())),
    };

    let service = NotificationService::new(connector);
    service.notify(&config, &context).await?;

    tracing::info!("ビルド通知が完了しました");
    Ok(())
}
