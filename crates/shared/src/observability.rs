//! # ログ出力の初期化
//!
//! CI のステップとして実行されるため、ログはすべて stderr に出す。
//! stdout はステップの出力として残し、ログ行と混ざらないようにする。
//!
//! | 変数名 | 説明 |
//! |--------|------|
//! | `RUST_LOG` | ログレベル（デフォルト: `info,buildmail=debug`） |
//! | `LOG_FORMAT` | `pretty`（デフォルト）または `json`（大文字小文字を区別しない） |
//! | `NO_COLOR` | 設定されていれば pretty 形式でも ANSI カラーを使わない |

use tracing::Span;

#[cfg(feature = "observability")]
const DEFAULT_FILTER: &str = "info,buildmail=debug";

/// ログ出力形式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// 1 行 1 JSON（ログ収集基盤に流す場合）
    Json,
    /// CI のログビューアで読む場合
    #[default]
    Pretty,
}

/// ログ出力の設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    /// ルートスパンの `app` フィールド
    pub app_name:   String,
    pub log_format: LogFormat,
    /// pretty 形式で ANSI カラーを使うか
    pub ansi:       bool,
}

impl TracingConfig {
    /// プロセスの環境変数から読み込む
    pub fn from_env(app_name: impl Into<String>) -> Self {
        Self::from_lookup(app_name, |key| std::env::var(key).ok())
    }

    /// 任意のキー参照関数から読み込む
    ///
    /// 不正な `LOG_FORMAT` は pretty にフォールバックする。
    /// subscriber の初期化前なので、警告は stderr に直接書く。
    pub fn from_lookup<F>(app_name: impl Into<String>, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let log_format = match lookup("LOG_FORMAT").filter(|value| !value.is_empty()) {
            None => LogFormat::default(),
            Some(value) => value.parse().unwrap_or_else(|_| {
                eprintln!("WARNING: unknown LOG_FORMAT={value:?}, falling back to pretty");
                LogFormat::Pretty
            }),
        };

        Self {
            app_name: app_name.into(),
            log_format,
            ansi: lookup("NO_COLOR").is_none(),
        }
    }

    /// 実行全体を包むスパン
    pub fn root_span(&self) -> Span {
        tracing::info_span!("app", app = %self.app_name)
    }
}

/// グローバル subscriber を登録する
///
/// [`tracing_error::ErrorLayer`] も登録し、エラー発生時の SpanTrace を取れるようにする。
#[cfg(feature = "observability")]
pub fn init_tracing(config: &TracingConfig) {
    use tracing_subscriber::{EnvFilter, Layer as _, layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let fmt_layer = match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_span_list(false)
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_ansi(config.ansi)
            .with_writer(std::io::stderr)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(tracing_error::ErrorLayer::default())
        .init();
}
