//! # 本文コンポジター
//!
//! レンダリング済みの HTML 本文から、CSS をインライン化した HTML と
//! プレーンテキスト版の組を作る。
//!
//! 多くのメールクライアントは `<style>` ブロックを無視するため、スタイルは
//! すべて `style` 属性に展開する。プレーンテキスト版はインライン化後の HTML から導出する。

use buildmail_domain::notification::NotificationError;
use css_inline::CSSInliner;

/// プレーンテキストの折り返し幅
const TEXT_WIDTH: usize = 78;

/// HTML とプレーンテキストの本文
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedBody {
    pub html: String,
    pub text: String,
}

/// 本文を HTML / プレーンテキストの 2 形式に変換する
///
/// どちらかの変換に失敗した場合は `RenderFailed` を返す（片方の形式だけで送ることはしない）。
pub fn compose(rendered_body: &str) -> Result<ComposedBody, NotificationError> {
    let inliner = CSSInliner::options()
        .load_remote_stylesheets(false)
        .build();

    let html = inliner.inline(rendered_body).map_err(|e| {
        tracing::error!(error = %e, "CSS のインライン化に失敗");
        NotificationError::RenderFailed(e.to_string())
    })?;

    let text = html2text::config::plain()
        .string_from_read(html.as_bytes(), TEXT_WIDTH)
        .map_err(|e| {
            tracing::error!(error = %e, "プレーンテキストへの変換に失敗");
            NotificationError::RenderFailed(e.to_string())
        })?;

    Ok(ComposedBody { html, text })
}
