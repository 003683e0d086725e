//! # テンプレートレンダラー
//!
//! tera テンプレートエンジンで件名と本文を [`BuildContext`] に対して展開する。
//!
//! ## 設計方針
//!
//! - **構築時に解析**: 件名・本文テンプレートは [`TemplateRenderer::new`] で登録され、
//!   構文エラーはその時点で `TemplateFailed` になる
//! - **件名はエスケープしない**: 件名は `.txt`、本文は `.html` として登録し、
//!   HTML エスケープは本文の変数展開にだけ適用される
//! - **未定義の変数はエラー**: コンテキストにないキーを参照するとレンダリングに失敗する
//! - **前後の空白を除去**: レンダリング結果は trim して返す

use std::{collections::HashMap, error::Error as _};

use buildmail_domain::{context::BuildContext, notification::NotificationError};
use tera::{Context, Tera, Value};

const SUBJECT_TEMPLATE: &str = "subject.txt";
const BODY_TEMPLATE: &str = "body.html";

/// レンダリング済みの件名と本文
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedTemplates {
    pub subject: String,
    /// CSS インライン化前の HTML
    pub body:    String,
}

/// テンプレートレンダラー
///
/// 1 回の実行で件名・本文の組を 1 つだけ保持する。
pub struct TemplateRenderer {
    engine: Tera,
}

impl TemplateRenderer {
    /// 件名・本文テンプレートを解析してレンダラーを作成する
    pub fn new(subject: &str, body: &str) -> Result<Self, NotificationError> {
        let mut engine = Tera::default();
        engine.register_filter("uppercasefirst", uppercase_first);
        engine.register_function("duration", duration);

        engine
            .add_raw_templates(vec![(SUBJECT_TEMPLATE, subject), (BODY_TEMPLATE, body)])
            .map_err(template_error)?;

        Ok(Self { engine })
    }

    /// 件名と本文をレンダリングする
    ///
    /// 本文 → 件名の順に展開する。どちらかが失敗した時点でエラーを返す。
    pub fn render(&self, context: &BuildContext) -> Result<RenderedTemplates, NotificationError> {
        let context = Context::from_serialize(context).map_err(template_error)?;

        let body = self.render_one(BODY_TEMPLATE, &context).inspect_err(|e| {
            tracing::error!(error = %e, "本文テンプレートのレンダリングに失敗");
        })?;

        let subject = self.render_one(SUBJECT_TEMPLATE, &context).inspect_err(|e| {
            tracing::error!(error = %e, "件名テンプレートのレンダリングに失敗");
        })?;

        Ok(RenderedTemplates { subject, body })
    }

    fn render_one(&self, name: &str, context: &Context) -> Result<String, NotificationError> {
        self.engine
            .render(name, context)
            .map(|rendered| rendered.trim().to_string())
            .map_err(template_error)
    }
}

/// tera のエラーは原因がネストされるため、連鎖をすべて連結する
fn template_error(error: tera::Error) -> NotificationError {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    NotificationError::TemplateFailed(message)
}

/// 先頭の 1 文字だけを大文字にする
fn uppercase_first(value: &Value, _: &HashMap<String, Value>) -> tera::Result<Value> {
    let text = tera::try_get_value!("uppercasefirst", "value", String, value);
    let mut chars = text.chars();
    let converted = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    };
    Ok(Value::String(converted))
}

/// `start` から `end` までの経過時間を `1h2m3s` 形式で返す（引数は Unix 秒）
fn duration(args: &HashMap<String, Value>) -> tera::Result<Value> {
    let timestamp = |key: &str| -> tera::Result<i64> {
        let value = args
            .get(key)
            .ok_or_else(|| tera::Error::msg(format!("duration: `{key}` 引数が必要です")))?;
        value
            .as_i64()
            .or_else(|| value.as_f64().map(|seconds| seconds as i64))
            .ok_or_else(|| tera::Error::msg(format!("duration: `{key}` は数値で指定してください")))
    };

    let elapsed = (timestamp("end")? - timestamp("start")?).max(0);
    Ok(Value::String(format_elapsed(elapsed)))
}

fn format_elapsed(seconds: i64) -> String {
    let (hours, minutes, seconds) = (seconds / 3600, seconds % 3600 / 60, seconds % 60);
    if hours > 0 {
        format!("{hours}h{minutes}m{seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m{seconds}s")
    } else {
        format!("{seconds}s")
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::config::{DEFAULT_BODY, DEFAULT_SUBJECT};

    fn make_context() -> BuildContext {
        let mut context = BuildContext::default();
        context.repo.full_name = "octocat/hello-world".to_string();
        context.repo.owner = "octocat".to_string();
        context.repo.name = "hello-world".to_string();
        context.commit.sha = "6dcb09b5b57875f334f61aebed695e2e4193db5e".to_string();
        context.commit.branch = "main".to_string();
        context.commit.message = "Fix <script> handling & escaping".to_string();
        context.commit.author.name = "octocat".to_string();
        context.commit.author.email = "octocat@example.com".to_string();
        context.build.number = 42;
        context.build.status = "success".to_string();
        context.build.started = 1_700_000_000;
        context.build.finished = 1_700_000_125;
        context
    }

    #[test]
    fn 件名と本文をレンダリングする() {
        let renderer = TemplateRenderer::new(
            "[{{ build.status }}] {{ repo.full_name }} #{{ build.number }}",
            "<p>{{ commit.author.name }} &lt;{{ commit.author.email }}&gt;</p>",
        )
        .unwrap();

        let rendered = renderer.render(&make_context()).unwrap();

        assert_eq!(rendered.subject, "[success] octocat/hello-world #42");
        assert_eq!(
            rendered.body,
            "<p>octocat &lt;octocat@example.com&gt;</p>"
        );
    }

    #[test]
    fn 同じ入力からは同じ結果になる() {
        let renderer = TemplateRenderer::new(DEFAULT_SUBJECT, DEFAULT_BODY).unwrap();
        let context = make_context();

        let first = renderer.render(&context).unwrap();
        let second = renderer.render(&context).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn デフォルトテンプレートでレンダリングできる() {
        let renderer = TemplateRenderer::new(DEFAULT_SUBJECT, DEFAULT_BODY).unwrap();

        let rendered = renderer.render(&make_context()).unwrap();

        assert_eq!(
            rendered.subject,
            "[Success] octocat/hello-world (main - 6dcb09b5)"
        );
        assert!(rendered.body.contains("Successful build #42"));
        assert!(rendered.body.contains("2m5s"));
    }

    #[test]
    fn 本文の変数はエスケープされ件名はされない() {
        let renderer =
            TemplateRenderer::new("{{ commit.message }}", "<p>{{ commit.message }}</p>").unwrap();

        let rendered = renderer.render(&make_context()).unwrap();

        assert_eq!(rendered.subject, "Fix <script> handling & escaping");
        assert_eq!(
            rendered.body,
            "<p>Fix &lt;script&gt; handling &amp; escaping</p>"
        );
    }

    #[test]
    fn 前後の空白が除去される() {
        let renderer = TemplateRenderer::new("\n  {{ build.status }}  \n", "\n<p>ok</p>\n\n").unwrap();

        let rendered = renderer.render(&make_context()).unwrap();

        assert_eq!(rendered.subject, "success");
        assert_eq!(rendered.body, "<p>ok</p>");
    }

    #[rstest]
    #[case::未定義の変数("{{ build.unknown_field }}")]
    #[case::未定義のトップレベル変数("{{ nothing }}")]
    fn 未定義の変数はtemplate_failedになる(#[case] subject: &str) {
        let renderer = TemplateRenderer::new(subject, "<p>ok</p>").unwrap();

        let result = renderer.render(&make_context());

        assert!(matches!(result, Err(NotificationError::TemplateFailed(_))));
    }

    #[test]
    fn 構文エラーは構築時にtemplate_failedになる() {
        let result = TemplateRenderer::new("{{ build.status", "<p>ok</p>");

        assert!(matches!(result, Err(NotificationError::TemplateFailed(_))));
    }

    #[test]
    fn uppercasefirstフィルタが先頭を大文字にする() {
        let renderer =
            TemplateRenderer::new("{{ build.status | uppercasefirst }}", "<p></p>").unwrap();

        let rendered = renderer.render(&make_context()).unwrap();

        assert_eq!(rendered.subject, "Success");
    }

    #[rstest]
    #[case(0, "0s")]
    #[case(59, "59s")]
    #[case(125, "2m5s")]
    #[case(3600, "1h0m0s")]
    #[case(3725, "1h2m5s")]
    fn 経過時間の表記(#[case] seconds: i64, #[case] expected: &str) {
        assert_eq!(format_elapsed(seconds), expected);
    }

    #[test]
    fn duration関数が開始と終了の差を返す() {
        let renderer = TemplateRenderer::new(
            "{{ duration(start=build.started, end=build.finished) }}",
            "<p></p>",
        )
        .unwrap();

        let rendered = renderer.render(&make_context()).unwrap();

        assert_eq!(rendered.subject, "2m5s");
    }

    #[test]
    fn duration関数の引数不足はtemplate_failedになる() {
        let renderer =
            TemplateRenderer::new("{{ duration(start=build.started) }}", "<p></p>").unwrap();

        let result = renderer.render(&make_context());

        assert!(matches!(result, Err(NotificationError::TemplateFailed(_))));
    }
}
