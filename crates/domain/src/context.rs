//! # ビルドコンテキスト
//!
//! テンプレートレンダリングの入力となる CI メタデータのスナップショット。
//!
//! 値は CI 環境変数から一度だけ読み込まれ、以降は読み取り専用で扱う。
//! テンプレートからは snake_case のキーで参照する（例: `{{ commit.author.email }}`）。

use serde::{Deserialize, Serialize};

/// リポジトリ情報
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repo {
    /// `owner/name` 形式のフルネーム
    pub full_name: String,
    pub owner:     String,
    pub name:      String,
    /// SCM 種別（例: `git`）
    pub scm:       String,
    pub link:      String,
    pub avatar:    String,
    /// デフォルトブランチ
    pub branch:    String,
    pub private:   bool,
    pub trusted:   bool,
}

/// リモート情報
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Remote {
    pub url: String,
}

/// コミット作成者
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name:   String,
    pub email:  String,
    pub avatar: String,
}

/// コミット情報
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub sha:     String,
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub branch:  String,
    pub link:    String,
    pub message: String,
    pub author:  Author,
}

/// ビルド情報
///
/// タイムスタンプは Unix 秒。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Build {
    pub number:   u64,
    /// トリガーイベント（push / pull_request / tag / deployment）
    pub event:    String,
    /// ビルド結果（success / failure）
    pub status:   String,
    pub link:     String,
    pub created:  i64,
    pub started:  i64,
    pub finished: i64,
}

/// 前回ビルドの概要
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrevBuild {
    pub status: String,
    pub number: u64,
}

/// 前回ビルド時のコミット
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrevCommit {
    pub sha: String,
}

/// 前回ビルドの情報
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prev {
    pub build:  PrevBuild,
    pub commit: PrevCommit,
}

/// ジョブ情報
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub status:    String,
    pub exit_code: i32,
    pub started:   i64,
    pub finished:  i64,
}

/// パイプライン定義の署名検証結果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Yaml {
    pub signed:   bool,
    pub verified: bool,
}

/// テンプレートに渡すビルドコンテキスト
///
/// 通知 1 回につき 1 つ生成され、件名と本文の両方のテンプレートに
/// 同一のものが渡される。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildContext {
    pub repo:         Repo,
    pub remote:       Remote,
    pub commit:       Commit,
    pub build:        Build,
    pub prev:         Prev,
    pub job:          Job,
    pub yaml:         Yaml,
    pub tag:          String,
    pub pull_request: u64,
    pub deploy_to:    String,
}

impl BuildContext {
    /// コミット作成者のメールアドレスを返す
    pub fn commit_author_email(&self) -> &str {
        &self.commit.author.email
    }
}
