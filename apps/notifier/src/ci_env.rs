//! # CI 環境変数からのコンテキスト読み込み
//!
//! Drone 互換の `DRONE_*` 環境変数から [`BuildContext`] を組み立てる。
//!
//! 未設定の変数は空文字列・0・`false` になる。
//! 数値や真偽値として解釈できない値は警告を出したうえで既定値に落とす。

use std::{env, str::FromStr};

use buildmail_domain::context::{
    Author,
    Build,
    BuildContext,
    Commit,
    Job,
    Prev,
    PrevBuild,
    PrevCommit,
    Remote,
    Repo,
    Yaml,
};

use crate::config::parse_bool;

/// プロセスの環境変数からコンテキストを読み込む
pub fn load_context_from_env() -> BuildContext {
    load_context(|key| env::var(key).ok())
}

/// 任意のキー参照関数からコンテキストを読み込む
pub fn load_context<F>(lookup: F) -> BuildContext
where
    F: Fn(&str) -> Option<String>,
{
    let reader = EnvReader { lookup };

    BuildContext {
        repo:         Repo {
            full_name: reader.string("DRONE_REPO"),
            owner:     reader.string("DRONE_REPO_OWNER"),
            name:      reader.string("DRONE_REPO_NAME"),
            scm:       reader.string("DRONE_REPO_SCM"),
            link:      reader.string("DRONE_REPO_LINK"),
            avatar:    reader.string("DRONE_REPO_AVATAR"),
            branch:    reader.string("DRONE_REPO_BRANCH"),
            private:   reader.flag("DRONE_REPO_PRIVATE"),
            trusted:   reader.flag("DRONE_REPO_TRUSTED"),
        },
        remote:       Remote {
            url: reader.string("DRONE_REMOTE_URL"),
        },
        commit:       Commit {
            sha:     reader.string("DRONE_COMMIT_SHA"),
            git_ref: reader.string("DRONE_COMMIT_REF"),
            branch:  reader.string("DRONE_COMMIT_BRANCH"),
            link:    reader.string("DRONE_COMMIT_LINK"),
            message: reader.string("DRONE_COMMIT_MESSAGE"),
            author:  Author {
                name:   reader.string("DRONE_COMMIT_AUTHOR"),
                email:  reader.string("DRONE_COMMIT_AUTHOR_EMAIL"),
                avatar: reader.string("DRONE_COMMIT_AUTHOR_AVATAR"),
            },
        },
        build:        Build {
            number:   reader.number("DRONE_BUILD_NUMBER"),
            event:    reader.string("DRONE_BUILD_EVENT"),
            status:   reader.string("DRONE_BUILD_STATUS"),
            link:     reader.string("DRONE_BUILD_LINK"),
            created:  reader.number("DRONE_BUILD_CREATED"),
            started:  reader.number("DRONE_BUILD_STARTED"),
            finished: reader.number("DRONE_BUILD_FINISHED"),
        },
        prev:         Prev {
            build:  PrevBuild {
                status: reader.string("DRONE_PREV_BUILD_STATUS"),
                number: reader.number("DRONE_PREV_BUILD_NUMBER"),
            },
            commit: PrevCommit {
                sha: reader.string("DRONE_PREV_COMMIT_SHA"),
            },
        },
        job:          Job {
            status:    reader.string("DRONE_JOB_STATUS"),
            exit_code: reader.number("DRONE_JOB_EXIT_CODE"),
            started:   reader.number("DRONE_JOB_STARTED"),
            finished:  reader.number("DRONE_JOB_FINISHED"),
        },
        yaml:         Yaml {
            signed:   reader.flag("DRONE_YAML_SIGNED"),
            verified: reader.flag("DRONE_YAML_VERIFIED"),
        },
        tag:          reader.string("DRONE_TAG"),
        pull_request: reader.number("DRONE_PULL_REQUEST"),
        deploy_to:    reader.string("DRONE_DEPLOY_TO"),
    }
}

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, key: &str) -> String {
        (self.lookup)(key).unwrap_or_default()
    }

    fn number<T>(&self, key: &str) -> T
    where
        T: FromStr + Default,
    {
        match (self.lookup)(key) {
            None => T::default(),
            Some(value) if value.trim().is_empty() => T::default(),
            Some(value) => value.trim().parse().unwrap_or_else(|_| {
                tracing::warn!(key, value = %value, "数値として解釈できないため 0 として扱う");
                T::default()
            }),
        }
    }

    fn flag(&self, key: &str) -> bool {
        match (self.lookup)(key) {
            None => false,
            Some(value) if value.trim().is_empty() => false,
            Some(value) => parse_bool(&value).unwrap_or_else(|| {
                tracing::warn!(key, value = %value, "真偽値として解釈できないため false として扱う");
                false
            }),
        }
    }
}
