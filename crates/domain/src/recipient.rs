//! # 宛先集合
//!
//! 通知 1 回分の送信先メールアドレスの集合。
//!
//! - 要素は一意（完全一致で比較、大文字小文字や空白の正規化はしない）
//! - 挿入順序に意味はない
//! - 空文字列は決して含まない

use std::{collections::HashSet, fmt};

use derive_more::Deref;

/// 重複なしの宛先集合
///
/// 読み取りは `Deref` 経由で `HashSet<String>` の API をそのまま使える。
/// 書き込みは [`insert`](RecipientSet::insert) のみで、空文字列を拒否する。
#[derive(Debug, Clone, Default, PartialEq, Eq, Deref)]
pub struct RecipientSet(HashSet<String>);

impl RecipientSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 宛先を追加する
    ///
    /// 新規に追加された場合のみ `true` を返す。
    /// 空文字列と既存アドレスは追加されず `false` を返す。
    pub fn insert(&mut self, address: impl Into<String>) -> bool {
        let address = address.into();
        if address.is_empty() {
            return false;
        }
        self.0.insert(address)
    }
}

impl<'a> IntoIterator for &'a RecipientSet {
    type Item = &'a String;
    type IntoIter = std::collections::hash_set::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// ログ出力用。順序を安定させるため辞書順で連結する。
impl fmt::Display for RecipientSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut addresses: Vec<&str> = self.0.iter().map(String::as_str).collect();
        addresses.sort_unstable();
        write!(f, "[{}]", addresses.join(", "))
    }
}
