//! バージョンに基づくイメージ保持ポリシー
//!
//! 比較は常にセマンティックバージョンで行う（`0.9.0 < 0.10.0`）。
//! バージョンとして解釈できないタグは削除対象にならない。

use crate::error::{CoreError, Result};
use semver::Version;

/// 現在のプロジェクトバージョンを提供する
pub trait VersionProvider {
    fn current_version(&self) -> Result<String>;
}

impl VersionProvider for &str {
    fn current_version(&self) -> Result<String> {
        Ok((*self).to_string())
    }
}

/// (コンテナ, タグ) ごとの保持判定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionDecision {
    Keep,
    Delete,
}

pub struct VersionGate;

impl VersionGate {
    pub fn parse(value: &str) -> Result<Version> {
        Version::parse(value.trim()).map_err(|_| CoreError::VersionParse {
            value: value.to_string(),
        })
    }

    pub fn is_current(version: &str, current: &str) -> bool {
        match (Self::parse(version), Self::parse(current)) {
            (Ok(v), Ok(c)) => v == c,
            _ => version == current,
        }
    }

    pub fn eligible_for_deletion(tag: &str, current: &str) -> bool {
        match Self::parse(tag) {
            Ok(_) => !Self::is_current(tag, current),
            Err(e) => {
                tracing::debug!("Keeping tag {}: {}", tag, e);
                false
            }
        }
    }

    /// `tag` が `current` より厳密に古い場合のみ true
    pub fn is_older(tag: &str, current: &str) -> bool {
        match (Self::parse(tag), Self::parse(current)) {
            (Ok(t), Ok(c)) => t < c,
            (Err(e), _) | (_, Err(e)) => {
                tracing::debug!("Skipping version comparison for {}: {}", tag, e);
                false
            }
        }
    }

    pub fn retention(tag: &str, current: &str, known_tags: &[String]) -> RetentionDecision {
        let known = known_tags.iter().any(|t| t == tag);
        if !known || !Self::eligible_for_deletion(tag, current) {
            RetentionDecision::Keep
        } else {
            RetentionDecision::Delete
        }
    }

    /// レジストリから削除する候補タグ
    ///
    /// 現在のバージョンがまだ公開されていないコンテナは何も削除しない。
    pub fn sweep_candidates(known_tags: &[String], current: &str) -> Vec<String> {
        if !known_tags.iter().any(|t| Self::is_current(t, current)) {
            return Vec::new();
        }

        known_tags
            .iter()
            .filter(|t| Self::retention(t, current, known_tags) == RetentionDecision::Delete)
            .cloned()
            .collect()
    }
}
