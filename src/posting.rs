//! Canonical posting model shared by the whole pipeline.
//!
//! A `Posting` is immutable once the normalizer has produced it: the dedup
//! store, the matcher and the notification scheduler all pass it around by
//! value and never write to it.

use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Supported job boards. The registry resolves each variant to a concrete
/// fetcher at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Discord,
    Reddit,
    Monarch,
    Cribl,
    Gitlab,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Discord => "discord",
            Source::Reddit => "reddit",
            Source::Monarch => "monarch",
            Source::Cribl => "cribl",
            Source::Gitlab => "gitlab",
        }
    }

    pub fn all() -> [Source; 5] {
        [
            Source::Discord,
            Source::Reddit,
            Source::Monarch,
            Source::Cribl,
            Source::Gitlab,
        ]
    }
}

impl std::str::FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "discord" => Ok(Source::Discord),
            "reddit" => Ok(Source::Reddit),
            "monarch" => Ok(Source::Monarch),
            "cribl" => Ok(Source::Cribl),
            "gitlab" => Ok(Source::Gitlab),
            other => Err(format!("unknown source '{other}'")),
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Annual salary normalized into coarse buckets. Board data is too messy for
/// exact figures; buckets keep matching and the `min_salary` floor stable.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum SalaryBucket {
    #[serde(rename = "under-50k")]
    Under50k,
    #[serde(rename = "50k-75k")]
    From50k,
    #[serde(rename = "75k-100k")]
    From75k,
    #[serde(rename = "100k-125k")]
    From100k,
    #[serde(rename = "125k-150k")]
    From125k,
    #[serde(rename = "150k-200k")]
    From150k,
    #[serde(rename = "200k-plus")]
    Over200k,
}

impl SalaryBucket {
    /// Lower bound of the bucket in thousands of dollars per year.
    pub fn lower_bound_k(&self) -> u32 {
        match self {
            SalaryBucket::Under50k => 0,
            SalaryBucket::From50k => 50,
            SalaryBucket::From75k => 75,
            SalaryBucket::From100k => 100,
            SalaryBucket::From125k => 125,
            SalaryBucket::From150k => 150,
            SalaryBucket::Over200k => 200,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SalaryBucket::Under50k => "under-50k",
            SalaryBucket::From50k => "50k-75k",
            SalaryBucket::From75k => "75k-100k",
            SalaryBucket::From100k => "100k-125k",
            SalaryBucket::From125k => "125k-150k",
            SalaryBucket::From150k => "150k-200k",
            SalaryBucket::Over200k => "200k-plus",
        }
    }

    pub fn from_label(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "under-50k" => Some(SalaryBucket::Under50k),
            "50k-75k" => Some(SalaryBucket::From50k),
            "75k-100k" => Some(SalaryBucket::From75k),
            "100k-125k" => Some(SalaryBucket::From100k),
            "125k-150k" => Some(SalaryBucket::From125k),
            "150k-200k" => Some(SalaryBucket::From150k),
            "200k-plus" | "200k+" => Some(SalaryBucket::Over200k),
            _ => None,
        }
    }

    /// Bucket for an annual lower bound given in thousands.
    pub fn from_lower_k(k: u32) -> Self {
        match k {
            0..=49 => SalaryBucket::Under50k,
            50..=74 => SalaryBucket::From50k,
            75..=99 => SalaryBucket::From75k,
            100..=124 => SalaryBucket::From100k,
            125..=149 => SalaryBucket::From125k,
            150..=199 => SalaryBucket::From150k,
            _ => SalaryBucket::Over200k,
        }
    }

    /// Bucket for an annual lower bound in plain dollars (Lever-style numeric
    /// ranges).
    pub fn from_annual(dollars: u64) -> Self {
        Self::from_lower_k((dollars / 1_000) as u32)
    }

    /// Best-effort parse of free-text compensation ("$120,000 - $150,000",
    /// "110k–130k"). The smallest amount found is taken as the range's lower
    /// bound. Amounts under 20k are ignored as hourly/equity noise.
    pub fn parse_text(text: &str) -> Option<Self> {
        static RE_K: OnceCell<Regex> = OnceCell::new();
        static RE_DOLLARS: OnceCell<Regex> = OnceCell::new();
        let re_k = RE_K.get_or_init(|| {
            Regex::new(r"(?i)\$?\s*(\d{2,3}(?:\.\d+)?)\s*k\b").unwrap()
        });
        let re_dollars = RE_DOLLARS.get_or_init(|| {
            Regex::new(r"\$\s*(\d{1,3}(?:,\d{3})+|\d{5,})").unwrap()
        });

        let mut amounts_k: Vec<f64> = Vec::new();
        for cap in re_k.captures_iter(text) {
            if let Ok(v) = cap[1].parse::<f64>() {
                amounts_k.push(v);
            }
        }
        for cap in re_dollars.captures_iter(text) {
            let digits: String = cap[1].chars().filter(|c| c.is_ascii_digit()).collect();
            if let Ok(v) = digits.parse::<f64>() {
                amounts_k.push(v / 1_000.0);
            }
        }

        amounts_k.retain(|&v| v >= 20.0);
        let lower = amounts_k.into_iter().fold(f64::INFINITY, f64::min);
        if lower.is_finite() {
            Some(Self::from_lower_k(lower as u32))
        } else {
            None
        }
    }
}

impl std::fmt::Display for SalaryBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkArrangement {
    Remote,
    Hybrid,
    Onsite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExperienceLevel {
    Intern,
    Junior,
    Mid,
    Senior,
    Staff,
    Principal,
    Lead,
}

/// One job listing from one board, deduplicated by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    /// Stable dedup key: hex SHA-256 over source + board-native id (or the
    /// canonical URL when the board exposes none).
    pub id: String,
    pub source: Source,
    pub title: String,
    /// Free-text category keywords derived from the title, matched
    /// case-insensitively against subscriptions.
    #[serde(default)]
    pub categories: Vec<String>,
    pub location: String,
    pub company: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experience_level: Option<ExperienceLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salary: Option<SalaryBucket>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_arrangement: Option<WorkArrangement>,
    pub url: String,
    pub first_seen_at: DateTime<Utc>,
}
