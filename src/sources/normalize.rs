// src/sources/normalize.rs
//! Raw board records → canonical `Posting`s.
//!
//! Determinism of `posting_id` is the correctness foundation of dedup: the
//! same underlying posting must hash to the same id on every cycle.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::posting::{ExperienceLevel, Posting, SalaryBucket, Source, WorkArrangement};
use crate::sources::types::RawJob;

/// Normalize text: HTML entity decode, strip tags, collapse whitespace, trim.
pub fn normalize_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    static RE_WS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();
    out.trim().to_string()
}

/// Stable dedup key: source + board-native id, or the canonical URL when the
/// board exposes no id.
pub fn posting_id(source: Source, external_id: Option<&str>, url: &str) -> String {
    let native = match external_id {
        Some(id) if !id.is_empty() => id,
        _ => url,
    };
    let mut hasher = Sha256::new();
    hasher.update(source.as_str().as_bytes());
    hasher.update(b"|");
    hasher.update(native.as_bytes());
    hex::encode(hasher.finalize())
}

/// Category keywords recognized in titles (ported from the bot's original
/// keyword map).
const CATEGORY_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "software engineer",
        &["software engineer", "software developer", "developer"],
    ),
    (
        "frontend",
        &["frontend", "front end", "front-end", "ui", "react", "vue", "angular"],
    ),
    ("backend", &["backend", "back end", "back-end", "api", "server"]),
    ("full stack", &["full stack", "fullstack", "full-stack"]),
    ("devops", &["devops", "sre", "site reliability", "infrastructure"]),
    (
        "data",
        &["data scientist", "data engineer", "analyst", "ml", "machine learning"],
    ),
    ("product", &["product manager", "product owner"]),
    ("design", &["designer", "ux", "ui/ux", "visual designer"]),
    ("marketing", &["marketing", "growth", "seo", "content"]),
    ("security", &["security", "appsec", "devsecops"]),
    ("qa", &["qa", "quality assurance", "test engineer", "testing"]),
];

pub fn categories_from_title(title: &str) -> Vec<String> {
    let t = title.to_lowercase();
    CATEGORY_KEYWORDS
        .iter()
        .filter(|(_, kws)| kws.iter().any(|kw| t.contains(kw)))
        .map(|(cat, _)| (*cat).to_string())
        .collect()
}

pub fn detect_experience(title: &str) -> Option<ExperienceLevel> {
    let t = title.to_lowercase();
    // Most specific first: "senior staff" is staff-level, not senior.
    if t.contains("intern") {
        Some(ExperienceLevel::Intern)
    } else if t.contains("principal") {
        Some(ExperienceLevel::Principal)
    } else if t.contains("staff") {
        Some(ExperienceLevel::Staff)
    } else if t.contains("lead ") || t.ends_with("lead") || t.contains("tech lead") {
        Some(ExperienceLevel::Lead)
    } else if t.contains("senior") || t.contains("sr.") || t.contains("sr ") {
        Some(ExperienceLevel::Senior)
    } else if t.contains("junior") || t.contains("jr.") || t.contains("jr ") || t.contains("entry level")
    {
        Some(ExperienceLevel::Junior)
    } else if t.contains("mid-level") || t.contains("mid level") || t.contains("intermediate") {
        Some(ExperienceLevel::Mid)
    } else {
        None
    }
}

pub fn detect_arrangement(title: &str, location: &str) -> Option<WorkArrangement> {
    let hay = format!("{} {}", title.to_lowercase(), location.to_lowercase());
    if hay.contains("hybrid") {
        Some(WorkArrangement::Hybrid)
    } else if hay.contains("remote") {
        Some(WorkArrangement::Remote)
    } else if hay.contains("on-site") || hay.contains("onsite") || hay.contains("in office") {
        Some(WorkArrangement::Onsite)
    } else {
        None
    }
}

/// Map a raw record to a `Posting`. Fails closed: a record missing a usable
/// title, URL or location yields `None` and a logged warning, never an error
/// that aborts the cycle.
pub fn normalize(raw: RawJob, now: DateTime<Utc>) -> Option<Posting> {
    let title = normalize_text(&raw.title);
    let location = normalize_text(&raw.location);
    let url = raw.url.trim().to_string();

    if title.is_empty() || url.is_empty() || location.is_empty() {
        tracing::warn!(
            source = raw.source.as_str(),
            title = %raw.title,
            url = %raw.url,
            "dropping record with missing required fields"
        );
        return None;
    }

    let salary = raw
        .salary_floor
        .map(SalaryBucket::from_annual)
        .or_else(|| raw.salary_text.as_deref().and_then(SalaryBucket::parse_text))
        .or_else(|| raw.description.as_deref().and_then(SalaryBucket::parse_text));

    let work_arrangement = raw
        .arrangement_hint
        .or_else(|| detect_arrangement(&title, &location));

    Some(Posting {
        id: posting_id(raw.source, raw.external_id.as_deref(), &url),
        source: raw.source,
        categories: categories_from_title(&title),
        experience_level: detect_experience(&title),
        salary,
        work_arrangement,
        location,
        company: raw.company,
        url,
        title,
        first_seen_at: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mk_raw(title: &str, url: &str, location: &str) -> RawJob {
        RawJob {
            source: Source::Gitlab,
            external_id: Some("4010".to_string()),
            title: title.to_string(),
            url: url.to_string(),
            location: location.to_string(),
            company: "gitlab".to_string(),
            description: None,
            salary_text: None,
            salary_floor: None,
            arrangement_hint: None,
        }
    }

    #[test]
    fn id_is_deterministic_across_cycles() {
        let a = posting_id(Source::Gitlab, Some("4010"), "https://x.test/a");
        let b = posting_id(Source::Gitlab, Some("4010"), "https://x.test/a");
        assert_eq!(a, b);
    }

    #[test]
    fn id_separates_sources_and_native_ids() {
        let a = posting_id(Source::Gitlab, Some("4010"), "https://x.test/a");
        let b = posting_id(Source::Cribl, Some("4010"), "https://x.test/a");
        let c = posting_id(Source::Gitlab, Some("4011"), "https://x.test/a");
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn id_falls_back_to_url_without_native_id() {
        let a = posting_id(Source::Gitlab, None, "https://x.test/a");
        let b = posting_id(Source::Gitlab, Some(""), "https://x.test/a");
        assert_eq!(a, b);
    }

    #[test]
    fn normalize_strips_html_and_collapses_whitespace() {
        let raw = mk_raw(
            "Senior&nbsp;Backend   Engineer",
            " https://x.test/a ",
            "<p>Remote - Americas</p>",
        );
        let p = normalize(raw, Utc::now()).unwrap();
        assert_eq!(p.title, "Senior Backend Engineer");
        assert_eq!(p.location, "Remote - Americas");
        assert_eq!(p.url, "https://x.test/a");
    }

    #[test]
    fn normalize_drops_record_without_title() {
        let raw = mk_raw("  ", "https://x.test/a", "Remote");
        assert!(normalize(raw, Utc::now()).is_none());
    }

    #[test]
    fn derived_fields_come_from_title_and_location() {
        let raw = mk_raw("Senior Backend Engineer", "https://x.test/a", "Remote, US");
        let p = normalize(raw, Utc::now()).unwrap();
        assert!(p.categories.contains(&"backend".to_string()));
        assert_eq!(p.experience_level, Some(ExperienceLevel::Senior));
        assert_eq!(p.work_arrangement, Some(WorkArrangement::Remote));
    }

    #[test]
    fn numeric_floor_wins_over_text() {
        let mut raw = mk_raw("Backend Engineer", "https://x.test/a", "Remote");
        raw.salary_floor = Some(130_000);
        raw.salary_text = Some("$90k".to_string());
        let p = normalize(raw, Utc::now()).unwrap();
        assert_eq!(p.salary, Some(SalaryBucket::From125k));
    }

    #[test]
    fn salary_parsed_from_description_as_last_resort() {
        let mut raw = mk_raw("Backend Engineer", "https://x.test/a", "Remote");
        raw.description = Some("Comp range: $100,000 to $125,000".to_string());
        let p = normalize(raw, Utc::now()).unwrap();
        assert_eq!(p.salary, Some(SalaryBucket::From100k));
    }
}
