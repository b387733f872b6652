//! # Preference Matcher
//! Pure, testable logic that maps `(posting, preferences)` → match decision
//! and priority score. No I/O, suitable for unit tests and offline replay.
//!
//! Policy: conjunction across non-empty filter dimensions, disjunction within
//! a dimension. Text dimensions use case-insensitive substring containment;
//! salary bucket, experience level and work arrangement use exact equality.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::posting::Posting;
use crate::preferences::Preferences;

/// A posting paired with its priority score for one user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredPosting {
    pub posting: Posting,
    pub score: i32,
}

/// Additive priority weights. Tunable policy, not a correctness invariant —
/// kept at 1/1/1 so test expectations stay stable.
pub const W_PRIORITY_COMPANY: i32 = 1;
pub const W_PRIORITY_CATEGORY: i32 = 1;
pub const W_SALARY_FLOOR: i32 = 1;

/// True when the posting satisfies every non-empty dimension of the user's
/// filter. An empty dimension is vacuously satisfied.
pub fn matches(posting: &Posting, prefs: &Preferences) -> bool {
    if !prefs.categories.is_empty() && !category_hit(posting, &prefs.categories) {
        return false;
    }

    if !prefs.locations.is_empty() {
        let loc = posting.location.to_lowercase();
        if !prefs.locations.iter().any(|l| loc.contains(&l.to_lowercase())) {
            return false;
        }
    }

    if !prefs.companies.is_empty() {
        let company = posting.company.to_lowercase();
        if !prefs
            .companies
            .iter()
            .any(|c| company.contains(&c.to_lowercase()))
        {
            return false;
        }
    }

    if !prefs.experience_levels.is_empty() {
        match posting.experience_level {
            Some(level) if prefs.experience_levels.contains(&level) => {}
            _ => return false,
        }
    }

    if !prefs.salary_ranges.is_empty() {
        match posting.salary {
            Some(bucket) if prefs.salary_ranges.contains(&bucket) => {}
            _ => return false,
        }
    }

    if !prefs.work_arrangements.is_empty() {
        match posting.work_arrangement {
            Some(wa) if prefs.work_arrangements.contains(&wa) => {}
            _ => return false,
        }
    }

    // Explicit floor: a posting with unknown salary fails closed here.
    if let Some(floor_k) = prefs.min_salary {
        match posting.salary {
            Some(bucket) if bucket.lower_bound_k() >= floor_k => {}
            _ => return false,
        }
    }

    true
}

/// Additive score used only to order flush payloads; it never changes whether
/// or when a user is notified.
pub fn priority_score(posting: &Posting, prefs: &Preferences) -> i32 {
    let mut score = 0;

    if prefs
        .priority_companies
        .iter()
        .any(|c| c.eq_ignore_ascii_case(&posting.company))
    {
        score += W_PRIORITY_COMPANY;
    }

    if !prefs.priority_categories.is_empty() && category_hit(posting, &prefs.priority_categories) {
        score += W_PRIORITY_CATEGORY;
    }

    if let (Some(floor_k), Some(bucket)) = (prefs.min_salary, posting.salary) {
        if bucket.lower_bound_k() >= floor_k {
            score += W_SALARY_FLOOR;
        }
    }

    score
}

/// A category keyword hits when the title contains it, or when one of the
/// posting's derived category tags contains it.
fn category_hit(posting: &Posting, keywords: &BTreeSet<String>) -> bool {
    let title = posting.title.to_lowercase();
    keywords.iter().any(|kw| {
        let kw = kw.to_lowercase();
        title.contains(&kw)
            || posting
                .categories
                .iter()
                .any(|cat| cat.to_lowercase().contains(&kw))
    })
}

/// Order a flush payload: score descending, ties broken by `first_seen_at`
/// ascending (older postings first).
pub fn rank(batch: &mut [ScoredPosting]) {
    batch.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.posting.first_seen_at.cmp(&b.posting.first_seen_at))
    });
}
