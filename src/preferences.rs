//! Per-user filter and notification configuration.
//!
//! Invariant: an empty set on any dimension means "match all" for that
//! dimension — a brand-new user with no preferences sees everything.
//! Mutation helpers are case-insensitively idempotent: adding "Backend"
//! twice, or "backend" after "Backend", stores one entry.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::posting::{ExperienceLevel, SalaryBucket, WorkArrangement};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationFrequency {
    Immediate,
    Hourly,
    Daily,
    Weekly,
    Digest,
}

impl Default for NotificationFrequency {
    fn default() -> Self {
        NotificationFrequency::Immediate
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    pub user_id: u64,
    #[serde(default)]
    pub categories: BTreeSet<String>,
    #[serde(default)]
    pub locations: BTreeSet<String>,
    #[serde(default)]
    pub companies: BTreeSet<String>,
    #[serde(default)]
    pub experience_levels: BTreeSet<ExperienceLevel>,
    #[serde(default)]
    pub salary_ranges: BTreeSet<SalaryBucket>,
    #[serde(default)]
    pub work_arrangements: BTreeSet<WorkArrangement>,
    #[serde(default)]
    pub priority_companies: BTreeSet<String>,
    #[serde(default)]
    pub priority_categories: BTreeSet<String>,
    /// Salary floor in thousands of dollars per year. A posting with no
    /// salary data never satisfies a configured floor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_salary: Option<u32>,
    #[serde(default)]
    pub notification_frequency: NotificationFrequency,
    /// Time-of-day (UTC) for daily/weekly flushes; 09:00 when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_time: Option<NaiveTime>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

impl Preferences {
    pub fn new(user_id: u64) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            categories: BTreeSet::new(),
            locations: BTreeSet::new(),
            companies: BTreeSet::new(),
            experience_levels: BTreeSet::new(),
            salary_ranges: BTreeSet::new(),
            work_arrangements: BTreeSet::new(),
            priority_companies: BTreeSet::new(),
            priority_categories: BTreeSet::new(),
            min_salary: None,
            notification_frequency: NotificationFrequency::default(),
            notification_time: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn add_category(&mut self, category: &str) {
        insert_ci(&mut self.categories, category);
        self.touch();
    }

    pub fn remove_category(&mut self, category: &str) {
        remove_ci(&mut self.categories, category);
        self.touch();
    }

    pub fn add_location(&mut self, location: &str) {
        insert_ci(&mut self.locations, location);
        self.touch();
    }

    pub fn remove_location(&mut self, location: &str) {
        remove_ci(&mut self.locations, location);
        self.touch();
    }

    pub fn add_company(&mut self, company: &str) {
        insert_ci(&mut self.companies, company);
        self.touch();
    }

    pub fn remove_company(&mut self, company: &str) {
        remove_ci(&mut self.companies, company);
        self.touch();
    }

    pub fn add_experience_level(&mut self, level: ExperienceLevel) {
        self.experience_levels.insert(level);
        self.touch();
    }

    pub fn remove_experience_level(&mut self, level: ExperienceLevel) {
        self.experience_levels.remove(&level);
        self.touch();
    }

    pub fn add_salary_range(&mut self, bucket: SalaryBucket) {
        self.salary_ranges.insert(bucket);
        self.touch();
    }

    pub fn remove_salary_range(&mut self, bucket: SalaryBucket) {
        self.salary_ranges.remove(&bucket);
        self.touch();
    }

    pub fn add_work_arrangement(&mut self, wa: WorkArrangement) {
        self.work_arrangements.insert(wa);
        self.touch();
    }

    pub fn remove_work_arrangement(&mut self, wa: WorkArrangement) {
        self.work_arrangements.remove(&wa);
        self.touch();
    }

    pub fn add_priority_company(&mut self, company: &str) {
        insert_ci(&mut self.priority_companies, company);
        self.touch();
    }

    pub fn remove_priority_company(&mut self, company: &str) {
        remove_ci(&mut self.priority_companies, company);
        self.touch();
    }

    pub fn add_priority_category(&mut self, category: &str) {
        insert_ci(&mut self.priority_categories, category);
        self.touch();
    }

    pub fn remove_priority_category(&mut self, category: &str) {
        remove_ci(&mut self.priority_categories, category);
        self.touch();
    }

    pub fn set_min_salary(&mut self, floor_k: Option<u32>) {
        self.min_salary = floor_k;
        self.touch();
    }

    pub fn set_notification_frequency(&mut self, freq: NotificationFrequency) {
        self.notification_frequency = freq;
        self.touch();
    }

    pub fn set_notification_time(&mut self, time: Option<NaiveTime>) {
        self.notification_time = time;
        self.touch();
    }

    /// Reset every filter dimension; frequency/time survive.
    pub fn clear_filters(&mut self) {
        self.categories.clear();
        self.locations.clear();
        self.companies.clear();
        self.experience_levels.clear();
        self.salary_ranges.clear();
        self.work_arrangements.clear();
        self.priority_companies.clear();
        self.priority_categories.clear();
        self.min_salary = None;
        self.touch();
    }

    /// True when no filter dimension is configured at all.
    pub fn is_unfiltered(&self) -> bool {
        self.categories.is_empty()
            && self.locations.is_empty()
            && self.companies.is_empty()
            && self.experience_levels.is_empty()
            && self.salary_ranges.is_empty()
            && self.work_arrangements.is_empty()
            && self.min_salary.is_none()
    }
}

fn insert_ci(set: &mut BTreeSet<String>, value: &str) {
    let v = value.trim();
    if v.is_empty() {
        return;
    }
    if !set.iter().any(|s| s.eq_ignore_ascii_case(v)) {
        set.insert(v.to_string());
    }
}

fn remove_ci(set: &mut BTreeSet<String>, value: &str) {
    let v = value.trim();
    set.retain(|s| !s.eq_ignore_ascii_case(v));
}
