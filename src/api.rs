//! Thin HTTP presentation adapter over the core: health, manual check,
//! on-demand postings dump with ad-hoc filters, and preference management.
//! The core never parses command text; every handler is a direct call onto
//! `Monitor`/`PrefsStore`.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveTime;
use serde::Deserialize;
use tower_http::cors::CorsLayer;

use crate::monitor::{CycleSummary, Monitor};
use crate::posting::{ExperienceLevel, Posting, SalaryBucket, Source, WorkArrangement};
use crate::preferences::{NotificationFrequency, Preferences};

#[derive(Clone)]
pub struct AppState {
    pub monitor: Arc<Monitor>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/check", post(check_now))
        .route("/api/postings", get(dump_postings))
        .route(
            "/api/preferences/{user_id}",
            get(get_preferences).post(patch_preferences),
        )
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

async fn check_now(
    State(state): State<AppState>,
) -> Result<Json<CycleSummary>, (StatusCode, String)> {
    state
        .monitor
        .check_now()
        .await
        .map(Json)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

/// `GET /api/postings?category=backend,frontend&location=Remote&company=gitlab`
/// Comma-separated values within a key; keys combine as the matcher's usual
/// conjunction.
async fn dump_postings(
    State(state): State<AppState>,
    Query(q): Query<HashMap<String, String>>,
) -> Json<HashMap<Source, Vec<Posting>>> {
    let filter = filter_from_query(&q);
    let dump = state.monitor.dump_postings(filter.as_ref()).await;
    Json(dump)
}

fn filter_from_query(q: &HashMap<String, String>) -> Option<Preferences> {
    let mut prefs = Preferences::new(0);
    let mut any = false;

    for v in split_values(q.get("category")) {
        prefs.add_category(v);
        any = true;
    }
    for v in split_values(q.get("location")) {
        prefs.add_location(v);
        any = true;
    }
    for v in split_values(q.get("company")) {
        prefs.add_company(v);
        any = true;
    }
    for v in split_values(q.get("salary")) {
        if let Some(bucket) = SalaryBucket::from_label(v) {
            prefs.add_salary_range(bucket);
            any = true;
        }
    }

    any.then_some(prefs)
}

fn split_values(raw: Option<&String>) -> impl Iterator<Item = &str> {
    raw.map(|s| s.as_str())
        .unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

async fn get_preferences(
    State(state): State<AppState>,
    Path(user_id): Path<u64>,
) -> Json<Preferences> {
    Json(state.monitor.prefs_store().get(user_id))
}

/// Batched preference mutations; the record is created on first use and the
/// full file is rewritten once per request.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PrefsPatch {
    pub add_categories: Vec<String>,
    pub remove_categories: Vec<String>,
    pub add_locations: Vec<String>,
    pub remove_locations: Vec<String>,
    pub add_companies: Vec<String>,
    pub remove_companies: Vec<String>,
    pub add_experience_levels: Vec<ExperienceLevel>,
    pub remove_experience_levels: Vec<ExperienceLevel>,
    pub add_salary_ranges: Vec<SalaryBucket>,
    pub remove_salary_ranges: Vec<SalaryBucket>,
    pub add_work_arrangements: Vec<WorkArrangement>,
    pub remove_work_arrangements: Vec<WorkArrangement>,
    pub add_priority_companies: Vec<String>,
    pub remove_priority_companies: Vec<String>,
    pub add_priority_categories: Vec<String>,
    pub remove_priority_categories: Vec<String>,
    pub min_salary: Option<u32>,
    pub clear_min_salary: bool,
    pub notification_frequency: Option<NotificationFrequency>,
    pub notification_time: Option<NaiveTime>,
    pub is_active: Option<bool>,
    pub clear_filters: bool,
}

impl PrefsPatch {
    pub fn apply(&self, p: &mut Preferences) {
        if self.clear_filters {
            p.clear_filters();
        }
        for v in &self.add_categories {
            p.add_category(v);
        }
        for v in &self.remove_categories {
            p.remove_category(v);
        }
        for v in &self.add_locations {
            p.add_location(v);
        }
        for v in &self.remove_locations {
            p.remove_location(v);
        }
        for v in &self.add_companies {
            p.add_company(v);
        }
        for v in &self.remove_companies {
            p.remove_company(v);
        }
        for v in &self.add_experience_levels {
            p.add_experience_level(*v);
        }
        for v in &self.remove_experience_levels {
            p.remove_experience_level(*v);
        }
        for v in &self.add_salary_ranges {
            p.add_salary_range(*v);
        }
        for v in &self.remove_salary_ranges {
            p.remove_salary_range(*v);
        }
        for v in &self.add_work_arrangements {
            p.add_work_arrangement(*v);
        }
        for v in &self.remove_work_arrangements {
            p.remove_work_arrangement(*v);
        }
        for v in &self.add_priority_companies {
            p.add_priority_company(v);
        }
        for v in &self.remove_priority_companies {
            p.remove_priority_company(v);
        }
        for v in &self.add_priority_categories {
            p.add_priority_category(v);
        }
        for v in &self.remove_priority_categories {
            p.remove_priority_category(v);
        }
        if self.clear_min_salary {
            p.set_min_salary(None);
        } else if let Some(floor) = self.min_salary {
            p.set_min_salary(Some(floor));
        }
        if let Some(freq) = self.notification_frequency {
            p.set_notification_frequency(freq);
        }
        if let Some(t) = self.notification_time {
            p.set_notification_time(Some(t));
        }
        if let Some(active) = self.is_active {
            p.is_active = active;
        }
    }
}

async fn patch_preferences(
    State(state): State<AppState>,
    Path(user_id): Path<u64>,
    Json(patch): Json<PrefsPatch>,
) -> Result<Json<Preferences>, (StatusCode, String)> {
    state
        .monitor
        .prefs_store()
        .update(user_id, |p| patch.apply(p))
        .map(Json)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}
