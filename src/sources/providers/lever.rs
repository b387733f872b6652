// src/sources/providers/lever.rs
//! Fetcher for Lever postings (`https://api.lever.co/v0/postings/<site>`).
//! Monarch publishes through Lever; unlike Greenhouse it exposes a numeric
//! salary range and an explicit workplace type.

use serde::Deserialize;

use crate::posting::{Source, WorkArrangement};
use crate::sources::types::{FetchError, RawJob, SourceFetcher};

#[derive(Debug, Deserialize)]
struct LeverPosting {
    id: Option<String>,
    /// Lever calls the job title `text`.
    text: String,
    #[serde(rename = "hostedUrl")]
    hosted_url: String,
    #[serde(default)]
    categories: LeverCategories,
    #[serde(rename = "salaryRange")]
    salary_range: Option<LeverSalaryRange>,
    #[serde(rename = "workplaceType")]
    workplace_type: Option<String>,
    #[serde(rename = "descriptionPlain")]
    description_plain: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LeverCategories {
    location: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LeverSalaryRange {
    min: Option<u64>,
}

fn arrangement_from_workplace_type(wt: &str) -> Option<WorkArrangement> {
    match wt.to_ascii_lowercase().as_str() {
        "remote" => Some(WorkArrangement::Remote),
        "hybrid" => Some(WorkArrangement::Hybrid),
        "onsite" | "on-site" => Some(WorkArrangement::Onsite),
        _ => None,
    }
}

pub struct LeverFetcher {
    source: Source,
    site: String,
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { client: reqwest::Client },
}

impl LeverFetcher {
    pub fn from_fixture(source: Source, site: impl Into<String>, body: &str) -> Self {
        Self {
            source,
            site: site.into(),
            mode: Mode::Fixture(body.to_string()),
        }
    }

    pub fn from_site(source: Source, site: impl Into<String>) -> Self {
        Self {
            source,
            site: site.into(),
            mode: Mode::Http {
                client: reqwest::Client::new(),
            },
        }
    }

    fn postings_url(&self) -> String {
        format!("https://api.lever.co/v0/postings/{}?mode=json", self.site)
    }

    fn parse_body(&self, body: &str) -> Result<Vec<RawJob>, FetchError> {
        let postings: Vec<LeverPosting> = serde_json::from_str(body)?;

        let mut out = Vec::with_capacity(postings.len());
        for p in postings {
            out.push(RawJob {
                source: self.source,
                external_id: p.id,
                title: p.text,
                url: p.hosted_url,
                location: p.categories.location.unwrap_or_default(),
                company: self.site.clone(),
                description: p.description_plain,
                salary_text: None,
                salary_floor: p.salary_range.and_then(|r| r.min),
                arrangement_hint: p
                    .workplace_type
                    .as_deref()
                    .and_then(arrangement_from_workplace_type),
            });
        }
        metrics::counter!("fetch_records_total", "source" => self.source.as_str())
            .increment(out.len() as u64);
        Ok(out)
    }
}

#[async_trait::async_trait]
impl SourceFetcher for LeverFetcher {
    async fn fetch(&self) -> Result<Vec<RawJob>, FetchError> {
        match &self.mode {
            Mode::Fixture(body) => self.parse_body(body),
            Mode::Http { client } => {
                let resp = client.get(self.postings_url()).send().await?;
                if !resp.status().is_success() {
                    return Err(FetchError::Status(resp.status()));
                }
                let body = resp.text().await?;
                self.parse_body(&body)
            }
        }
    }

    fn source(&self) -> Source {
        self.source
    }
}
