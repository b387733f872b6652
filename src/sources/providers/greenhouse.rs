// src/sources/providers/greenhouse.rs
//! Fetcher for Greenhouse job boards
//! (`https://boards-api.greenhouse.io/v1/boards/<board>/jobs`).
//! Discord, Reddit, Cribl and GitLab all publish through Greenhouse.

use serde::Deserialize;

use crate::posting::Source;
use crate::sources::types::{FetchError, RawJob, SourceFetcher};

#[derive(Debug, Deserialize)]
struct BoardResponse {
    #[serde(default)]
    jobs: Vec<BoardJob>,
}

#[derive(Debug, Deserialize)]
struct BoardJob {
    id: Option<u64>,
    title: String,
    absolute_url: String,
    location: Option<BoardLocation>,
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BoardLocation {
    name: String,
}

pub struct GreenhouseFetcher {
    source: Source,
    board: String,
    mode: Mode,
}

enum Mode {
    // Own copy of the fixture body so tests don't need 'static data.
    Fixture(String),
    Http { client: reqwest::Client },
}

impl GreenhouseFetcher {
    pub fn from_fixture(source: Source, board: impl Into<String>, body: &str) -> Self {
        Self {
            source,
            board: board.into(),
            mode: Mode::Fixture(body.to_string()),
        }
    }

    pub fn from_board(source: Source, board: impl Into<String>) -> Self {
        Self {
            source,
            board: board.into(),
            mode: Mode::Http {
                client: reqwest::Client::new(),
            },
        }
    }

    fn board_url(&self) -> String {
        format!(
            "https://boards-api.greenhouse.io/v1/boards/{}/jobs?content=true",
            self.board
        )
    }

    fn parse_body(&self, body: &str) -> Result<Vec<RawJob>, FetchError> {
        let resp: BoardResponse = serde_json::from_str(body)?;

        let mut out = Vec::with_capacity(resp.jobs.len());
        for job in resp.jobs {
            out.push(RawJob {
                source: self.source,
                external_id: job.id.map(|id| id.to_string()),
                title: job.title,
                url: job.absolute_url,
                location: job.location.map(|l| l.name).unwrap_or_default(),
                company: self.board.clone(),
                salary_text: None,
                description: job.content,
                salary_floor: None,
                arrangement_hint: None,
            });
        }
        metrics::counter!("fetch_records_total", "source" => self.source.as_str())
            .increment(out.len() as u64);
        Ok(out)
    }
}

#[async_trait::async_trait]
impl SourceFetcher for GreenhouseFetcher {
    async fn fetch(&self) -> Result<Vec<RawJob>, FetchError> {
        match &self.mode {
            Mode::Fixture(body) => self.parse_body(body),
            Mode::Http { client } => {
                let resp = client.get(self.board_url()).send().await?;
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
