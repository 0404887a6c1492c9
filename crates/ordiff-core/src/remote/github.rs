use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, ACCEPT, AUTHORIZATION, LINK};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;

use super::{Page, RemoteError, RemoteSource};
use crate::config::{GitHubConfig, DEFAULT_API_VERSION, DEFAULT_PER_PAGE, DEFAULT_USER_AGENT};
use crate::models::{Commit, FileChange, Release};

/// GitHub REST API client.
///
/// Releases come from `GET /repos/{owner}/{repo}/releases`; commits and
/// changed files from `GET /repos/{owner}/{repo}/compare/{base}...{head}`.
/// Pagination follows the `Link` response header.
pub struct GitHubClient {
    api_url: String,
    token: Option<String>,
    per_page: u32,
    client: Client,
}

impl GitHubClient {
    /// Creates an anonymous client against `api_url`.
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: None,
            per_page: DEFAULT_PER_PAGE,
            client: Client::builder()
                .user_agent(DEFAULT_USER_AGENT)
                .build()
                .unwrap_or_default(),
        }
    }

    /// Creates a client from [`GitHubConfig`].
    pub fn from_config(config: &GitHubConfig) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RemoteError::Config(e.to_string()))?;

        let client = Self {
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token: None,
            per_page: config.per_page,
            client,
        };
        Ok(client.with_token(config.token.clone().unwrap_or_default()))
    }

    /// Sets the access token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.token = if token.is_empty() { None } else { Some(token) };
        self
    }

    fn repo_url(&self, owner: &str, repo: &str) -> String {
        format!("{}/repos/{}/{}", self.api_url, owner, repo)
    }

    fn compare_url(&self, owner: &str, repo: &str, from_commit: &str, to_commit: &str) -> String {
        let repo_url = self.repo_url(owner, repo);
        format!("{repo_url}/compare/{from_commit}...{to_commit}")
    }

    /// Sends a GET and maps non-success statuses to [`RemoteError`].
    async fn get(
        &self,
        url: &str,
        query: &[(&str, u32)],
    ) -> Result<reqwest::Response, RemoteError> {
        let mut req = self
            .client
            .get(url)
            .header(ACCEPT, "application/vnd.github+json")
            .header("x-github-api-version", DEFAULT_API_VERSION)
            .query(query);

        if let Some(token) = &self.token {
            req = req.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        let response = req.send().await?;
        let status = response.status();

        if is_rate_limited(status, response.headers()) {
            return Err(RemoteError::RateLimited {
                reset_at: header_i64(response.headers(), "x-ratelimit-reset"),
            });
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(RemoteError::Api {
                status: status.as_u16(),
                message: api_message(&error_text),
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl RemoteSource for GitHubClient {
    async fn list_releases(
        &self,
        owner: &str,
        repo: &str,
        page: u32,
    ) -> Result<Page<Release>, RemoteError> {
        let url = format!("{}/releases", self.repo_url(owner, repo));
        let response = self.get(&url, &[("page", page), ("per_page", self.per_page)]).await?;
        let (next_page, last_page) = page_links(response.headers());

        let releases: Vec<ReleaseDto> = response.json().await?;
        let items = releases
            .into_iter()
            .map(|r| r.into_release(owner, repo))
            .collect();

        Ok(Page {
            items,
            next_page,
            last_page,
        })
    }

    async fn compare_range(
        &self,
        owner: &str,
        repo: &str,
        from_commit: &str,
        to_commit: &str,
        page: u32,
    ) -> Result<Page<Commit>, RemoteError> {
        let url = self.compare_url(owner, repo, from_commit, to_commit);
        let response = self.get(&url, &[("page", page), ("per_page", self.per_page)]).await?;
        let (next_page, last_page) = page_links(response.headers());

        let compare: CompareDto = response.json().await?;
        let items = compare
            .commits
            .into_iter()
            .map(|c| c.into_commit(owner, repo))
            .collect();

        Ok(Page {
            items,
            next_page,
            last_page,
        })
    }

    async fn diff_range(
        &self,
        owner: &str,
        repo: &str,
        from_commit: &str,
        to_commit: &str,
    ) -> Result<Vec<FileChange>, RemoteError> {
        let url = self.compare_url(owner, repo, from_commit, to_commit);
        let compare: CompareDto = self.get(&url, &[]).await?.json().await?;

        Ok(compare
            .files
            .unwrap_or_default()
            .into_iter()
            .map(|f| f.into_file_change(owner, repo))
            .collect())
    }
}

/// GitHub answers an exhausted quota with 403 or 429 and `x-ratelimit-remaining: 0`.
fn is_rate_limited(status: StatusCode, headers: &HeaderMap) -> bool {
    match status {
        StatusCode::TOO_MANY_REQUESTS => true,
        StatusCode::FORBIDDEN => header_i64(headers, "x-ratelimit-remaining") == Some(0),
        _ => false,
    }
}

fn header_i64(headers: &HeaderMap, name: &str) -> Option<i64> {
    headers.get(name)?.to_str().ok()?.trim().parse().ok()
}

/// Pulls the `message` field out of a GitHub error body, falling back to the raw text.
fn api_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ApiErrorBody {
        message: String,
    }

    serde_json::from_str::<ApiErrorBody>(body)
        .map(|b| b.message)
        .unwrap_or_else(|_| body.to_string())
}

/// Reads `(next, last)` page numbers from the `Link` header.
fn page_links(headers: &HeaderMap) -> (Option<u32>, Option<u32>) {
    headers
        .get(LINK)
        .and_then(|v| v.to_str().ok())
        .map(parse_link_header)
        .unwrap_or((None, None))
}

/// Parses `<url?page=2>; rel="next", <url?page=5>; rel="last"`.
fn parse_link_header(value: &str) -> (Option<u32>, Option<u32>) {
    let mut next = None;
    let mut last = None;

    for link in value.split(',') {
        let mut parts = link.split(';');
        let Some(target) = parts.next() else { continue };
        let target = target.trim().trim_start_matches('<').trim_end_matches('>');

        let page = Url::parse(target).ok().and_then(|url| {
            url.query_pairs()
                .find(|(k, _)| k == "page")
                .and_then(|(_, v)| v.parse::<u32>().ok())
        });

        for param in parts {
            match param.trim() {
                r#"rel="next""# => next = page,
                r#"rel="last""# => last = page,
                _ => {}
            }
        }
    }

    (next, last)
}

#[derive(Debug, Deserialize)]
struct ReleaseDto {
    tag_name: String,
    name: Option<String>,
    published_at: Option<DateTime<Utc>>,
    created_at: Option<DateTime<Utc>>,
    target_commitish: Option<String>,
    body: Option<String>,
}

impl ReleaseDto {
    fn into_release(self, owner: &str, repo: &str) -> Release {
        // Drafts have no publish time; order them by creation instead.
        let published_at = self
            .published_at
            .or(self.created_at)
            .unwrap_or_default();

        Release::new(owner, repo, self.tag_name, published_at)
            .with_name(self.name.unwrap_or_default())
            .with_commit(self.target_commitish.unwrap_or_default())
            .with_body(self.body.unwrap_or_default())
    }
}

#[derive(Debug, Deserialize)]
struct CompareDto {
    #[serde(default)]
    commits: Vec<CommitDto>,
    files: Option<Vec<FileDto>>,
}

#[derive(Debug, Deserialize)]
struct CommitDto {
    sha: String,
    html_url: Option<String>,
    commit: GitCommitDto,
}

#[derive(Debug, Deserialize)]
struct GitCommitDto {
    message: String,
    author: Option<GitAuthorDto>,
}

#[derive(Debug, Deserialize)]
struct GitAuthorDto {
    name: Option<String>,
    email: Option<String>,
    date: Option<DateTime<Utc>>,
}

impl CommitDto {
    fn into_commit(self, owner: &str, repo: &str) -> Commit {
        let (name, email, date) = match self.commit.author {
            Some(a) => (
                a.name.unwrap_or_default(),
                a.email.unwrap_or_default(),
                a.date.unwrap_or_default(),
            ),
            None => (String::new(), String::new(), DateTime::<Utc>::default()),
        };

        Commit::new(owner, repo, self.sha, self.commit.message, date)
            .with_author(name, email)
            .with_url(self.html_url.unwrap_or_default())
    }
}

#[derive(Debug, Deserialize)]
struct FileDto {
    filename: String,
    #[serde(default)]
    additions: u32,
    #[serde(default)]
    deletions: u32,
    #[serde(default)]
    changes: u32,
    status: String,
    patch: Option<String>,
}

impl FileDto {
    fn into_file_change(self, owner: &str, repo: &str) -> FileChange {
        let mut change = FileChange::new(owner, repo, self.filename, self.status)
            .with_lines(self.additions, self.deletions, self.changes);
        change.patch = self.patch;
        change
    }
}
