//! Social media search tool and its Reddit client
//!
//! The tool searches a fixed list of communities and returns comment bodies. Within a
//! community every matching submission has its comments loaded, but only the last
//! submission iterated contributes text; the per-community texts are then joined with
//! blank lines. Communities that produce no text are left out, so a search that finds
//! nothing anywhere yields the empty string.

use crate::tool::query_schema;
use crate::{Result, Tool, ToolError};
use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use std::fmt;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// Communities searched when none are configured
pub const DEFAULT_COMMUNITIES: [&str; 3] = ["StockMarket", "investing", "wallstreetbets"];

const REDDIT_AUTH_URL: &str = "https://www.reddit.com/api/v1/access_token";
const REDDIT_API_BASE: &str = "https://oauth.reddit.com";
const USER_AGENT: &str = concat!(
    "ticker-pulse/",
    env!("CARGO_PKG_VERSION"),
    " (comment extraction)"
);
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Recency window understood by the forum search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeFilter {
    /// Past 24 hours
    Day,
    /// Past week
    Week,
    /// Past month
    Month,
    /// Past year
    Year,
    /// No limit
    All,
}

impl TimeFilter {
    /// Smallest filter that covers a window of `days`
    pub fn for_days(days: u32) -> Self {
        match days {
            0..=1 => Self::Day,
            2..=7 => Self::Week,
            8..=31 => Self::Month,
            32..=365 => Self::Year,
            _ => Self::All,
        }
    }

    /// Query-string value
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
            Self::All => "all",
        }
    }
}

impl fmt::Display for TimeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A forum submission matched by a search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    /// Submission id without the type prefix
    pub id: String,
    /// Title
    #[serde(default)]
    pub title: String,
    /// Community the submission belongs to
    #[serde(default)]
    pub subreddit: String,
    /// Relative link
    #[serde(default)]
    pub permalink: String,
}

/// Forum search backend
#[async_trait]
pub trait ForumClient: Send + Sync {
    /// Search a community, most relevant first
    async fn search_submissions(
        &self,
        community: &str,
        query: &str,
        limit: u32,
        time_filter: TimeFilter,
    ) -> Result<Vec<Submission>>;

    /// Top-sorted comment bodies of a submission, comment trees flattened breadth-first
    async fn top_comments(
        &self,
        submission: &Submission,
        comment_limit: u32,
    ) -> Result<Vec<String>>;
}

#[derive(Debug)]
struct AccessToken {
    value: String,
    expires_at: Instant,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_token_lifetime")]
    expires_in: u64,
}

fn default_token_lifetime() -> u64 {
    3600
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Thing>,
}

#[derive(Debug, Deserialize)]
struct Thing {
    kind: String,
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Deserialize)]
struct CommentData {
    #[serde(default)]
    body: String,
    #[serde(default)]
    replies: Value,
}

/// Flatten a comment forest breadth-first, dropping "load more" stubs
fn flatten_comments(children: Vec<Thing>) -> Vec<String> {
    let mut queue: VecDeque<Thing> = children.into();
    let mut bodies = Vec::new();

    while let Some(thing) = queue.pop_front() {
        if thing.kind != "t1" {
            continue;
        }
        let Ok(comment) = serde_json::from_value::<CommentData>(thing.data) else {
            continue;
        };
        // replies is "" for leaf comments
        if let Ok(replies) = serde_json::from_value::<Listing>(comment.replies) {
            queue.extend(replies.data.children);
        }
        bodies.push(comment.body);
    }

    bodies
}

/// Read-only Reddit API client using app-only OAuth
pub struct RedditClient {
    client: Client,
    client_id: String,
    client_secret: String,
    token: Mutex<Option<AccessToken>>,
    rate_limiter: SharedRateLimiter,
    auth_url: String,
    api_base: String,
}

impl RedditClient {
    /// Create a client
    ///
    /// # Arguments
    /// * `client_id` / `client_secret` - script app credentials
    /// * `timeout` - per-request timeout
    /// * `requests_per_minute` - pacing quota (Reddit allows 100 for OAuth clients)
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        timeout: Duration,
        requests_per_minute: u32,
    ) -> Result<Self> {
        let client_id = client_id.into();
        let client_secret = client_secret.into();
        if client_id.trim().is_empty() || client_secret.trim().is_empty() {
            return Err(ToolError::Config(
                "Reddit client id and secret are required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        let quota =
            Quota::per_minute(NonZeroU32::new(requests_per_minute).unwrap_or(NonZeroU32::MIN));

        Ok(Self {
            client,
            client_id,
            client_secret,
            token: Mutex::new(None),
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
            auth_url: REDDIT_AUTH_URL.to_string(),
            api_base: REDDIT_API_BASE.to_string(),
        })
    }

    /// Current bearer token, fetched again shortly before it expires
    async fn access_token(&self) -> Result<String> {
        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_ref() {
            if token.expires_at > Instant::now() + TOKEN_REFRESH_MARGIN {
                return Ok(token.value.clone());
            }
        }

        debug!("Requesting Reddit access token");
        let response = self
            .client
            .post(&self.auth_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ToolError::AuthenticationFailed(format!(
                "Reddit token request failed with {status}: {body}"
            )));
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            ToolError::AuthenticationFailed(format!("Failed to parse Reddit token: {e}"))
        })?;
        let value = token.access_token.clone();
        *guard = Some(AccessToken {
            value: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        });

        Ok(value)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        self.rate_limiter.until_ready().await;
        let token = self.access_token().await?;

        let response = self
            .client
            .get(format!("{}{path}", self.api_base))
            .bearer_auth(token)
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 | 403 => ToolError::AuthenticationFailed(format!("Reddit {path}: {body}")),
                429 => ToolError::RateLimited(format!("Reddit {path}: {body}")),
                _ => ToolError::Unavailable(format!("Reddit HTTP {status} for {path}: {body}")),
            });
        }

        response
            .json()
            .await
            .map_err(|e| ToolError::Unavailable(format!("Failed to parse Reddit response: {e}")))
    }
}

#[async_trait]
impl ForumClient for RedditClient {
    #[instrument(skip(self), fields(provider = "reddit"))]
    async fn search_submissions(
        &self,
        community: &str,
        query: &str,
        limit: u32,
        time_filter: TimeFilter,
    ) -> Result<Vec<Submission>> {
        let listing: Listing = self
            .get_json(
                &format!("/r/{community}/search"),
                &[
                    ("q", query.to_string()),
                    ("restrict_sr", "1".to_string()),
                    ("sort", "relevance".to_string()),
                    ("t", time_filter.to_string()),
                    ("limit", limit.to_string()),
                    ("raw_json", "1".to_string()),
                ],
            )
            .await?;

        Ok(listing
            .data
            .children
            .into_iter()
            .filter(|thing| thing.kind == "t3")
            .filter_map(|thing| serde_json::from_value(thing.data).ok())
            .collect())
    }

    #[instrument(skip(self, submission), fields(provider = "reddit", submission = %submission.id))]
    async fn top_comments(
        &self,
        submission: &Submission,
        comment_limit: u32,
    ) -> Result<Vec<String>> {
        // [submission listing, comment listing]
        let listings: Vec<Listing> = self
            .get_json(
                &format!("/comments/{}", submission.id),
                &[
                    ("sort", "top".to_string()),
                    ("limit", comment_limit.to_string()),
                    ("raw_json", "1".to_string()),
                ],
            )
            .await?;

        Ok(listings
            .into_iter()
            .nth(1)
            .map(|comments| flatten_comments(comments.data.children))
            .unwrap_or_default())
    }
}

/// Social media search tool (`reddit_tool`)
pub struct SocialSearchTool {
    client: Arc<dyn ForumClient>,
    communities: Vec<String>,
    time_filter: TimeFilter,
    search_limit: u32,
    comment_limit: u32,
}

impl SocialSearchTool {
    /// Tool name as the model sees it
    pub const NAME: &'static str = "reddit_tool";

    /// Create the tool over a forum client
    pub fn new(
        client: Arc<dyn ForumClient>,
        communities: Vec<String>,
        window_days: u32,
        search_limit: u32,
        comment_limit: u32,
    ) -> Self {
        Self {
            client,
            communities,
            time_filter: TimeFilter::for_days(window_days),
            search_limit,
            comment_limit,
        }
    }

    /// Comments of the last submission found in `community`, if any
    async fn community_text(&self, community: &str, query: &str) -> Result<Option<String>> {
        let submissions = self
            .client
            .search_submissions(community, query, self.search_limit, self.time_filter)
            .await?;
        debug!(community, submissions = submissions.len(), "Community searched");

        // Every submission is expanded; only the last one is kept.
        let mut last = None;
        for submission in &submissions {
            last = Some(
                self.client
                    .top_comments(submission, self.comment_limit)
                    .await?,
            );
        }

        Ok(last
            .map(|comments| comments.join("\n\n"))
            .filter(|text| !text.is_empty()))
    }
}

#[async_trait]
impl Tool for SocialSearchTool {
    #[instrument(skip(self), fields(tool_name = "reddit_tool"))]
    async fn invoke(&self, query: &str) -> Result<String> {
        let mut sections = Vec::new();
        for community in &self.communities {
            if let Some(text) = self.community_text(community, query).await? {
                sections.push(text);
            }
        }

        info!(communities_with_text = sections.len(), "Social search returned");
        Ok(sections.join("\n\n"))
    }

    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Use this tool to query messages from social media."
    }

    fn input_schema(&self) -> Value {
        query_schema("The social media search query, exactly as given")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;

    fn submission(id: &str, community: &str) -> Submission {
        Submission {
            id: id.to_string(),
            title: format!("post {id}"),
            subreddit: community.to_string(),
            permalink: format!("/r/{community}/comments/{id}/"),
        }
    }

    /// In-memory forum keyed by community and submission id
    #[derive(Default)]
    struct FakeForum {
        submissions: HashMap<String, Vec<Submission>>,
        comments: HashMap<String, Vec<String>>,
        expanded: StdMutex<Vec<String>>,
        searches: StdMutex<Vec<(String, String, u32, TimeFilter)>>,
    }

    impl FakeForum {
        fn with_submission(mut self, community: &str, id: &str, comments: &[&str]) -> Self {
            self.submissions
                .entry(community.to_string())
                .or_default()
                .push(submission(id, community));
            self.comments.insert(
                id.to_string(),
                comments.iter().map(ToString::to_string).collect(),
            );
            self
        }
    }

    #[async_trait]
    impl ForumClient for FakeForum {
        async fn search_submissions(
            &self,
            community: &str,
            query: &str,
            limit: u32,
            time_filter: TimeFilter,
        ) -> Result<Vec<Submission>> {
            self.searches.lock().unwrap().push((
                community.to_string(),
                query.to_string(),
                limit,
                time_filter,
            ));
            Ok(self
                .submissions
                .get(community)
                .cloned()
                .unwrap_or_default())
        }

        async fn top_comments(
            &self,
            submission: &Submission,
            comment_limit: u32,
        ) -> Result<Vec<String>> {
            self.expanded.lock().unwrap().push(submission.id.clone());
            let mut comments = self
                .comments
                .get(&submission.id)
                .cloned()
                .unwrap_or_default();
            comments.truncate(comment_limit as usize);
            Ok(comments)
        }
    }

    fn communities() -> Vec<String> {
        DEFAULT_COMMUNITIES.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_time_filter_for_days() {
        assert_eq!(TimeFilter::for_days(0), TimeFilter::Day);
        assert_eq!(TimeFilter::for_days(1), TimeFilter::Day);
        assert_eq!(TimeFilter::for_days(7), TimeFilter::Week);
        assert_eq!(TimeFilter::for_days(30), TimeFilter::Month);
        assert_eq!(TimeFilter::for_days(31), TimeFilter::Month);
        assert_eq!(TimeFilter::for_days(90), TimeFilter::Year);
        assert_eq!(TimeFilter::for_days(400), TimeFilter::All);
        assert_eq!(TimeFilter::Month.to_string(), "month");
    }

    #[tokio::test]
    async fn test_single_submission_across_communities() {
        let forum = Arc::new(FakeForum::default().with_submission(
            "investing",
            "abc",
            &["Great quarter for NVDA", "Overvalued imo"],
        ));
        let tool = SocialSearchTool::new(forum.clone(), communities(), 30, 5, 10);

        let text = tool.invoke("NVDA OR NVIDIA Corporation").await.unwrap();

        assert_eq!(text, "Great quarter for NVDA\n\nOvervalued imo");
        let searches = forum.searches.lock().unwrap();
        assert_eq!(searches.len(), 3);
        assert!(
            searches
                .iter()
                .all(|(_, q, limit, t)| q == "NVDA OR NVIDIA Corporation"
                    && *limit == 5
                    && *t == TimeFilter::Month)
        );
    }

    #[tokio::test]
    async fn test_only_last_submission_per_community_is_kept() {
        let forum = Arc::new(
            FakeForum::default()
                .with_submission("StockMarket", "first", &["dropped comment"])
                .with_submission("StockMarket", "second", &["kept comment"])
                .with_submission("wallstreetbets", "third", &["to the moon"]),
        );
        let tool = SocialSearchTool::new(forum.clone(), communities(), 30, 5, 10);

        let text = tool.invoke("NVDA OR NVIDIA Corporation").await.unwrap();

        assert_eq!(text, "kept comment\n\nto the moon");
        assert_eq!(
            *forum.expanded.lock().unwrap(),
            vec!["first".to_string(), "second".to_string(), "third".to_string()]
        );
    }

    #[tokio::test]
    async fn test_nothing_found_is_empty_string() {
        let forum = Arc::new(FakeForum::default().with_submission("investing", "silent", &[]));
        let tool = SocialSearchTool::new(forum, communities(), 30, 5, 10);

        assert_eq!(tool.invoke("ZZZZ OR Nothing Inc").await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_comment_limit_forwarded() {
        let forum = Arc::new(FakeForum::default().with_submission(
            "investing",
            "many",
            &["1", "2", "3", "4"],
        ));
        let tool = SocialSearchTool::new(forum, communities(), 7, 5, 2);

        assert_eq!(tool.invoke("EQNR OR Equinor ASA").await.unwrap(), "1\n\n2");
    }

    #[test]
    fn test_flatten_comments_breadth_first() {
        let listing: Listing = serde_json::from_value(json!({
            "kind": "Listing",
            "data": {
                "children": [
                    {"kind": "t1", "data": {
                        "body": "top A",
                        "replies": {"kind": "Listing", "data": {"children": [
                            {"kind": "t1", "data": {"body": "reply A1", "replies": ""}},
                            {"kind": "more", "data": {"count": 4, "children": ["x1", "x2"]}}
                        ]}}
                    }},
                    {"kind": "t1", "data": {"body": "top B", "replies": ""}},
                    {"kind": "more", "data": {"count": 12, "children": ["y1"]}}
                ]
            }
        }))
        .unwrap();

        assert_eq!(
            flatten_comments(listing.data.children),
            vec!["top A", "top B", "reply A1"]
        );
    }

    #[test]
    fn test_search_listing_parses_submissions() {
        let listing: Listing = serde_json::from_value(json!({
            "kind": "Listing",
            "data": {"children": [
                {"kind": "t3", "data": {"id": "1abc", "title": "NVDA earnings", "subreddit": "investing", "permalink": "/r/investing/comments/1abc/", "score": 42}}
            ]}
        }))
        .unwrap();

        let parsed: Vec<Submission> = listing
            .data
            .children
            .into_iter()
            .filter_map(|t| serde_json::from_value(t.data).ok())
            .collect();
        assert_eq!(parsed, vec![Submission {
            id: "1abc".to_string(),
            title: "NVDA earnings".to_string(),
            subreddit: "investing".to_string(),
            permalink: "/r/investing/comments/1abc/".to_string(),
        }]);
    }

    #[test]
    fn test_missing_credentials_rejected() {
        assert!(matches!(
            RedditClient::new("", "secret", Duration::from_secs(5), 60),
            Err(ToolError::Config(_))
        ));
    }

    #[tokio::test]
    #[ignore = "requires REDDIT_CLIENT_ID and REDDIT_CLIENT_SECRET and network access"]
    async fn test_live_search() {
        let client = RedditClient::new(
            std::env::var("REDDIT_CLIENT_ID").unwrap(),
            std::env::var("REDDIT_CLIENT_SECRET").unwrap(),
            Duration::from_secs(30),
            60,
        )
        .unwrap();

        let submissions = client
            .search_submissions("investing", "NVDA", 2, TimeFilter::Month)
            .await
            .unwrap();
        assert!(submissions.len() <= 2);
    }
}
