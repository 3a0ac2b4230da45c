// src/feed/reddit.rs
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use metrics::{counter, histogram};
use serde::Deserialize;
use std::time::Duration;

use crate::config::watch::FeedCfg;
use crate::feed::{AuthorKarma, Comment, FeedClient, FeedItem};

/// Reddit caps listing pages at 100 items.
const MAX_LISTING: usize = 100;
/// `morechildren` accepts at most 100 ids per call.
const MAX_MORE_IDS: usize = 100;

#[derive(Debug, Deserialize)]
struct Listing<T> {
    data: ListingData<T>,
}

#[derive(Debug, Deserialize)]
struct ListingData<T> {
    children: Vec<Thing<T>>,
}

#[derive(Debug, Deserialize)]
struct Thing<T> {
    kind: String,
    data: T,
}

#[derive(Debug, Deserialize)]
struct PostData {
    id: String,
    url: Option<String>,
    permalink: String,
    title: String,
    author: Option<String>,
    link_flair_text: Option<String>,
    created_utc: f64,
    score: i64,
    #[serde(default)]
    upvote_ratio: f64,
    #[serde(default)]
    num_comments: u64,
}

/// Either a comment (`t1`) or a collapsed-thread stub (`more`).
#[derive(Debug, Deserialize)]
struct CommentData {
    #[serde(default)]
    id: String,
    body: Option<String>,
    parent_id: Option<String>,
    #[serde(default)]
    children: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct MoreChildrenResp {
    json: MoreChildrenJson,
}

#[derive(Debug, Deserialize)]
struct MoreChildrenJson {
    data: MoreChildrenData,
}

#[derive(Debug, Deserialize)]
struct MoreChildrenData {
    things: Vec<Thing<CommentData>>,
}

#[derive(Debug, Deserialize)]
struct AboutResp {
    data: AboutData,
}

#[derive(Debug, Deserialize)]
struct AboutData {
    #[serde(default)]
    is_suspended: bool,
    link_karma: Option<i64>,
    comment_karma: Option<i64>,
}

/// Client for the public (unauthenticated) Reddit JSON endpoints of one subreddit.
pub struct RedditClient {
    http: reqwest::Client,
    base_url: String,
    subreddit: String,
}

impl RedditClient {
    pub fn new(cfg: &FeedCfg) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .context("building reddit http client")?;
        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            subreddit: cfg.subreddit.clone(),
        })
    }

    async fn get_text(&self, url: &str) -> Result<String> {
        let t0 = std::time::Instant::now();
        let rsp = self
            .http
            .get(url)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?
            .error_for_status()
            .with_context(|| format!("GET {url} non-2xx"))?;
        let body = rsp.text().await.context("read reddit body")?;
        histogram!("watch_feed_request_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        Ok(body)
    }

    async fn listing(&self, sort: &str, limit: usize) -> Result<Vec<FeedItem>> {
        let url = format!(
            "{}/r/{}/{}.json?limit={}&raw_json=1",
            self.base_url,
            self.subreddit,
            sort,
            limit.min(MAX_LISTING)
        );
        let body = self.get_text(&url).await?;
        let items = parse_listing(&body)?;
        counter!("watch_feed_items_total").increment(items.len() as u64);
        Ok(items)
    }

    async fn more_children(&self, link_id: &str, ids: &[String]) -> Result<Vec<Comment>> {
        let url = format!(
            "{}/api/morechildren.json?api_type=json&raw_json=1&link_id=t3_{}&children={}",
            self.base_url,
            link_id,
            ids.join(",")
        );
        let body = self.get_text(&url).await?;
        parse_more_children(&body, link_id)
    }
}

#[async_trait]
impl FeedClient for RedditClient {
    async fn recent_items(&self, flair: &str, limit: usize) -> Result<Vec<FeedItem>> {
        let mut items = self.listing("new", limit).await?;
        items.retain(|it| it.flair.as_deref() == Some(flair));
        Ok(items)
    }

    async fn hot_items(&self, limit: usize) -> Result<Vec<FeedItem>> {
        let mut items = self.listing("hot", limit).await?;
        items.truncate(limit);
        Ok(items)
    }

    async fn comments(&self, item: &FeedItem, expand_limit: usize) -> Result<Vec<Comment>> {
        let url = format!(
            "{}/comments/{}.json?limit=500&depth=1&raw_json=1",
            self.base_url, item.id
        );
        let body = self.get_text(&url).await?;
        let (mut comments, collapsed) = parse_comment_page(&body)?;

        // Expand at most `expand_limit` collapsed stubs; the remaining ones are dropped.
        for stub in collapsed.into_iter().take(expand_limit) {
            for chunk in stub.chunks(MAX_MORE_IDS) {
                let mut more = self.more_children(&item.id, chunk).await?;
                comments.append(&mut more);
            }
        }
        Ok(comments)
    }

    async fn author_karma(&self, author: &str) -> Result<Option<AuthorKarma>> {
        let url = format!("{}/user/{}/about.json", self.base_url, author);
        let rsp = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;
        // Suspended/deleted accounts answer 404 (or 403 for suspended ones).
        if matches!(rsp.status().as_u16(), 403 | 404) {
            return Ok(None);
        }
        let body = rsp
            .error_for_status()
            .with_context(|| format!("GET {url} non-2xx"))?
            .text()
            .await
            .context("read about body")?;
        parse_about(&body)
    }

    fn name(&self) -> &'static str {
        "reddit"
    }
}

fn to_utc(created_utc: f64) -> Result<DateTime<Utc>> {
    let millis = (created_utc * 1_000.0).round() as i64;
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| anyhow!("created_utc out of range: {created_utc}"))
}

fn decode(s: &str) -> String {
    html_escape::decode_html_entities(s).to_string()
}

fn resolve_author(author: Option<String>) -> Option<String> {
    author.filter(|a| !a.is_empty() && a != "[deleted]" && a != "[removed]")
}

/// Parse a `/r/<sub>/<sort>.json` listing into feed items.
pub fn parse_listing(body: &str) -> Result<Vec<FeedItem>> {
    let listing: Listing<PostData> =
        serde_json::from_str(body).context("parsing reddit listing json")?;
    let mut out = Vec::with_capacity(listing.data.children.len());
    for thing in listing.data.children {
        if thing.kind != "t3" {
            continue;
        }
        let p = thing.data;
        let permalink = format!("https://www.reddit.com{}", p.permalink);
        out.push(FeedItem {
            url: p.url.map(|u| decode(&u)).unwrap_or_else(|| permalink.clone()),
            permalink,
            id: p.id,
            title: decode(&p.title),
            author: resolve_author(p.author),
            flair: p.link_flair_text,
            created_at: to_utc(p.created_utc)?,
            score: p.score,
            upvote_ratio: p.upvote_ratio,
            num_comments: p.num_comments,
        });
    }
    Ok(out)
}

/// Parse `/comments/<id>.json` into top-level comments plus collapsed stubs
/// (each stub is the list of child ids hidden behind one "load more").
pub fn parse_comment_page(body: &str) -> Result<(Vec<Comment>, Vec<Vec<String>>)> {
    // The page is `[post listing, comment listing]`.
    let pages: Vec<serde_json::Value> =
        serde_json::from_str(body).context("parsing reddit comment page")?;
    let comments_val = pages
        .into_iter()
        .nth(1)
        .ok_or_else(|| anyhow!("comment page without comment listing"))?;
    let listing: Listing<CommentData> =
        serde_json::from_value(comments_val).context("parsing comment listing")?;

    let mut comments = Vec::new();
    let mut collapsed = Vec::new();
    for thing in listing.data.children {
        match thing.kind.as_str() {
            "t1" => comments.push(Comment {
                id: thing.data.id,
                body: thing.data.body.map(|b| decode(&b)),
            }),
            "more" if !thing.data.children.is_empty() => collapsed.push(thing.data.children),
            _ => {}
        }
    }
    Ok((comments, collapsed))
}

/// Parse `/user/<name>/about.json`. Suspended accounts still answer 200 but
/// carry no karma; they resolve to `None` like deleted ones.
pub fn parse_about(body: &str) -> Result<Option<AuthorKarma>> {
    let about: AboutResp = serde_json::from_str(body).context("parsing user about json")?;
    let d = about.data;
    if d.is_suspended {
        return Ok(None);
    }
    match (d.link_karma, d.comment_karma) {
        (Some(link_karma), Some(comment_karma)) => Ok(Some(AuthorKarma {
            link_karma,
            comment_karma,
        })),
        _ => Ok(None),
    }
}

/// Keep only expanded comments that hang directly off the post.
fn parse_more_children(body: &str, link_id: &str) -> Result<Vec<Comment>> {
    let resp: MoreChildrenResp =
        serde_json::from_str(body).context("parsing morechildren json")?;
    let parent = format!("t3_{link_id}");
    Ok(resp
        .json
        .data
        .things
        .into_iter()
        .filter(|t| t.kind == "t1" && t.data.parent_id.as_deref() == Some(parent.as_str()))
        .map(|t| Comment {
            id: t.data.id,
            body: t.data.body.map(|b| decode(&b)),
        })
        .collect())
}
