use reqwest::header::USER_AGENT;
use serde::Deserialize;
use tracing::info;

use crate::error::{Context, Error, Result};

#[derive(Debug, Deserialize)]
struct RedditListing {
    data: RedditListingData,
}

#[derive(Debug, Deserialize)]
struct RedditListingData {
    children: Vec<RedditChild>,
}

#[derive(Debug, Deserialize)]
struct RedditChild {
    data: RedditPostData,
}

#[derive(Debug, Deserialize)]
struct RedditPostData {
    subreddit: String,
    author: String,
    title: String,
    #[serde(default)]
    selftext: String,
    url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedditPost {
    pub subreddit: String,
    pub author: String,
    pub title: String,
    pub body: String,
    pub url: String,
}

impl RedditPost {
    /// What gets read aloud: the title, a blank line, then the body.
    pub fn narration(&self) -> String {
        format!("{}\n\n{}", self.title.trim(), self.body.trim())
    }
}

/// Fetches a single post by its permalink.
pub async fn fetch_post(post_url: &str) -> Result<RedditPost> {
    let url = format!("{}.json", post_url.trim_end_matches('/'));
    let client = reqwest::Client::new();
    let res = client
        .get(&url)
        .header(USER_AGENT, "storyreel/0.1")
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .with_context(|| format!("fetching {url}"))?
        .text()
        .await
        .with_context(|| format!("reading {url}"))?;

    let post = parse_post(&res)?;
    info!("Fetched post '{}' from r/{}", post.title, post.subreddit);
    Ok(post)
}

/// A permalink's JSON is `[post listing, comment listing]`.
fn parse_post(raw: &str) -> Result<RedditPost> {
    let listings: Vec<RedditListing> =
        serde_json::from_str(raw).context("parsing reddit response")?;
    let data = listings
        .into_iter()
        .next()
        .and_then(|l| l.data.children.into_iter().next())
        .map(|c| c.data)
        .ok_or_else(|| Error::InvalidInput("reddit response contains no post".to_string()))?;

    Ok(RedditPost {
        subreddit: data.subreddit,
        author: format!("u/{}", data.author),
        title: data.title,
        body: data.selftext,
        url: data.url,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_first_child_of_first_listing() {
        let raw = r#"[
            {"kind": "Listing", "data": {"children": [{"kind": "t3", "data": {
                "subreddit": "AITAH", "author": "throwaway", "title": "AITA for leaving?",
                "selftext": "So this happened.", "url": "https://www.reddit.com/r/AITAH/comments/x/"
            }}]}},
            {"kind": "Listing", "data": {"children": []}}
        ]"#;
        let post = parse_post(raw).unwrap();
        assert_eq!(post.author, "u/throwaway");
        assert_eq!(post.narration(), "AITA for leaving?\n\nSo this happened.");
    }

    #[test]
    fn empty_listing_is_invalid() {
        let raw = r#"[{"kind": "Listing", "data": {"children": []}}]"#;
        assert!(matches!(parse_post(raw), Err(Error::InvalidInput(_))));
    }
}
