//! Problem fetcher
//!
//! Best-effort scrape of sample input/output pairs from a problem statement.
//! The statement is requested from a GraphQL endpoint by the problem slug taken
//! from the pasted URL.

use std::sync::OnceLock;

use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;
use tracing::{info, warn};

use crate::model::TestCase;

const PROBLEM_QUERY: &str = r#"
query getProblemDetails($titleSlug: String!) {
    question(titleSlug: $titleSlug) {
        title
        content
    }
}"#;

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<QuestionData>,
}

#[derive(Debug, Deserialize)]
struct QuestionData {
    question: Option<Question>,
}

#[derive(Debug, Deserialize)]
struct Question {
    title: Option<String>,
    content: Option<String>,
}

/// HTTP client for problem statements
#[derive(Clone)]
pub struct ProblemFetcher {
    client: reqwest::Client,
    endpoint: String,
}

impl ProblemFetcher {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    /// Fetch the statement behind `url` and extract its sample testcases
    pub async fn fetch_test_cases(&self, url: &str) -> Result<Vec<TestCase>> {
        let slug = problem_slug(url)
            .with_context(|| format!("No problem slug in URL: {}", url))?;

        let body = serde_json::json!({
            "query": PROBLEM_QUERY,
            "variables": { "titleSlug": &slug },
        });

        let response: GraphQlResponse = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Failed to request problem {}", slug))?
            .error_for_status()
            .with_context(|| format!("Problem API rejected request for {}", slug))?
            .json()
            .await
            .context("Malformed problem API response")?;

        let question = response
            .data
            .and_then(|data| data.question)
            .with_context(|| format!("Problem not found: {}", slug))?;
        let content = question
            .content
            .with_context(|| format!("Problem {} has no statement", slug))?;

        let cases = extract_test_cases(&content);
        if cases.is_empty() {
            warn!("No test cases found for {}", slug);
        } else {
            info!(
                "Fetched {} test cases for {}",
                cases.len(),
                question.title.as_deref().unwrap_or(&slug)
            );
        }
        Ok(cases)
    }
}

/// Slug of a problem URL: the segment after `problems/`, or else the last
/// non-empty path segment. Input without any `/` is taken as the slug itself.
pub fn problem_slug(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next()?.trim();
    let segments: Vec<&str> = match path.split_once("://") {
        // drop the host
        Some((_, rest)) => rest.split('/').skip(1).collect(),
        None if path.contains('/') => path.split('/').skip(1).collect(),
        // bare slug
        None => vec![path],
    };
    let segments: Vec<&str> = segments.into_iter().filter(|s| !s.is_empty()).collect();

    segments
        .iter()
        .position(|s| *s == "problems")
        .and_then(|idx| segments.get(idx + 1))
        .or_else(|| segments.last())
        .map(|s| s.to_string())
}

/// Pull `Input:` / `Output:` pairs out of the `<pre>` blocks of a statement.
pub fn extract_test_cases(content: &str) -> Vec<TestCase> {
    static PRE_BLOCK: OnceLock<Regex> = OnceLock::new();
    static SAMPLE: OnceLock<Regex> = OnceLock::new();

    let pre_block = PRE_BLOCK.get_or_init(|| {
        Regex::new(r"(?s)<pre>(.*?)</pre>").expect("pre block pattern is valid")
    });
    let sample = SAMPLE.get_or_init(|| {
        Regex::new(
            r"(?s)<strong>Input:</strong>(.*?)<strong>Output:</strong>(.*?)(?:<strong>Explanation:</strong>|\z)",
        )
        .expect("sample pattern is valid")
    });

    pre_block
        .captures_iter(content)
        .filter_map(|block| {
            let body = block.get(1)?.as_str();
            let caps = sample.captures(body)?;
            Some(TestCase::new(clean_html(&caps[1]), clean_html(&caps[2])))
        })
        .collect()
}

fn clean_html(fragment: &str) -> String {
    static TAG: OnceLock<Regex> = OnceLock::new();
    let tag = TAG.get_or_init(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"));

    tag.replace_all(fragment, "")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .trim()
        .to_string()
}
