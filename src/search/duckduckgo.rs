//! DuckDuckGo backend for `WebSearch`, via the instant-answer JSON API.

use std::time::Duration;

use serde::Deserialize;

use super::{SearchHit, WebSearch};
use crate::error::SearchError;

const DEFAULT_ENDPOINT: &str = "https://api.duckduckgo.com";

/// Web search backed by DuckDuckGo's instant-answer API.
pub struct DuckDuckGoSearch {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct InstantAnswer {
    #[serde(rename = "Heading", default)]
    heading: String,
    #[serde(rename = "AbstractText", default)]
    abstract_text: String,
    #[serde(rename = "AbstractURL", default)]
    abstract_url: String,
    #[serde(rename = "RelatedTopics", default)]
    related_topics: Vec<RelatedTopic>,
}

/// Related topics are either direct entries or nested groups.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RelatedTopic {
    Entry {
        #[serde(rename = "Text")]
        text: String,
        #[serde(rename = "FirstURL", default)]
        first_url: String,
    },
    Group {
        #[serde(rename = "Topics", default)]
        topics: Vec<RelatedTopic>,
    },
}

impl DuckDuckGoSearch {
    pub fn new(timeout: Duration) -> Result<Self, SearchError> {
        Self::with_endpoint(DEFAULT_ENDPOINT, timeout)
    }

    pub fn with_endpoint(endpoint: &str, timeout: Duration) -> Result<Self, SearchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SearchError::RequestFailed(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    fn flatten(topics: Vec<RelatedTopic>, out: &mut Vec<SearchHit>) {
        for topic in topics {
            match topic {
                RelatedTopic::Entry { text, first_url } => {
                    if !text.is_empty() {
                        out.push(SearchHit {
                            title: text.clone(),
                            body: text,
                            url: first_url,
                        });
                    }
                }
                RelatedTopic::Group { topics } => Self::flatten(topics, out),
            }
        }
    }
}

#[async_trait::async_trait]
impl WebSearch for DuckDuckGoSearch {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchHit>, SearchError> {
        let response = self
            .client
            .get(format!("{}/", self.endpoint))
            .query(&[("q", query), ("format", "json"), ("no_html", "1")])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SearchError::Timeout(self.timeout)
                } else {
                    SearchError::RequestFailed(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::RequestFailed(format!(
                "status {}",
                status.as_u16()
            )));
        }

        let answer: InstantAnswer = response
            .json()
            .await
            .map_err(|e| SearchError::RequestFailed(format!("bad response body: {e}")))?;

        let mut hits = Vec::new();
        if !answer.abstract_text.is_empty() {
            hits.push(SearchHit {
                title: answer.heading,
                body: answer.abstract_text,
                url: answer.abstract_url,
            });
        }
        Self::flatten(answer.related_topics, &mut hits);
        hits.truncate(max_results);

        if hits.is_empty() {
            return Err(SearchError::NoResults(query.to_string()));
        }
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_instant_answer_with_nested_topics() {
        let raw = r#"{
            "Heading": "IPhone 12",
            "AbstractText": "Smartphone da Apple lançado em 2020.",
            "AbstractURL": "https://example.org/iphone12",
            "RelatedTopics": [
                {"Text": "iPhone 12 Pro - variante premium", "FirstURL": "https://example.org/pro"},
                {"Topics": [{"Text": "iPhone 12 mini", "FirstURL": "https://example.org/mini"}]}
            ]
        }"#;
        let answer: InstantAnswer = serde_json::from_str(raw).unwrap();
        assert_eq!(answer.abstract_text, "Smartphone da Apple lançado em 2020.");

        let mut hits = Vec::new();
        DuckDuckGoSearch::flatten(answer.related_topics, &mut hits);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[1].body, "iPhone 12 mini");
    }

    #[test]
    fn empty_answer_parses_to_no_hits() {
        let answer: InstantAnswer = serde_json::from_str("{}").unwrap();
        assert!(answer.abstract_text.is_empty());
        assert!(answer.related_topics.is_empty());
    }
}
