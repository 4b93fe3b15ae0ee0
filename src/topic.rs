use chrono::{DateTime, FixedOffset, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use url::Url;

use crate::window::shanghai;

#[derive(Debug, Deserialize)]
pub struct TopicListResponse {
    pub topic_list: TopicList,
}

#[derive(Debug, Deserialize)]
pub struct TopicList {
    #[serde(default)]
    pub topics: Vec<Topic>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Topic {
    pub id: u64,
    pub title: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "lenient")]
    pub last_posted_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient")]
    pub slug: String,
    #[serde(default, deserialize_with = "lenient")]
    pub views: u64,
    #[serde(default, deserialize_with = "lenient")]
    pub like_count: u64,
    #[serde(default, deserialize_with = "lenient")]
    pub reply_count: u64,
    #[serde(default, deserialize_with = "lenient")]
    pub posts_count: u64,
    #[serde(default, deserialize_with = "lenient")]
    pub pinned: bool,
    #[serde(default, deserialize_with = "lenient")]
    pub pinned_globally: bool,
    #[serde(default, deserialize_with = "lenient")]
    pub visible: bool,
    #[serde(default, deserialize_with = "lenient")]
    pub closed: bool,
    #[serde(default, deserialize_with = "lenient")]
    pub archived: bool,
    #[serde(default, deserialize_with = "lenient")]
    pub tags: Vec<TagRef>,
    #[serde(default, deserialize_with = "lenient")]
    pub category_id: Option<u64>,
}

/// `null` or a value of the wrong type falls back to the field's default.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Discourse emits tags either as bare names or, on newer versions, as objects.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TagRef {
    Name(String),
    Detailed { name: String },
}

impl TagRef {
    pub fn name(&self) -> &str {
        match self {
            TagRef::Name(name) | TagRef::Detailed { name } => name,
        }
    }
}

impl Topic {
    pub fn is_pinned(&self) -> bool {
        self.pinned || self.pinned_globally
    }

    pub fn url(&self, base_url: &Url) -> String {
        format!(
            "{}/t/{}/{}",
            base_url.as_str().trim_end_matches('/'),
            self.slug,
            self.id
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TopicRecord {
    pub id: u64,
    pub title: String,
    pub created_at: DateTime<FixedOffset>,
    pub last_posted_at: DateTime<FixedOffset>,
    pub url: String,
    pub views: u64,
    pub like_count: u64,
    pub reply_count: u64,
    pub posts_count: u64,
    pub pinned: bool,
    pub closed: bool,
    pub archived: bool,
    pub visible: bool,
    pub tags: Vec<String>,
    pub category_id: Option<u64>,
}

impl TopicRecord {
    pub fn from_topic(topic: &Topic, base_url: &Url) -> Self {
        let tz = shanghai();
        Self {
            id: topic.id,
            title: topic.title.clone(),
            created_at: topic.created_at.with_timezone(&tz),
            last_posted_at: topic
                .last_posted_at
                .unwrap_or(topic.created_at)
                .with_timezone(&tz),
            url: topic.url(base_url),
            views: topic.views,
            like_count: topic.like_count,
            reply_count: topic.reply_count,
            posts_count: topic.posts_count,
            pinned: topic.is_pinned(),
            closed: topic.closed,
            archived: topic.archived,
            visible: topic.visible,
            tags: topic.tags.iter().map(|t| t.name().to_string()).collect(),
            category_id: topic.category_id,
        }
    }
}
