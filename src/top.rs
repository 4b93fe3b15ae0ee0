use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::config::TopConfig;
use crate::fetcher::Fetcher;
use crate::progress::Progress;
use crate::topic::{Topic, TopicListResponse};
use crate::window::shanghai;

#[derive(Debug, Clone, Serialize)]
pub struct TopTopic {
    pub id: u64,
    pub title: String,
    pub created_at: DateTime<FixedOffset>,
    pub views: u64,
    pub posts_count: u64,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_post_content: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TopSnapshot {
    pub date: NaiveDate,
    pub topics: Vec<TopTopic>,
}

#[derive(Debug, Deserialize)]
struct TopicDetail {
    post_stream: PostStream,
}

#[derive(Debug, Deserialize)]
struct PostStream {
    #[serde(default)]
    posts: Vec<Post>,
}

#[derive(Debug, Deserialize)]
struct Post {
    #[serde(default)]
    username: String,
    #[serde(default)]
    cooked: String,
}

pub struct FirstPost {
    pub author: String,
    pub content: String,
}

fn format_topic(topic: &Topic, config: &TopConfig) -> TopTopic {
    TopTopic {
        id: topic.id,
        title: topic.title.clone(),
        created_at: topic.created_at.with_timezone(&shanghai()),
        views: topic.views,
        posts_count: topic.posts_count,
        url: topic.url(&config.base_url),
        author: None,
        first_post_content: None,
    }
}

pub async fn first_post(
    fetcher: &Fetcher,
    config: &TopConfig,
    topic_id: u64,
) -> anyhow::Result<Option<FirstPost>> {
    let detail: TopicDetail = fetcher.get_json(config.topic_url(topic_id)?).await?;
    Ok(detail.post_stream.posts.into_iter().next().map(|p| FirstPost {
        author: p.username,
        content: p.cooked,
    }))
}

/// Site-wide top list as of `now`. A failed listing request yields an empty snapshot; a failed
/// first-post request leaves that topic without content.
pub async fn snapshot(
    fetcher: &Fetcher,
    config: &TopConfig,
    now: DateTime<FixedOffset>,
    progress: Option<&Progress>,
) -> anyhow::Result<TopSnapshot> {
    let date = now.with_timezone(&shanghai()).date_naive();

    let listing: anyhow::Result<TopicListResponse> = fetcher.get_json(config.top_url()?).await;
    let topics = match listing {
        Ok(resp) => resp.topic_list.topics,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "failed to fetch top topics");
            Vec::new()
        }
    };

    let mut out = Vec::with_capacity(topics.len());
    for topic in &topics {
        let mut formatted = format_topic(topic, config);
        tracing::info!(id = topic.id, title = %topic.title, "found top topic");

        if config.with_content {
            if let Some(p) = progress {
                p.set_stage(format!("读取 #{} 首帖", topic.id));
            }
            match first_post(fetcher, config, topic.id).await {
                Ok(Some(post)) => {
                    formatted.author = Some(post.author);
                    formatted.first_post_content = Some(post.content);
                }
                Ok(None) => {
                    formatted.author = Some(String::new());
                    formatted.first_post_content = Some(String::new());
                }
                Err(e) => {
                    tracing::warn!(
                        id = topic.id,
                        error = %format!("{e:#}"),
                        "failed to fetch topic content"
                    );
                }
            }
        }
        out.push(formatted);
    }

    tracing::info!(count = out.len(), "collected top topics");
    Ok(TopSnapshot { date, topics: out })
}

pub fn default_file_name(date: NaiveDate) -> String {
    format!("linux_do_top_{}.json", date.format("%Y-%m-%d"))
}
