use anyhow::Result;
use farmscope_indexer::EventRegistry;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct TopicRow {
    name: &'static str,
    signature: &'static str,
    topic: String,
}

pub fn run() -> Result<()> {
    let registry = EventRegistry::new();
    let rows: Vec<TopicRow> = registry
        .entries()
        .map(|(name, signature, topic)| TopicRow {
            name,
            signature,
            topic: topic.to_string(),
        })
        .collect();
    super::print_json(&rows)
}
