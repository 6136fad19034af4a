use serde::{Deserialize, Serialize};

use crate::engine::TopicModel;

pub const TOPIC_COLUMN: &str = "topic";
pub const PROBABILITIES_COLUMN: &str = "probabilities";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicRow {
    pub topic: usize,
    pub probabilities: String,
}

/// One row per topic, in the order the model returns them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TopicReport {
    rows: Vec<TopicRow>,
}

impl TopicReport {
    pub fn from_model(model: &dyn TopicModel, top_n: usize) -> Self {
        TopicReport {
            rows: model
                .topics(top_n)
                .into_iter()
                .map(|(topic, probabilities)| TopicRow {
                    topic,
                    probabilities,
                })
                .collect(),
        }
    }

    pub fn columns() -> [&'static str; 2] {
        [TOPIC_COLUMN, PROBABILITIES_COLUMN]
    }

    pub fn rows(&self) -> &[TopicRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn print_table(&self) {
        println!("\n📚 Topics:");
        println!("   {:<6} {}", TOPIC_COLUMN, PROBABILITIES_COLUMN);
        for row in &self.rows {
            println!("   {:<6} {}", row.topic, row.probabilities);
        }
    }
}
