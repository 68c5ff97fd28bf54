//! Analysis backend.

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::{AnalysisResults, Entity, Sentiment};

use super::Analyzer;

/// Simulated analysis backend with a fixed summary and entity set.
///
/// The transcript is echoed into `full_transcript` so the record never
/// carries the transcript as a separate attribute.
#[derive(Debug, Default)]
pub struct SimulatedAnalyzer;

impl SimulatedAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Analyzer for SimulatedAnalyzer {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn analyze(&self, transcript: &str) -> Result<AnalysisResults> {
        Ok(AnalysisResults {
            summary: "Client was concerned about price but scheduled a demo.".to_string(),
            sentiment: Sentiment::Neutral,
            entities: vec![
                Entity {
                    text: "price".to_string(),
                    entity_type: "KEYWORD".to_string(),
                },
                Entity {
                    text: "next Tuesday".to_string(),
                    entity_type: "DATE".to_string(),
                },
            ],
            full_transcript: transcript.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_echoes_transcript() {
        let analyzer = SimulatedAnalyzer::new();
        let results = analyzer.analyze("the client said hello").await.unwrap();

        assert_eq!(results.full_transcript, "the client said hello");
        assert_eq!(results.sentiment, Sentiment::Neutral);
        assert!(!results.summary.is_empty());
        assert_eq!(results.entities.len(), 2);
        assert_eq!(results.entities[0].entity_type, "KEYWORD");
    }
}
