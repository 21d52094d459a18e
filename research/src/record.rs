use agent::StructuredOutput;
use schemars::JsonSchema;
use serde::Deserialize;

/// The JSON shape the model is asked to answer with.
#[derive(Deserialize, JsonSchema)]
pub struct ResearchReply {
    /// The research topic being answered
    topic: String,
    /// A summary of the findings on the topic
    summary: String,
    /// Sources backing the summary, in citation order
    sources: Vec<String>,
    /// Names of the tools used while researching, empty if none
    #[serde(default)]
    tools_used: Vec<String>,
}

/// A validated research result. Only obtainable by parsing a model reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResearchRecord {
    topic: String,
    summary: String,
    sources: Vec<String>,
    tools_used: Vec<String>,
}

impl ResearchRecord {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn tools_used(&self) -> &[String] {
        &self.tools_used
    }
}

impl StructuredOutput for ResearchRecord {
    type Reply = ResearchReply;

    fn from_reply(reply: ResearchReply) -> Result<Self, String> {
        if reply.topic.trim().is_empty() {
            return Err("field `topic` must not be empty".to_string());
        }
        if reply.summary.trim().is_empty() {
            return Err("field `summary` must not be empty".to_string());
        }
        if let Some(i) = reply.sources.iter().position(|s| s.trim().is_empty()) {
            return Err(format!("sources[{}] must not be empty", i));
        }

        Ok(Self {
            topic: reply.topic,
            summary: reply.summary,
            sources: reply.sources,
            tools_used: reply.tools_used,
        })
    }
}
