use crate::prompt::PromptBuilder;
use crate::record::ResearchRecord;
use agent::callbacks::Callback;
use agent::llm;
use agent::llm::Message;
use agent::{AgentBuilder, OutputParser, StopCondition, tools_invoked};
use agent::{Error, Result};
use std::sync::Arc;

/// Stops once the model answers without asking for a tool.
struct FinalAnswer;

impl StopCondition for FinalAnswer {
    fn done(&self, history: &[llm::Message]) -> bool {
        matches!(history.last(), Some(Message::Assistant(_, tool_calls)) if tool_calls.is_empty())
    }
}

/// A single research session: prompt the model with a topic and turn its
/// answer into a [`ResearchRecord`].
pub struct Researcher {
    llm: Arc<dyn llm::LLM + Send + Sync>,
    parser: OutputParser<ResearchRecord>,
    prompts: PromptBuilder,
    web_search: bool,
    retries: usize,
    transcript: Option<Box<dyn Callback + Send>>,
}

impl Researcher {
    pub fn new(llm: Arc<dyn llm::LLM + Send + Sync>) -> Result<Self> {
        let parser = OutputParser::new()?;
        let prompts = PromptBuilder::new(parser.format_instructions());

        Ok(Self {
            llm,
            parser,
            prompts,
            web_search: false,
            retries: 0,
            transcript: None,
        })
    }

    pub fn web_search(mut self, enabled: bool) -> Self {
        self.web_search = enabled;
        self
    }

    /// Number of times the model is asked again after an unparseable answer.
    pub fn retries(mut self, retries: usize) -> Self {
        self.retries = retries;
        self
    }

    pub fn transcript(mut self, transcript: Box<dyn Callback + Send>) -> Self {
        self.transcript = Some(transcript);
        self
    }

    pub async fn run(self, topic: &str) -> Result<ResearchRecord> {
        if topic.trim().is_empty() {
            return Err(Error::MissingArg(
                "research topic must not be empty".to_string(),
            ));
        }

        let mut builder = AgentBuilder::new()
            .llm(self.llm)
            .llm_websearch(self.web_search)
            .stop_condition(Box::new(FinalAnswer));
        if let Some(transcript) = self.transcript {
            builder = builder.callback(transcript);
        }
        let mut agent = builder.build()?;

        let mut messages = vec![Message::User(self.prompts.build(topic))];
        let mut attempt = 0;

        loop {
            messages = agent.run(messages).await?;

            let reply = match messages.last() {
                Some(Message::Assistant(content, _)) => content.as_str(),
                _ => {
                    return Err(Error::AgentWorkflowError(
                        "agent stopped without an answer".to_string(),
                    ));
                }
            };

            match self.parser.parse(reply) {
                Ok(record) => {
                    tracing::info!(
                        topic = record.topic(),
                        sources = record.sources().len(),
                        "research record parsed"
                    );
                    tracing::debug!(
                        invoked = ?tools_invoked(&messages),
                        reported = ?record.tools_used(),
                        "tool usage"
                    );
                    return Ok(record);
                }
                Err(err) if attempt < self.retries => {
                    attempt += 1;
                    tracing::warn!(%err, attempt, "answer did not parse, asking the model again");
                    messages.push(Message::User(self.prompts.retry_prompt(&err)));
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}
