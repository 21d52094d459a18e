use agent::ParseError;

const ROLE: &str = "You are a research assistant that helps write research papers.
Answer the research topic below. If you used tools such as web search, name them in the answer.";

/// Builds the instructions sent to the model for a research topic.
pub struct PromptBuilder {
    format_instructions: String,
}

impl PromptBuilder {
    pub fn new(format_instructions: String) -> Self {
        Self {
            format_instructions,
        }
    }

    /// The topic is appended as given, without escaping or trimming.
    pub fn build(&self, topic: &str) -> String {
        format!(
            "{}\nWrap the output in the following format and provide no other text:\n{}\n\nResearch Topic: {}",
            ROLE, self.format_instructions, topic
        )
    }

    /// Follow-up message asking the model to fix a reply that failed to parse.
    pub fn retry_prompt(&self, err: &ParseError) -> String {
        format!(
            "Your previous answer could not be used ({}).\nAnswer again with only the JSON object and no other text, in the following format:\n{}",
            err, self.format_instructions
        )
    }
}

#[cfg(test)]
mod tests {
    use super::PromptBuilder;
    use crate::record::ResearchRecord;
    use agent::OutputParser;

    fn builder() -> PromptBuilder {
        let parser = OutputParser::<ResearchRecord>::new().unwrap();
        PromptBuilder::new(parser.format_instructions())
    }

    #[test]
    fn test_prompt_embeds_schema_and_topic() {
        let prompt = builder().build("Black holes");

        assert!(prompt.starts_with("You are a research assistant"));
        assert!(prompt.contains("provide no other text"));
        for field in ["topic", "summary", "sources", "tools_used"] {
            assert!(prompt.contains(&format!("\"{}\"", field)), "{field} missing");
        }
        assert!(prompt.ends_with("Research Topic: Black holes"));
    }

    #[test]
    fn test_prompt_is_deterministic() {
        assert_eq!(builder().build("tides"), builder().build("tides"));
    }

    #[test]
    fn test_topic_embedded_verbatim() {
        let topic = "  \"quoted\" {braces} \\n émigré 🚀\nsecond line ";
        let prompt = builder().build(topic);
        assert!(prompt.ends_with(&format!("Research Topic: {}", topic)));
    }

    #[test]
    fn test_retry_prompt_names_failure() {
        let parser = OutputParser::<ResearchRecord>::new().unwrap();
        let err = parser.parse("no json here").unwrap_err();
        let prompt = builder().retry_prompt(&err);

        assert!(prompt.contains("malformed payload"));
        assert!(prompt.contains("\"sources\""));
    }
}
