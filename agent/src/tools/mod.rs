//! Tool interface exposed to the model. Tools are opaque to the agent: it
//! only knows their name, description and argument schema.

use crate::Result;
use crate::llm::Message;
use async_trait::async_trait;
use schemars::{JsonSchema, schema_for};

pub struct ToolDefinition {
    pub name: String,
    pub desc: String,
    pub params: serde_json::Value,
}

impl ToolDefinition {
    pub fn new<P: JsonSchema>(name: &str, desc: &str) -> Result<Self> {
        let schema = schema_for!(P);
        let params = serde_json::to_value(&schema.schema)?;
        Ok(Self {
            name: name.to_string(),
            desc: desc.to_string(),
            params,
        })
    }
}

#[derive(Clone, Debug, Hash)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub args: String,
}

impl ToolCall {
    pub fn args<O: for<'de> serde::Deserialize<'de>>(&self) -> Result<O> {
        let args = serde_json::from_str(&self.args)?;
        Ok(args)
    }
}

impl std::fmt::Display for ToolCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "- {} ({})\n\t- `{}`", self.name, self.id, self.args)
    }
}

/// A tool that may rewrite the history it is given.
#[async_trait]
pub trait Tool {
    fn definition(&self) -> Result<ToolDefinition>;

    async fn invoke(&mut self, call: &ToolCall, messages: Vec<Message>) -> Result<Vec<Message>>;
}

/// A tool that only produces a single result message.
#[async_trait]
pub trait FunctionalTool {
    fn definition(&self) -> Result<ToolDefinition>;

    async fn invoke_fn(&mut self, call: &ToolCall) -> Result<Message>;
}

#[async_trait]
impl<T> Tool for T
where
    T: FunctionalTool + Send + Sync,
{
    fn definition(&self) -> Result<ToolDefinition> {
        FunctionalTool::definition(self)
    }

    async fn invoke(
        &mut self,
        call: &ToolCall,
        mut messages: Vec<Message>,
    ) -> Result<Vec<Message>> {
        let result = self.invoke_fn(call).await?;
        messages.push(result);
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::{ToolCall, ToolDefinition};
    use crate::Result;

    #[derive(serde::Deserialize, schemars::JsonSchema)]
    struct LookupArgs {
        /// Article title
        title: String,
    }

    #[test]
    fn test_tool_definition_schema() -> Result<()> {
        let def = ToolDefinition::new::<LookupArgs>("lookup", "look up an article")?;
        assert_eq!(def.name, "lookup");
        assert_eq!(def.params["properties"]["title"]["type"], "string");
        assert_eq!(def.params["required"][0], "title");
        Ok(())
    }

    #[test]
    fn test_tool_call_args() -> Result<()> {
        let call = ToolCall {
            id: "1".to_string(),
            name: "lookup".to_string(),
            args: "{\"title\":\"Black holes\"}".to_string(),
        };
        let args: LookupArgs = call.args()?;
        assert_eq!(args.title, "Black holes");

        let bad = ToolCall {
            args: "not json".to_string(),
            ..call
        };
        assert!(bad.args::<LookupArgs>().is_err());
        Ok(())
    }
}
