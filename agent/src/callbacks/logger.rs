use crate::Result;
use crate::callbacks::Callback;
use crate::llm::Message;
use async_trait::async_trait;
use std::io::Write;

/// Appends the conversation to `writer` as markdown, one section per agent
/// step. Messages already written are skipped unless the history no longer
/// starts with them, in which case the whole history is written again.
pub struct TranscriptLogger<W: Write + Send> {
    written: Vec<u64>,
    writer: W,
    step: u32,
}

impl<W: Write + Send> TranscriptLogger<W> {
    pub fn new(title: &str, mut writer: W) -> Result<Box<Self>> {
        write!(writer, "# {}\n\n", title)?;

        Ok(Box::new(Self {
            written: Vec::new(),
            writer,
            step: 0,
        }))
    }

    fn write_messages(&mut self, messages: &[Message]) -> Result<()> {
        write!(self.writer, "## Step {}\n\n", self.step)?;

        messages
            .iter()
            .try_for_each(|m| write!(self.writer, "{}", m))?;

        write!(self.writer, "---\n\n")?;

        Ok(())
    }

    fn extends_written(&self, hashes: &[u64]) -> bool {
        hashes.len() >= self.written.len() && hashes[..self.written.len()] == self.written[..]
    }
}

#[async_trait]
impl<W: Write + Send> Callback for TranscriptLogger<W> {
    async fn call(&mut self, messages: Vec<Message>) -> Result<Vec<Message>> {
        let hashes = messages.iter().map(Message::get_hash).collect::<Vec<_>>();

        if self.extends_written(&hashes) {
            self.write_messages(&messages[self.written.len()..])?;
        } else {
            tracing::debug!("history rewritten, logging it again");
            write!(self.writer, "## [history rewritten]\n\n")?;
            self.write_messages(&messages)?;
        }

        self.writer.flush()?;

        self.step += 1;
        self.written = hashes;

        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::TranscriptLogger;
    use crate::Result;
    use crate::callbacks::Callback;
    use crate::llm::Message;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_transcript_logger() -> Result<()> {
        let mut buf = Vec::new();
        {
            let mut logger = TranscriptLogger::new("run", &mut buf)?;

            let history = vec![Message::User("q".to_string())];
            let mut history = logger.call(history).await?;

            history.push(Message::Assistant("a".to_string(), vec![]));
            let history = logger.call(history).await?;

            logger.call(vec![history[1].clone()]).await?;
        }

        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "# run\n\n\
             ## Step 0\n\n**user**\n\nq\n\n---\n\n\
             ## Step 1\n\n**assistant**\n\na\n\n---\n\n\
             ## [history rewritten]\n\n\
             ## Step 2\n\n**assistant**\n\na\n\n---\n\n"
        );

        Ok(())
    }
}
