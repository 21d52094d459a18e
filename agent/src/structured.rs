//! Structured output: format instructions derived from a JSON schema, and
//! parsing of free-text model replies into typed values.
//!
//! The whole reply is decoded directly first. If that does not yield a JSON
//! object, every `{` in the reply is tried in order and the shortest span that
//! decodes from it becomes a candidate. The first candidate that satisfies the
//! schema wins, so objects quoted in surrounding prose or code fences do not
//! hide the payload and unrelated trailing text is never swallowed.

use crate::Result;
use schemars::{JsonSchema, schema_for};
use serde::de::DeserializeOwned;
use serde_json::{Deserializer, Value};
use std::fmt;
use std::marker::PhantomData;

/// A value that can be requested from a model as JSON.
pub trait StructuredOutput: Sized {
    /// The shape the model is asked to produce.
    type Reply: DeserializeOwned + JsonSchema;

    /// Checks the constraints a JSON schema cannot express and builds the
    /// final value. The error string becomes the failure reason.
    fn from_reply(reply: Self::Reply) -> std::result::Result<Self, String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// The reply contains no decodable JSON object.
    MalformedPayload,
    /// A JSON object was found but it does not satisfy the schema.
    SchemaViolation,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseErrorKind::MalformedPayload => write!(f, "malformed payload"),
            ParseErrorKind::SchemaViolation => write!(f, "schema violation"),
        }
    }
}

/// A classified parse failure. Always carries the untouched reply so callers
/// can show it or feed it back to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    kind: ParseErrorKind,
    reason: String,
    raw: String,
}

impl ParseError {
    fn new(kind: ParseErrorKind, reason: impl Into<String>, raw: &str) -> Self {
        Self {
            kind,
            reason: reason.into(),
            raw: raw.to_string(),
        }
    }

    pub fn kind(&self) -> ParseErrorKind {
        self.kind
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.reason)
    }
}

impl std::error::Error for ParseError {}

/// JSON objects found in a reply, and braces that start text which does not
/// decode as JSON. Both are keyed by byte offset into the reply.
#[derive(Debug, Default)]
pub struct Payloads {
    pub objects: Vec<(usize, Value)>,
    pub broken: Vec<(usize, String)>,
}

/// Finds the JSON objects a reply may be carrying, outermost first.
pub fn extract_payloads(raw: &str) -> Payloads {
    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(raw.trim()) {
        tracing::debug!("reply decoded directly");
        return Payloads {
            objects: vec![(0, value)],
            broken: Vec::new(),
        };
    }

    let mut payloads = Payloads::default();
    for (start, _) in raw.match_indices('{') {
        let mut values = Deserializer::from_str(&raw[start..]).into_iter::<Value>();
        match values.next() {
            Some(Ok(value)) => {
                tracing::debug!(
                    start,
                    end = start + values.byte_offset(),
                    "candidate payload in reply"
                );
                payloads.objects.push((start, value));
            }
            Some(Err(err)) => payloads.broken.push((start, err.to_string())),
            None => {}
        }
    }
    payloads
}

/// Whether the text between `outer` and `inner` leaves a brace open.
fn encloses(raw: &str, outer: usize, inner: usize) -> bool {
    let depth = raw[outer..inner].chars().fold(0i64, |depth, c| match c {
        '{' => depth + 1,
        '}' => depth - 1,
        _ => depth,
    });
    depth > 0
}

pub struct OutputParser<T> {
    schema: String,
    output: PhantomData<fn() -> T>,
}

impl<T: StructuredOutput> OutputParser<T> {
    pub fn new() -> Result<Self> {
        let schema = schema_for!(T::Reply);
        let schema = serde_json::to_string_pretty(&schema.schema)?;
        Ok(Self {
            schema,
            output: PhantomData,
        })
    }

    /// Instructions telling the model how to shape its reply.
    pub fn format_instructions(&self) -> String {
        format!(
            "The output must be a single JSON object that conforms to the JSON schema below. \
The schema describes the object, it is not an example of the object itself: \
for a schema with a required property \"items\" of type array of strings, \
{{\"items\": [\"a\", \"b\"]}} is a valid answer while \
{{\"properties\": {{\"items\": [\"a\", \"b\"]}}}} is not.

Here is the output schema:
```json
{}
```",
            self.schema
        )
    }

    pub fn parse(&self, raw: &str) -> std::result::Result<T, ParseError> {
        let payloads = extract_payloads(raw);
        let mut rejected: Option<(usize, String)> = None;

        for (start, payload) in payloads.objects {
            let output = serde_json::from_value::<T::Reply>(payload)
                .map_err(|e| e.to_string())
                .and_then(T::from_reply);
            match output {
                Ok(output) => {
                    tracing::debug!(start, "payload accepted");
                    return Ok(output);
                }
                Err(reason) => {
                    tracing::debug!(start, %reason, "candidate payload rejected");
                    rejected.get_or_insert((start, reason));
                }
            }
        }

        let Some((start, reason)) = rejected else {
            let reason = payloads
                .broken
                .first()
                .map(|(_, err)| format!("invalid JSON: {}", err))
                .unwrap_or_else(|| "no JSON object found in response".to_string());
            return Err(ParseError::new(ParseErrorKind::MalformedPayload, reason, raw));
        };

        // a fragment nested in an object that does not decode says nothing
        // about the payload, the enclosing object is what is broken
        if let Some((_, err)) = payloads
            .broken
            .iter()
            .rev()
            .find(|(outer, _)| *outer < start && encloses(raw, *outer, start))
        {
            return Err(ParseError::new(
                ParseErrorKind::MalformedPayload,
                format!("invalid JSON: {}", err),
                raw,
            ));
        }

        Err(ParseError::new(ParseErrorKind::SchemaViolation, reason, raw))
    }
}
