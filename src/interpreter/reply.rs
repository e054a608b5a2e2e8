//! Parsing of interpreter replies.
//!
//! Language models do not always follow the JSON contract exactly: replies
//! arrive wrapped in code fences, with the step as a string, or with a field
//! missing.  [`parse_reply`] accepts all of those and only fails when no JSON
//! object can be found at all.
//!
//! | Reply                         | Result                                  |
//! |-------------------------------|-----------------------------------------|
//! | `nextStep` missing / not int  | stays on `current_step`                 |
//! | `nextStep: "2"`               | `2`                                     |
//! | `responseText` missing        | empty text (controller substitutes one) |
//! | no `{ … }` in content         | `InterpreterError::Parse`               |

use serde::Deserialize;
use serde_json::Value;

use crate::interpreter::client::{InstructionResponse, InterpreterError};

#[derive(Debug, Deserialize)]
struct RawReply {
    #[serde(default, alias = "response_text", alias = "response")]
    #[serde(rename = "responseText")]
    response_text: Option<String>,
    #[serde(default, alias = "next_step")]
    #[serde(rename = "nextStep")]
    next_step: Option<Value>,
}

/// Parse the message content returned by the model.
pub fn parse_reply(content: &str, current_step: usize) -> Result<InstructionResponse, InterpreterError> {
    let object = extract_object(content)
        .ok_or_else(|| InterpreterError::Parse(format!("no JSON object in {content:?}")))?;

    let raw: RawReply =
        serde_json::from_str(object).map_err(|e| InterpreterError::Parse(e.to_string()))?;

    let next_step = raw
        .next_step
        .as_ref()
        .and_then(step_from_value)
        .unwrap_or(current_step as i64);

    Ok(InstructionResponse {
        response_text: raw.response_text.unwrap_or_default().trim().to_string(),
        next_step,
    })
}

/// Slice from the first `{` to the last `}`, dropping fences and chatter.
fn extract_object(content: &str) -> Option<&str> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    (end > start).then(|| &content[start..=end])
}

fn step_from_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_object() {
        let reply = parse_reply(r#"{"responseText":"Mix flour and sugar","nextStep":1}"#, 0).unwrap();
        assert_eq!(reply.response_text, "Mix flour and sugar");
        assert_eq!(reply.next_step, 1);
    }

    #[test]
    fn strips_code_fences() {
        let content = "```json\n{\"responseText\": \"Done!\", \"nextStep\": -1}\n```";
        let reply = parse_reply(content, 2).unwrap();
        assert_eq!(reply.response_text, "Done!");
        assert_eq!(reply.next_step, -1);
    }

    #[test]
    fn accepts_step_as_string_or_float() {
        let reply = parse_reply(r#"{"responseText":"x","nextStep":"2"}"#, 0).unwrap();
        assert_eq!(reply.next_step, 2);

        let reply = parse_reply(r#"{"responseText":"x","nextStep":1.0}"#, 0).unwrap();
        assert_eq!(reply.next_step, 1);
    }

    #[test]
    fn missing_step_keeps_current() {
        let reply = parse_reply(r#"{"responseText":"About 20 minutes."}"#, 2).unwrap();
        assert_eq!(reply.next_step, 2);

        let reply = parse_reply(r#"{"responseText":"x","nextStep":null}"#, 1).unwrap();
        assert_eq!(reply.next_step, 1);
    }

    #[test]
    fn missing_text_is_empty() {
        let reply = parse_reply(r#"{"nextStep":1}"#, 0).unwrap();
        assert!(reply.response_text.is_empty());
    }

    #[test]
    fn snake_case_fields_are_accepted() {
        let reply = parse_reply(r#"{"response_text":"ok","next_step":0}"#, 1).unwrap();
        assert_eq!(reply.response_text, "ok");
        assert_eq!(reply.next_step, 0);
    }

    #[test]
    fn prose_without_object_is_a_parse_error() {
        let err = parse_reply("Sure! Next, mix the flour.", 0).unwrap_err();
        assert!(matches!(err, InterpreterError::Parse(_)));
    }
}
