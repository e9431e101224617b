use serde_json::{json, Map, Value};

use crate::errors::ProviderError;
use crate::models::message::Message;
use crate::models::tool::ToolDefinition;

use super::configs::OpenAiProviderConfig;

/// Convert tool definitions to the chat-completions tool specification
pub fn tools_to_openai_spec(tools: &[ToolDefinition]) -> Vec<Value> {
    tools
        .iter()
        .map(|tool| {
            json!({
                "type": "function",
                "function": {
                    "name": tool.name,
                    "description": tool.description,
                    "parameters": tool.parameters,
                }
            })
        })
        .collect()
}

/// Build the request body for a chat-completions call
pub fn create_request(
    config: &OpenAiProviderConfig,
    messages: &[Message],
    tools: &[ToolDefinition],
    stream: bool,
) -> Value {
    let mut payload = Map::new();
    payload.insert("model".to_string(), json!(config.model));
    payload.insert("messages".to_string(), json!(messages));

    if !tools.is_empty() {
        payload.insert("tools".to_string(), json!(tools_to_openai_spec(tools)));
    }
    if let Some(temperature) = config.temperature {
        payload.insert("temperature".to_string(), json!(temperature));
    }
    if let Some(max_tokens) = config.max_tokens {
        payload.insert("max_tokens".to_string(), json!(max_tokens));
    }
    if stream {
        payload.insert("stream".to_string(), json!(true));
    }
    Value::Object(payload)
}

/// Extract the assistant message from a chat-completions response
pub fn openai_response_to_message(response: Value) -> Result<Message, ProviderError> {
    if let Some(error) = response.get("error") {
        return Err(ProviderError::Decode(format!("provider returned an error: {}", error)));
    }

    let original = response
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .cloned()
        .ok_or_else(|| ProviderError::Decode("no choices in response".to_string()))?;

    let mut message: Message = serde_json::from_value(original)
        .map_err(|e| ProviderError::Decode(format!("invalid message: {}", e)))?;

    if message.content.as_deref() == Some("") {
        message.content = None;
    }
    if message.tool_calls.as_ref().is_some_and(|calls| calls.is_empty()) {
        message.tool_calls = None;
    }
    for call in message.tool_calls.iter_mut().flatten() {
        if call.kind.is_empty() {
            call.kind = "function".to_string();
        }
    }
    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::message::Role;
    use crate::models::tool::ToolCall;
    use crate::schema::ObjectSchema;

    const TOOL_USE_RESPONSE: &str = r#"{
        "choices": [{
            "index": 0,
            "message": {
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": "1",
                    "function": {
                        "name": "example_fn",
                        "arguments": "{\"param\": \"value\"}"
                    }
                }]
            },
            "finish_reason": "tool_calls"
        }]
    }"#;

    #[test]
    fn test_create_request() {
        let config = OpenAiProviderConfig::mistral("key");
        let tool = ToolDefinition::new(
            "get_weather",
            "Get the weather",
            ObjectSchema::new().string("location", "", true).build(),
        );
        let messages = vec![
            Message::user("What's the weather in Paris?"),
            Message::assistant_empty().with_tool_call(ToolCall::function(
                "call_1",
                "get_weather",
                r#"{"location":"Paris"}"#,
            )),
            Message::tool("call_1", "sunny"),
        ];

        let payload = create_request(&config, &messages, &[tool], true);

        assert_eq!(payload["model"], "mistral-small-latest");
        assert_eq!(payload["stream"], true);
        assert_eq!(payload["tools"][0]["type"], "function");
        assert_eq!(payload["tools"][0]["function"]["name"], "get_weather");
        assert_eq!(payload["messages"][1]["tool_calls"][0]["type"], "function");
        assert_eq!(payload["messages"][2]["tool_call_id"], "call_1");
        assert!(payload.get("temperature").is_none());
    }

    #[test]
    fn test_create_request_without_tools() {
        let config = OpenAiProviderConfig::openai("key");
        let payload = create_request(&config, &[Message::user("hi")], &[], false);
        assert!(payload.get("tools").is_none());
        assert!(payload.get("stream").is_none());
    }

    #[test]
    fn test_openai_response_to_message_tool_call() {
        let response: Value = serde_json::from_str(TOOL_USE_RESPONSE).unwrap();
        let message = openai_response_to_message(response).unwrap();

        assert_eq!(message.role, Role::Assistant);
        assert_eq!(message.content, None);
        assert_eq!(
            message.tool_calls(),
            &[ToolCall::function("1", "example_fn", "{\"param\": \"value\"}")]
        );
    }

    #[test]
    fn test_openai_response_without_choices() {
        let err = openai_response_to_message(json!({"choices": []})).unwrap_err();
        assert!(matches!(err, ProviderError::Decode(_)));
    }
}
