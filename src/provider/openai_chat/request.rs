use serde_json::{Map, Value, json};

use crate::attachment::{FileAttachment, encode};
use crate::config::ProviderConfig;
use crate::error::LLMError;
use crate::types::QueryRequest;

/// 构建 OpenAI Chat Completions 请求体
///
/// Content is always the array form so attachment parts and the prompt can
/// coexist. The max-token field name depends on the resolved model string:
/// newer families reject `max_tokens` in favor of `max_completion_tokens`.
pub(crate) fn build_openai_body(
    request: &QueryRequest,
    config: &ProviderConfig,
    stream: bool,
) -> Result<Value, LLMError> {
    let model = request
        .overrides
        .model
        .clone()
        .unwrap_or_else(|| config.model.clone());

    let mut content = Vec::new();
    if let Some(attachment) = &request.attachment {
        content.push(attachment_part(attachment)?);
    }
    content.push(json!({ "type": "text", "text": request.prompt }));
    // Drop the placeholder for empty text attachments.
    content.retain(|part| !part.is_null());

    let mut messages = Vec::new();
    if let Some(system) = &request.system_instruction {
        messages.push(json!({ "role": "system", "content": system }));
    }
    messages.push(json!({ "role": "user", "content": content }));

    let mut body = Map::new();
    body.insert("model".to_string(), Value::String(model.clone()));
    body.insert("messages".to_string(), Value::Array(messages));
    body.insert(
        max_tokens_field(&model).to_string(),
        Value::from(
            request
                .overrides
                .max_output_tokens
                .unwrap_or(config.max_output_tokens),
        ),
    );
    body.insert(
        "temperature".to_string(),
        Value::from(request.overrides.temperature.unwrap_or(config.temperature)),
    );
    body.insert(
        "top_p".to_string(),
        Value::from(request.overrides.top_p.unwrap_or(config.top_p)),
    );
    if stream {
        body.insert("stream".to_string(), Value::Bool(true));
    }

    Ok(Value::Object(body))
}

/// Picks the output-token ceiling field for the given model identifier.
///
/// `gpt-4o` and later families (including the reasoning `o*` series) reject
/// the legacy `max_tokens` name.
pub(crate) fn max_tokens_field(model: &str) -> &'static str {
    const CURRENT_FAMILIES: [&str; 7] = [
        "gpt-4o", "gpt-4.1", "gpt-5", "chatgpt", "o1", "o3", "o4",
    ];
    let lower = model.to_ascii_lowercase();
    if CURRENT_FAMILIES
        .iter()
        .any(|prefix| lower.starts_with(prefix))
    {
        "max_completion_tokens"
    } else {
        "max_tokens"
    }
}

/// Maps an attachment onto a Chat Completions content part.
///
/// Images travel as data URLs; text attachments are decoded and labelled
/// with their filename; other binary types become a descriptive note, since
/// the Chat Completions endpoint cannot ingest arbitrary files inline.
fn attachment_part(attachment: &FileAttachment) -> Result<Value, LLMError> {
    let encoded = encode(attachment);

    if encoded.mime_type.starts_with("image/") {
        return Ok(json!({
            "type": "image_url",
            "image_url": {
                "url": format!("data:{};base64,{}", encoded.mime_type, encoded.data)
            }
        }));
    }

    if encoded.mime_type.starts_with("text/") {
        let decoded = String::from_utf8_lossy(&attachment.bytes);
        if decoded.trim().is_empty() {
            return Ok(Value::Null);
        }
        return Ok(json!({
            "type": "text",
            "text": format!("(Contents of {}):\n\n{}", encoded.filename, decoded)
        }));
    }

    Ok(json!({
        "type": "text",
        "text": format!(
            "[Note: A file named '{}' with MIME type '{}' was provided. You may not \
             be able to read it directly, but you can still respond based on the \
             description and prompt.]",
            encoded.filename, encoded.mime_type
        )
    }))
}
