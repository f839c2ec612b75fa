use serde_json::{Map, Value, json};

use crate::attachment::{FileAttachment, encode};
use crate::config::ProviderConfig;
use crate::error::LLMError;
use crate::types::QueryRequest;

/// 构建 Anthropic Messages 请求体
///
/// system 是顶层字段而非消息；max_tokens 在该协议中是必填项，因此总是写入。
pub(crate) fn build_anthropic_body(
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
        content.push(attachment_block(attachment)?);
    }
    content.push(json!({ "type": "text", "text": request.prompt }));

    let mut body = Map::new();
    body.insert("model".to_string(), Value::String(model));
    body.insert(
        "messages".to_string(),
        json!([{ "role": "user", "content": content }]),
    );
    body.insert(
        "max_tokens".to_string(),
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
    if let Some(system) = &request.system_instruction {
        body.insert("system".to_string(), Value::String(system.clone()));
    }
    if stream {
        body.insert("stream".to_string(), Value::Bool(true));
    }

    Ok(Value::Object(body))
}

/// Maps an attachment onto a Messages content block.
///
/// Images use the `image` source block, PDFs use `document`; other types are
/// not ingestible inline and become a descriptive text block.
fn attachment_block(attachment: &FileAttachment) -> Result<Value, LLMError> {
    let encoded = encode(attachment);

    if encoded.mime_type.starts_with("image/") {
        return Ok(json!({
            "type": "image",
            "source": {
                "type": "base64",
                "media_type": encoded.mime_type,
                "data": encoded.data,
            }
        }));
    }

    if encoded.mime_type == "application/pdf" {
        return Ok(json!({
            "type": "document",
            "source": {
                "type": "base64",
                "media_type": encoded.mime_type,
                "data": encoded.data,
            }
        }));
    }

    if encoded.mime_type.starts_with("text/") {
        let decoded = String::from_utf8_lossy(&attachment.bytes);
        return Ok(json!({
            "type": "text",
            "text": format!("(Contents of {}):\n\n{}", encoded.filename, decoded)
        }));
    }

    Ok(json!({
        "type": "text",
        "text": format!(
            "[Note: A file named '{}' with MIME type '{}' was provided but cannot \
             be read inline.]",
            encoded.filename, encoded.mime_type
        )
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ProviderConfig {
        ProviderConfig::anthropic("test-key")
    }

    #[test]
    fn system_is_a_top_level_field() {
        let mut request = QueryRequest::prompt("hello");
        request.system_instruction = Some("be terse".to_string());
        let body = build_anthropic_body(&request, &config(), false).expect("body builds");

        assert_eq!(body["system"], json!("be terse"));
        let messages = body["messages"].as_array().expect("messages");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["role"], json!("user"));
    }

    #[test]
    fn max_tokens_is_always_present() {
        let body =
            build_anthropic_body(&QueryRequest::prompt("hi"), &config(), false).expect("builds");
        assert_eq!(body["max_tokens"], json!(4096));
    }

    #[test]
    fn pdf_attachment_becomes_document_block() {
        let mut request = QueryRequest::prompt("summarize");
        request.attachment =
            Some(FileAttachment::new(b"%PDF-1.4".to_vec()).with_filename("paper.pdf"));
        let body = build_anthropic_body(&request, &config(), false).expect("builds");

        let content = body["messages"][0]["content"].as_array().expect("content");
        assert_eq!(content[0]["type"], json!("document"));
        assert_eq!(
            content[0]["source"]["media_type"],
            json!("application/pdf")
        );
        assert_eq!(content[1]["text"], json!("summarize"));
    }

    #[test]
    fn image_attachment_becomes_image_block() {
        let mut request = QueryRequest::prompt("describe");
        request.attachment =
            Some(FileAttachment::new(b"\xff\xd8\xff\xe0".to_vec()).with_filename("photo.jpg"));
        let body = build_anthropic_body(&request, &config(), false).expect("builds");

        let content = body["messages"][0]["content"].as_array().expect("content");
        assert_eq!(content[0]["type"], json!("image"));
        assert_eq!(content[0]["source"]["media_type"], json!("image/jpeg"));
    }
}
