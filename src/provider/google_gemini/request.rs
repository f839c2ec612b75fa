use serde_json::{Map, Value, json};

use crate::attachment::encode;
use crate::config::ProviderConfig;
use crate::error::LLMError;
use crate::types::QueryRequest;

/// 构建 Google Gemini GenerateContent 请求体
///
/// 与 OpenAI Chat 不同，Gemini 使用路径参数携带模型名称，因此 body 中不出现 model。
/// Attachments ride along as `inlineData` parts; this is the whole reason
/// MIME inference matters, since the endpoint rejects
/// `application/octet-stream` payloads outright.
pub(crate) fn build_gemini_body(
    request: &QueryRequest,
    config: &ProviderConfig,
    _stream: bool,
) -> Result<Value, LLMError> {
    let mut body = Map::new();

    let mut parts = Vec::new();
    if let Some(attachment) = &request.attachment {
        let encoded = encode(attachment);
        parts.push(json!({
            "inlineData": {
                "mimeType": encoded.mime_type,
                "data": encoded.data,
            }
        }));
    }
    parts.push(json!({ "text": request.prompt }));

    body.insert(
        "contents".to_string(),
        json!([{ "role": "user", "parts": parts }]),
    );

    if let Some(system) = &request.system_instruction {
        // system_instruction 当前仅正式支持文本
        body.insert(
            "system_instruction".to_string(),
            json!({ "parts": [ { "text": system } ] }),
        );
    }

    let mut generation = Map::new();
    generation.insert(
        "temperature".to_string(),
        Value::from(request.overrides.temperature.unwrap_or(config.temperature)),
    );
    generation.insert(
        "topP".to_string(),
        Value::from(request.overrides.top_p.unwrap_or(config.top_p)),
    );
    generation.insert(
        "maxOutputTokens".to_string(),
        Value::from(
            request
                .overrides
                .max_output_tokens
                .unwrap_or(config.max_output_tokens),
        ),
    );
    body.insert("generationConfig".to_string(), Value::Object(generation));

    Ok(Value::Object(body))
}
