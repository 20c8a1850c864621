//! Conversion from provider-neutral requests to Gemini wire format.

use super::types::{
    GeminiContent, GeminiFunctionCall, GeminiFunctionDeclaration, GeminiFunctionResponse,
    GeminiGenerationConfig, GeminiPart, GeminiRequest, GeminiTool,
};
use crate::provider::types::{ChatRequest, ContentBlock, Role};
use std::collections::HashMap;

impl GeminiRequest {
    pub(crate) fn from_chat_request(request: &ChatRequest) -> Self {
        let mut contents = Vec::new();
        let mut system_parts: Vec<String> = request
            .system
            .iter()
            .map(|s| s.to_string())
            .filter(|s| !s.trim().is_empty())
            .collect();

        // Gemini matches function responses by name, not by call id.
        let tool_call_names: HashMap<&str, &str> = request
            .messages
            .iter()
            .filter(|m| m.role == Role::Assistant)
            .flat_map(|m| m.content.iter())
            .filter_map(|b| match b {
                ContentBlock::ToolCall { id, name, .. } => Some((id.as_str(), name.as_str())),
                _ => None,
            })
            .collect();

        for msg in request.messages.iter() {
            let (role, parts): (&str, Vec<GeminiPart>) = match msg.role {
                Role::System => {
                    let text = msg.joined_text();
                    if !text.trim().is_empty() {
                        system_parts.push(text);
                    }
                    continue;
                }
                Role::User => (
                    "user",
                    msg.content
                        .iter()
                        .filter_map(|b| match b {
                            ContentBlock::Text { text } => Some(GeminiPart::text(text.clone())),
                            _ => None,
                        })
                        .collect(),
                ),
                Role::Assistant => (
                    "model",
                    msg.content
                        .iter()
                        .filter_map(|b| match b {
                            ContentBlock::Text { text } => Some(GeminiPart::text(text.clone())),
                            ContentBlock::ToolCall {
                                name,
                                arguments,
                                signature,
                                ..
                            } => Some(GeminiPart {
                                function_call: Some(GeminiFunctionCall {
                                    name: name.clone(),
                                    args: if arguments.is_null() {
                                        serde_json::json!({})
                                    } else {
                                        arguments.clone()
                                    },
                                }),
                                thought_signature: signature.clone(),
                                ..GeminiPart::default()
                            }),
                            ContentBlock::ToolResult { .. } => None,
                        })
                        .collect(),
                ),
                Role::ToolResult => (
                    "user",
                    msg.content
                        .iter()
                        .filter_map(|b| match b {
                            ContentBlock::ToolResult {
                                tool_call_id,
                                content,
                                is_error,
                            } => {
                                let name = tool_call_names
                                    .get(tool_call_id.as_str())
                                    .copied()
                                    .unwrap_or(tool_call_id.as_str());
                                let key = if *is_error { "error" } else { "result" };
                                Some(GeminiPart {
                                    function_response: Some(GeminiFunctionResponse {
                                        name: name.to_string(),
                                        response: serde_json::json!({ key: content }),
                                    }),
                                    ..GeminiPart::default()
                                })
                            }
                            _ => None,
                        })
                        .collect(),
                ),
            };

            if !parts.is_empty() {
                contents.push(GeminiContent {
                    role: Some(role.to_string()),
                    parts,
                });
            }
        }

        let system_instruction = if system_parts.is_empty() {
            None
        } else {
            Some(GeminiContent {
                role: None,
                parts: vec![GeminiPart::text(system_parts.join("\n\n"))],
            })
        };

        let tools = if request.tools.is_empty() {
            None
        } else {
            Some(vec![GeminiTool {
                function_declarations: request
                    .tools
                    .iter()
                    .map(|t| GeminiFunctionDeclaration {
                        name: t.name.clone(),
                        description: t.description.clone(),
                        parameters: t.parameters.clone(),
                    })
                    .collect(),
            }])
        };

        let generation_config = if request.temperature.is_some() || request.max_tokens.is_some() {
            Some(GeminiGenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            })
        } else {
            None
        };

        Self {
            contents,
            system_instruction,
            tools,
            generation_config,
        }
    }
}
