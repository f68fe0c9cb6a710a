use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::AppError;

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: Option<ChatReply>,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// 提示词预处理：翻译或优化为英文 TAG
#[derive(Clone)]
pub struct PromptProcessor {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    model: String,
}

impl PromptProcessor {
    pub fn new(client: reqwest::Client, config: &Config) -> Self {
        Self {
            client,
            api_url: config.process_api_url.clone(),
            api_key: config.process_api_key.clone(),
            model: config.process_model.clone(),
        }
    }

    /// 纯 ASCII 且未要求优化时不调用上游
    pub fn needs_processing(prompt: &str, optimize: bool) -> bool {
        optimize || !prompt.is_ascii()
    }

    pub async fn process(&self, prompt: &str, optimize: bool) -> Result<String, AppError> {
        if !Self::needs_processing(prompt, optimize) {
            return Ok(prompt.to_string());
        }

        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::PromptProcessing("no API key configured".into()))?;

        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: instruction(prompt, optimize),
            }],
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::PromptProcessing(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::PromptProcessing(format!("status {}", status.as_u16())));
        }

        let data: ChatResponse = response
            .json()
            .await
            .map_err(|_| AppError::PromptProcessing("unexpected response format".into()))?;

        data.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|reply| reply.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| AppError::PromptProcessing("missing message content".into()))
    }
}

fn instruction(prompt: &str, optimize: bool) -> String {
    if optimize {
        format!(
            "# 优化以下图像prompt，保留prompt主要元素基础上使细节、构图更加丰富：\n\
             ## 图像prompt：\n\
             {}\n\
             ## 优化要求\n\
             1. 优化后的图像prompt是一组<英文TAG标签>，每个TAG应该遵循构图的基本原则，将画风、构图、主体、动作、场景、元素、按顺序进行描述。\n\
             2. <英文TAG标签>中每个词组用逗号\",\"分割，逗号\",\"前后不允许有\"空格\"。\n\
             3. 由多个单词组成的TAG用下划线\"_\"连接。\n\
             # 仅仅输出优化后的图像prompt，不要有其他说明：",
            prompt
        )
    } else {
        format!("请将以下内容翻译为英文，保持原意：{}", prompt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_without_optimize_is_untouched() {
        assert!(!PromptProcessor::needs_processing("a cat", false));
        assert!(PromptProcessor::needs_processing("a cat", true));
        assert!(PromptProcessor::needs_processing("一只猫", false));
        assert!(PromptProcessor::needs_processing("café", false));
    }

    #[tokio::test]
    async fn cheap_path_makes_no_request() {
        // 指向不可达地址：若发出请求则会失败
        let config = Config {
            process_api_url: "http://127.0.0.1:9/unreachable".into(),
            process_api_key: Some("sk-test".into()),
            ..Config::default()
        };
        let processor = PromptProcessor::new(reqwest::Client::new(), &config);
        assert_eq!(processor.process("a cat", false).await.unwrap(), "a cat");
    }

    #[tokio::test]
    async fn missing_key_fails_without_request() {
        let processor = PromptProcessor::new(reqwest::Client::new(), &Config::default());
        let err = processor.process("一只猫", false).await.unwrap_err();
        assert!(matches!(err, AppError::PromptProcessing(_)));
    }

    #[test]
    fn templates_embed_prompt() {
        assert!(instruction("一只猫", false).ends_with("一只猫"));
        let optimize = instruction("一只猫", true);
        assert!(optimize.contains("一只猫"));
        assert!(optimize.contains("下划线"));
    }
}
