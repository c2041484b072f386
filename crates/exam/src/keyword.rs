//! Compress a knowledge point into one search keyword with a language model.

use {
    async_trait::async_trait,
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
    tracing::debug,
};

use crate::error::{Error, Result};

#[async_trait]
pub trait KeywordExtractor: Send + Sync {
    /// A single keyword for `knowledge_point`. May be empty.
    async fn extract(&self, knowledge_point: &str) -> Result<String>;

    fn name(&self) -> &str;
}

/// OpenAI-compatible chat completion extractor.
pub struct OpenAiKeywordExtractor {
    client: reqwest::Client,
    api_key: Secret<String>,
    base_url: String,
    model: String,
}

impl OpenAiKeywordExtractor {
    pub const DEFAULT_MODEL: &'static str = "gpt-4o-mini";
    pub const DEFAULT_BASE_URL: &'static str = "https://api.openai.com";

    pub fn new(api_key: Secret<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            model: Self::DEFAULT_MODEL.to_string(),
        }
    }

    #[must_use]
    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }

    #[must_use]
    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }
}

fn prompt(knowledge_point: &str) -> String {
    format!("请将该知识点简化为一个词汇, 不要使用知识点内容以外的其它字眼: {knowledge_point}")
}

/// Strip the whitespace and quoting models like to wrap single words in.
fn clean_keyword(raw: &str) -> String {
    raw.trim_matches(|c: char| {
        c.is_whitespace() || matches!(c, '"' | '\'' | '`' | '“' | '”' | '‘' | '’' | '「' | '」')
    })
    .to_string()
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[async_trait]
impl KeywordExtractor for OpenAiKeywordExtractor {
    async fn extract(&self, knowledge_point: &str) -> Result<String> {
        let req = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user".into(),
                content: prompt(knowledge_point),
            }],
            temperature: 0.0,
        };

        let resp = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&req)
            .send()
            .await?
            .error_for_status()?
            .json::<ChatResponse>()
            .await?;

        let content = resp
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| Error::keyword("completion returned no choices"))?;
        let keyword = clean_keyword(&content);
        debug!(model = %self.model, knowledge_point, keyword = %keyword, "extracted keyword");
        Ok(keyword)
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[rstest]
    #[case("页表", "页表")]
    #[case("  \"页表\"\n", "页表")]
    #[case("“死锁”", "死锁")]
    #[case("`TCP`", "TCP")]
    #[case("   ", "")]
    fn keywords_are_unquoted(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(clean_keyword(raw), expected);
    }

    #[test]
    fn request_carries_the_prompt() {
        let body = serde_json::to_value(ChatRequest {
            model: "gpt-4o-mini",
            messages: vec![ChatMessage {
                role: "user".into(),
                content: prompt("二叉树的遍历"),
            }],
            temperature: 0.0,
        })
        .unwrap();
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["role"], "user");
        assert!(
            body["messages"][0]["content"]
                .as_str()
                .unwrap()
                .ends_with(": 二叉树的遍历")
        );
    }

    #[test]
    fn response_first_choice_is_used() {
        let resp: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"index":0,"message":{"role":"assistant","content":" 遍历 "},"finish_reason":"stop"}]}"#,
        )
        .unwrap();
        assert_eq!(clean_keyword(&resp.choices[0].message.content), "遍历");
    }

    #[test]
    fn base_url_is_normalized() {
        let e = OpenAiKeywordExtractor::new(Secret::new("sk-test".into()))
            .with_base_url("https://api.deepseek.com/".into())
            .with_model("deepseek-chat".into());
        assert_eq!(e.base_url, "https://api.deepseek.com");
        assert_eq!(e.model, "deepseek-chat");
    }
}
