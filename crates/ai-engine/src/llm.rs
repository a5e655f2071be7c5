//! OpenAI 兼容 chat/completions 接口上的推理服务实现

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use ai_optimizer_common::{OptimizerError, ReasoningConfig, Result};
use ai_optimizer_domain::{
    KnowledgeBase, Plan, ProfilerConfig, SessionSummary, SystemProfile, SystemSnapshot,
    UserProfiles, DEFAULT_PROFILE,
};

use crate::planner::{ReasoningService, SessionReflection};
use crate::prompt::{improvement_prompt, plan_prompt, profile_prompt, report_prompt, SYSTEM_PROMPT};

/// 以提示词的 SHA-256 为键的响应缓存
pub struct ResponseCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, (Instant, String)>>,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn key(prompt: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(prompt.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    pub fn get(&self, prompt: &str) -> Option<String> {
        self.get_at(prompt, Instant::now())
    }

    fn get_at(&self, prompt: &str, now: Instant) -> Option<String> {
        let key = Self::key(prompt);
        let mut entries = self.entries.lock().ok()?;
        match entries.get(&key) {
            Some((stored, value)) if now.saturating_duration_since(*stored) < self.ttl => {
                Some(value.clone())
            }
            Some(_) => {
                entries.remove(&key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, prompt: &str, response: String) {
        self.insert_at(prompt, response, Instant::now());
    }

    /// 插入时顺带清掉所有过期条目
    fn insert_at(&self, prompt: &str, response: String, now: Instant) {
        if let Ok(mut entries) = self.entries.lock() {
            let ttl = self.ttl;
            entries.retain(|_, (stored, _)| now.saturating_duration_since(*stored) < ttl);
            entries.insert(Self::key(prompt), (now, response));
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct HttpReasoningClient {
    client: reqwest::Client,
    config: ReasoningConfig,
    api_key: Option<String>,
    cache: ResponseCache,
}

impl HttpReasoningClient {
    /// API key 从 `config.api_key_env` 指定的环境变量读取，缺失时不带鉴权头
    pub fn new(config: &ReasoningConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| OptimizerError::Reasoning(format!("failed to build HTTP client: {}", e)))?;
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty());
        if api_key.is_none() {
            log::warn!(
                "{} is not set, requests to {} will be unauthenticated",
                config.api_key_env,
                config.endpoint
            );
        }
        Ok(Self {
            client,
            config: config.clone(),
            api_key,
            cache: ResponseCache::new(Duration::from_secs(config.response_cache_ttl_secs)),
        })
    }

    async fn complete(&self, prompt: &str, use_cache: bool) -> Result<String> {
        if use_cache {
            if let Some(hit) = self.cache.get(prompt) {
                log::debug!("response cache hit");
                return Ok(hit);
            }
        }

        let body = json!({
            "model": self.config.model,
            "temperature": self.config.temperature,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": prompt},
            ],
        });
        let mut request = self.client.post(&self.config.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request
            .send()
            .await
            .map_err(|e| OptimizerError::Reasoning(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(OptimizerError::Reasoning(format!(
                "HTTP {} - {}",
                status.as_u16(),
                error_text
            )));
        }
        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| OptimizerError::Reasoning(format!("invalid response body: {}", e)))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| OptimizerError::Reasoning("response has no content".to_string()))?;

        if use_cache {
            self.cache.insert(prompt, content.clone());
        }
        Ok(content)
    }
}

/// 从模型回复中提取 JSON：依次尝试 ```json 代码块、任意代码块、最外层花括号、全文
pub fn extract_json(text: &str) -> Result<Value> {
    let outer_braces = text
        .find('{')
        .zip(text.rfind('}'))
        .filter(|(start, end)| start < end)
        .map(|(start, end)| &text[start..=end]);
    let candidates = [
        fenced_block(text, "```json"),
        fenced_block(text, "```"),
        outer_braces,
        Some(text),
    ];

    let mut last_error = None;
    for candidate in candidates.into_iter().flatten() {
        match serde_json::from_str(candidate.trim()) {
            Ok(value) => return Ok(value),
            Err(e) => last_error = Some(e),
        }
    }
    Err(OptimizerError::Reasoning(match last_error {
        Some(e) => format!("response is not valid JSON: {}", e),
        None => "response is empty".to_string(),
    }))
}

fn fenced_block<'a>(text: &'a str, fence: &str) -> Option<&'a str> {
    let open = text.find(fence)?;
    let body = &text[open + fence.len()..];
    let close = body.find("```")?;
    Some(&body[..close])
}

/// 解析 `{"profiles": [...]}` 或 `{"profile": "A, B"}`；结果为空时回落到默认画像
pub fn parse_profile_labels(value: &Value) -> Vec<String> {
    let mut labels: Vec<String> = match (value.get("profiles"), value.get("profile")) {
        (Some(Value::Array(items)), _) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        (_, Some(Value::String(s))) => s.split(',').map(|l| l.trim().to_string()).collect(),
        (_, Some(Value::Array(items))) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    };
    labels.retain(|l| !l.trim().is_empty());
    if labels.is_empty() {
        labels.push(DEFAULT_PROFILE.to_string());
    }
    labels
}

#[async_trait]
impl ReasoningService for HttpReasoningClient {
    async fn determine_profile(
        &self,
        profile: &SystemProfile,
        config: &ProfilerConfig,
    ) -> Result<Vec<String>> {
        let reply = self.complete(&profile_prompt(profile, config), true).await?;
        Ok(parse_profile_labels(&extract_json(&reply)?))
    }

    async fn generate_plan(
        &self,
        snapshot: &SystemSnapshot,
        profiles: &UserProfiles,
        rules: &KnowledgeBase,
    ) -> Result<Value> {
        let reply = self
            .complete(&plan_prompt(snapshot, profiles, rules), false)
            .await?;
        extract_json(&reply)
    }

    async fn generate_report(
        &self,
        summary: &SessionSummary,
        plan: &Plan,
        profiles: &UserProfiles,
    ) -> Result<String> {
        let reply = self
            .complete(&report_prompt(summary, plan, profiles), false)
            .await?;
        Ok(reply.trim().to_string())
    }

    async fn suggest_improvements(&self, reflection: &SessionReflection) -> Result<String> {
        let reply = self.complete(&improvement_prompt(reflection), false).await?;
        Ok(reply.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_fenced_and_bare_json() {
        let fenced = "Here you go:\n```json\n{\"profiles\": [\"Gamer\"]}\n```\nBye";
        assert_eq!(extract_json(fenced).unwrap(), json!({"profiles": ["Gamer"]}));

        let plain_fence = "```\n{\"a\": 1}\n```";
        assert_eq!(extract_json(plain_fence).unwrap(), json!({"a": 1}));

        let bare = "Sure. {\"action_plan\": [], \"cleanup_plan\": {}} Done.";
        assert_eq!(
            extract_json(bare).unwrap(),
            json!({"action_plan": [], "cleanup_plan": {}})
        );

        assert!(matches!(
            extract_json("no json here"),
            Err(OptimizerError::Reasoning(_))
        ));
    }

    #[test]
    fn unparsable_fence_falls_back_to_outer_braces() {
        let prose_fence = "Run ```pip cache purge``` first.\n{\"profiles\": [\"Developer\"]}";
        assert_eq!(extract_json(prose_fence).unwrap(), json!({"profiles": ["Developer"]}));

        let upper = "```JSON\n{\"a\": 1}\n```";
        assert_eq!(extract_json(upper).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn profile_labels_accept_both_shapes() {
        assert_eq!(
            parse_profile_labels(&json!({"profiles": ["Developer", "Gamer"]})),
            vec!["Developer", "Gamer"]
        );
        assert_eq!(
            parse_profile_labels(&json!({"profile": "Developer, Gamer"})),
            vec!["Developer", "Gamer"]
        );
        assert_eq!(parse_profile_labels(&json!({"profile": "  "})), vec![DEFAULT_PROFILE]);
        assert_eq!(parse_profile_labels(&json!({})), vec![DEFAULT_PROFILE]);
    }

    #[test]
    fn response_cache_expires_after_ttl() {
        let cache = ResponseCache::new(Duration::from_secs(3600));
        let t0 = Instant::now();
        cache.insert_at("prompt", "answer".to_string(), t0);

        assert_eq!(cache.get_at("prompt", t0 + Duration::from_secs(60)).as_deref(), Some("answer"));
        assert_eq!(cache.get_at("other", t0), None);
        assert_eq!(cache.get_at("prompt", t0 + Duration::from_secs(3600)), None);
        assert_eq!(cache.get_at("prompt", t0), None);
    }

    #[test]
    fn expired_entries_are_pruned_on_insert() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        let t0 = Instant::now();
        cache.insert_at("a", "1".to_string(), t0);
        cache.insert_at("b", "2".to_string(), t0 + Duration::from_secs(30));
        assert_eq!(cache.entries.lock().unwrap().len(), 2);

        cache.insert_at("c", "3".to_string(), t0 + Duration::from_secs(61));
        let entries = cache.entries.lock().unwrap();
        assert_eq!(entries.len(), 2);
        assert!(!entries.contains_key(&ResponseCache::key("a")));
    }

    #[test]
    fn cache_key_is_sha256_hex() {
        let key = ResponseCache::key("abc");
        assert_eq!(
            key,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
