pub mod csrf;
#[cfg(test)]
pub mod testing;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, StatusCode, Url};
use serde_json::Value;
use std::future::Future;

use crate::config::ApiConfig;
use crate::error::AssistError;

/// 后台 API 路径
pub mod endpoints {
    pub const PROOFREAD: &str = "/api/gemini/proofread";
    pub const GENERATE_ARTICLE: &str = "/api/gemini/generate-article";
    pub const TEST_CONNECTION: &str = "/api/gemini/test-connection";
    pub const AI_PREFERENCES: &str = "/api/settings/ai-preferences";
    pub const GEMINI_API_KEY: &str = "/api/settings/gemini-api-key";
    pub const PREVIEW_MARKDOWN: &str = "/api/preview/markdown";
}

/// 一次 API 调用的结果：状态码 + 已解析的 JSON 响应体
///
/// 响应体不是合法 JSON 时为 `Value::Null`，状态码判断仍然生效
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl ApiResponse {
    pub fn new(status: StatusCode, body: Value) -> Self {
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// 响应体中的 `error` 字段
    pub fn error_message(&self) -> Option<&str> {
        self.body.get("error").and_then(Value::as_str)
    }

    /// 非 2xx 转为 `AssistError::Http`，优先使用服务端给出的错误信息
    pub fn into_result(self, fallback: &str) -> Result<Value, AssistError> {
        if self.is_success() {
            return Ok(self.body);
        }
        let message = self
            .error_message()
            .filter(|m| !m.is_empty())
            .unwrap_or(fallback)
            .to_string();
        Err(AssistError::Http {
            status: self.status,
            message,
        })
    }
}

/// 后台 JSON API 的调用接口
///
/// 每次用户操作只尝试一次，不重试
pub trait AdminApi: Send + Sync {
    fn call(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> impl Future<Output = Result<ApiResponse, AssistError>> + Send;
}

/// 基于 reqwest 的后台 API 客户端
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    csrf_token: String,
}

impl ApiClient {
    pub fn new(base_url: &str, csrf_token: impl Into<String>) -> Result<Self, AssistError> {
        let http = reqwest::Client::builder().cookie_store(true).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            csrf_token: csrf_token.into(),
        })
    }

    /// 按配置建立客户端
    ///
    /// CSRF token 来源：配置中的固定值 > 后台页面 `<meta name="csrf-token">`
    pub async fn connect(config: &ApiConfig) -> Result<Self, AssistError> {
        let mut client = Self::new(&config.base_url, config.csrf_token.clone())?;
        if !client.csrf_token.is_empty() || config.token_page.is_empty() {
            return Ok(client);
        }

        let page = client
            .http
            .get(client.url(&config.token_page))
            .send()
            .await?
            .text()
            .await?;
        match csrf::extract_meta_token(&page) {
            Some(token) => {
                tracing::debug!("已从 {} 读取 CSRF token", config.token_page);
                client.csrf_token = token;
            }
            None => {
                tracing::warn!("页面 {} 中未找到 csrf-token，将发送空 token", config.token_page);
            }
        }
        Ok(client)
    }

    pub fn csrf_token(&self) -> &str {
        &self.csrf_token
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// 提交后台表单动作（如删除），返回跟随重定向后的最终 URL
    pub async fn submit_form(&self, action: &str) -> Result<Url, AssistError> {
        let resp = self
            .http
            .post(self.url(action))
            .header(csrf::CSRF_HEADER, &self.csrf_token)
            .form(&[("_csrf_token", self.csrf_token.as_str())])
            .send()
            .await?;
        let status = resp.status();
        let url = resp.url().clone();
        if !status.is_success() {
            return Err(AssistError::Http {
                status,
                message: format!("操作に失敗しました（{status}）"),
            });
        }
        Ok(url)
    }
}

impl AdminApi for ApiClient {
    async fn call(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<ApiResponse, AssistError> {
        let mut req = self
            .http
            .request(method.clone(), self.url(path))
            .header(CONTENT_TYPE, "application/json")
            .header(csrf::CSRF_HEADER, &self.csrf_token);
        if let Some(body) = body {
            req = req.json(&body);
        }

        tracing::debug!(%method, path, "发送后台 API 请求");
        let resp = req.send().await?;
        let status = resp.status();
        let bytes = resp.bytes().await?;
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        if !status.is_success() {
            tracing::warn!(%method, path, %status, "后台 API 返回失败状态");
        }
        Ok(ApiResponse { status, body })
    }
}
