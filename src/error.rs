use reqwest::StatusCode;
use thiserror::Error;

/// 后台辅助工作流的错误
///
/// `Display` 即为展示给用户的文本（alert 或内联错误区域）
#[derive(Debug, Error)]
pub enum AssistError {
    /// 本地校验失败，未发起任何网络请求
    #[error("{0}")]
    Validation(String),

    /// 服务端返回非 2xx，message 取响应体的 `error` 字段，缺失时为调用方给出的兜底文案
    #[error("{message}")]
    Http { status: StatusCode, message: String },

    /// HTTP 成功但响应结构不符合约定
    #[error("{0}")]
    Shape(String),

    /// 请求未得到响应（连接失败、超时等）
    #[error("{0}")]
    Network(#[from] reqwest::Error),

    /// 响应体无法解析为期望的类型
    #[error("レスポンスの解析に失敗しました: {0}")]
    Decode(#[from] serde_json::Error),
}

impl AssistError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn shape(message: impl Into<String>) -> Self {
        Self::Shape(message.into())
    }

    /// 是否在发起网络请求之前就被拦截
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
