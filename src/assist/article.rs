use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::alert_error;
use crate::admin::layout::{escape_with_breaks, html_escape, text_paragraph};
use crate::client::{AdminApi, endpoints};
use crate::error::AssistError;
use crate::view::AdminPage;

const FALLBACK_ERROR: &str = "記事生成に失敗しました";
const INVALID_RESULT: &str = "記事生成の結果が不正です";
const MISSING_BODY: &str = "記事本文が含まれていません";
const INVALID_WORD_COUNT: &str = "文字数には数値を入力してください";
const INSERTED: &str = "記事をエディタに挿入しました";

/// 生成表单的原始输入
#[derive(Debug, Clone, Default)]
pub struct ArticleForm {
    pub topic: String,
    /// 逗号分隔的关键词
    pub keywords: String,
    pub target_audience: String,
    pub word_count: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerateParams {
    pub topic: String,
    pub keywords: Vec<String>,
    pub target_audience: String,
    pub word_count: u32,
    pub tone: String,
}

impl GenerateParams {
    pub fn from_form(form: &ArticleForm, tone: &str) -> Result<Self, AssistError> {
        let word_count = parse_word_count(&form.word_count)
            .ok_or_else(|| AssistError::validation(INVALID_WORD_COUNT))?;
        Ok(Self {
            topic: form.topic.clone(),
            keywords: split_keywords(&form.keywords),
            target_audience: form.target_audience.clone(),
            word_count,
            tone: tone.to_string(),
        })
    }
}

/// 按逗号切分关键词，去掉首尾空白和空项
pub fn split_keywords(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_owned)
        .collect()
}

/// 取前导整数部分（"1500字" → 1500），没有数字时为 None
pub fn parse_word_count(raw: &str) -> Option<u32> {
    let s = raw.trim_start();
    let s = s.strip_prefix('+').unwrap_or(s);
    let digits: String = s.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GeneratedArticle {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub meta_description: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

impl GeneratedArticle {
    pub fn title(&self) -> Option<&str> {
        non_empty(&self.title)
    }

    pub fn content(&self) -> Option<&str> {
        non_empty(&self.content)
    }
}

#[derive(Debug, Deserialize)]
struct GenerateEnvelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<GeneratedArticle>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArticleState {
    Idle,
    PreviewShown,
    ErrorShown(String),
}

/// 文章生成模态框
#[derive(Debug, Default)]
pub struct ArticleModal {
    pub visible: bool,
    /// 生成结果区域是否展开
    pub result_visible: bool,
    pub preview_html: String,
    pending: Option<GeneratedArticle>,
}

impl ArticleModal {
    pub fn open(&mut self) {
        self.visible = true;
    }

    pub fn close(&mut self) {
        self.visible = false;
    }

    pub fn pending(&self) -> Option<&GeneratedArticle> {
        self.pending.as_ref()
    }

    /// 丢弃尚未插入的结果并收起结果区域
    pub fn discard(&mut self) {
        self.pending = None;
        self.result_visible = false;
    }

    /// 渲染生成结果，新结果总是替换旧结果；
    /// 没有标题的结果只显示错误提示，不可插入，返回 false
    pub fn show_result(&mut self, article: GeneratedArticle) -> bool {
        if article.title().is_none() {
            self.discard();
            self.preview_html = text_paragraph("text-danger", INVALID_RESULT);
            return false;
        }
        self.preview_html = render_article_preview(&article);
        self.result_visible = true;
        self.pending = Some(article);
        true
    }
}

/// 发送生成请求，只接受 `{success: true, data: {...}}`
pub async fn request_article<A: AdminApi>(
    api: &A,
    params: &GenerateParams,
) -> Result<GeneratedArticle, AssistError> {
    let body = serde_json::to_value(params)?;
    let value = api
        .call(Method::POST, endpoints::GENERATE_ARTICLE, Some(body))
        .await?
        .into_result(FALLBACK_ERROR)?;

    serde_json::from_value::<GenerateEnvelope>(value)
        .ok()
        .filter(|envelope| envelope.success)
        .and_then(|envelope| envelope.data)
        .ok_or_else(|| AssistError::shape(INVALID_RESULT))
}

/// 生成表单提交
pub async fn perform_generate<A: AdminApi>(
    api: &A,
    page: &mut AdminPage,
    form: &ArticleForm,
) -> ArticleState {
    let params = match GenerateParams::from_form(form, page.editor.tone()) {
        Ok(params) => params,
        Err(err) => {
            page.presenter.alert(err.to_string());
            return ArticleState::Idle;
        }
    };

    let result = {
        let _loading = page.loading.begin();
        request_article(api, &params).await
    };

    match result {
        Ok(article) => {
            if page.article_modal.show_result(article) {
                tracing::info!(topic = %params.topic, "文章生成完成");
                ArticleState::PreviewShown
            } else {
                tracing::warn!(topic = %params.topic, "生成结果缺少标题");
                ArticleState::ErrorShown(INVALID_RESULT.into())
            }
        }
        Err(err) => {
            page.article_modal.discard();
            alert_error(&mut page.presenter, &err);
            ArticleState::ErrorShown(err.to_string())
        }
    }
}

/// 把生成结果写入标题和正文，结果随即失效
pub fn insert_article(page: &mut AdminPage) -> bool {
    let Some(article) = page.article_modal.pending.take() else {
        return false;
    };
    if let Some(title) = article.title() {
        page.editor.set_title(title);
    }
    if let Some(content) = article.content() {
        page.editor.set_content(content);
    }
    page.article_modal.close();
    page.presenter.alert(INSERTED);
    true
}

pub fn render_article_preview(article: &GeneratedArticle) -> String {
    let mut html = format!("<h4>{}</h4>", html_escape(article.title().unwrap_or_default()));
    html.push_str(r#"<div class="article-content-preview">"#);
    match article.content() {
        Some(content) => html.push_str(&escape_with_breaks(content)),
        None => html.push_str(&text_paragraph("text-warning", MISSING_BODY)),
    }
    html.push_str("</div>");

    if let Some(meta) = non_empty(&article.meta_description) {
        html.push_str(r#"<div class="meta-info">"#);
        html.push_str(&format!(
            "<p><strong>メタディスクリプション:</strong> {}</p>",
            html_escape(meta)
        ));
        if let Some(tags) = article.tags.as_ref().filter(|t| !t.is_empty()) {
            let joined = tags
                .iter()
                .map(|t| html_escape(t))
                .collect::<Vec<_>>()
                .join(", ");
            html.push_str(&format!("<p><strong>推奨タグ:</strong> {joined}</p>"));
        }
        html.push_str("</div>");
    }
    html
}
