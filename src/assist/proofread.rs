use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::alert_error;
use crate::admin::layout::html_escape;
use crate::client::{AdminApi, endpoints};
use crate::error::AssistError;
use crate::view::AdminPage;

const EMPTY_CONTENT: &str = "記事の内容を入力してください";
const FALLBACK_ERROR: &str = "校正に失敗しました";
const APPLIED: &str = "校正結果を適用しました";

#[derive(Debug, Serialize)]
struct ProofreadRequest<'a> {
    content: &'a str,
    tone: &'a str,
}

/// 一条修改建议
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Suggestion {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub original_text: String,
    #[serde(default)]
    pub suggested_text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProofreadResult {
    #[serde(default)]
    pub original: String,
    #[serde(default)]
    pub corrected: String,
    #[serde(default)]
    pub suggestions: Option<Vec<Suggestion>>,
}

/// 建议列表中的一行，默认勾选
#[derive(Debug, Clone)]
pub struct SuggestionRow {
    pub suggestion: Suggestion,
    pub checked: bool,
}

/// 尚未应用的校对结果，由“全部应用”消费
#[derive(Debug, Clone)]
pub struct PendingCorrection {
    corrected: String,
    rows: Vec<SuggestionRow>,
}

impl PendingCorrection {
    pub fn new(result: ProofreadResult) -> Self {
        let rows = result
            .suggestions
            .unwrap_or_default()
            .into_iter()
            .map(|suggestion| SuggestionRow {
                suggestion,
                checked: true,
            })
            .collect();
        Self {
            corrected: result.corrected,
            rows,
        }
    }

    pub fn corrected(&self) -> &str {
        &self.corrected
    }

    pub fn rows(&self) -> &[SuggestionRow] {
        &self.rows
    }

    /// 切换某条建议的勾选状态；应用时仍使用完整的校对后正文
    pub fn toggle(&mut self, index: usize) -> Option<bool> {
        let row = self.rows.get_mut(index)?;
        row.checked = !row.checked;
        Some(row.checked)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProofreadState {
    Idle,
    DiffShown,
    ErrorShown(String),
}

/// 校对差异模态框
#[derive(Debug, Default)]
pub struct DiffModal {
    pub visible: bool,
    pub diff_html: String,
    pub suggestions_html: String,
    pending: Option<PendingCorrection>,
}

impl DiffModal {
    pub fn pending(&self) -> Option<&PendingCorrection> {
        self.pending.as_ref()
    }

    pub fn pending_mut(&mut self) -> Option<&mut PendingCorrection> {
        self.pending.as_mut()
    }

    fn show(&mut self, original: &str, pending: PendingCorrection) {
        self.diff_html = render_diff(original, pending.corrected());
        self.suggestions_html = render_suggestions(pending.rows());
        self.pending = Some(pending);
        self.visible = true;
    }

    /// 关闭 / 取消，未应用的结果一并丢弃
    pub fn close(&mut self) {
        self.visible = false;
        self.pending = None;
    }
}

/// 发送校对请求
pub async fn request_proofread<A: AdminApi>(
    api: &A,
    content: &str,
    tone: &str,
) -> Result<ProofreadResult, AssistError> {
    if content.trim().is_empty() {
        return Err(AssistError::validation(EMPTY_CONTENT));
    }
    let body = serde_json::to_value(ProofreadRequest { content, tone })?;
    let value = api
        .call(Method::POST, endpoints::PROOFREAD, Some(body))
        .await?
        .into_result(FALLBACK_ERROR)?;
    Ok(serde_json::from_value(value)?)
}

/// 校对按钮：校验正文 → 请求 → 展示差异或报错
pub async fn perform_proofread<A: AdminApi>(api: &A, page: &mut AdminPage) -> ProofreadState {
    let content = page.editor.content().to_string();
    if content.trim().is_empty() {
        page.presenter.alert(EMPTY_CONTENT);
        return ProofreadState::Idle;
    }

    let tone = page.editor.tone().to_string();
    let result = {
        let _loading = page.loading.begin();
        request_proofread(api, &content, &tone).await
    };

    match result {
        Ok(result) => {
            let original = result.original.clone();
            let pending = PendingCorrection::new(result);
            tracing::info!(suggestions = pending.rows().len(), "校对完成");
            page.diff_modal.show(&original, pending);
            ProofreadState::DiffShown
        }
        Err(err) => {
            alert_error(&mut page.presenter, &err);
            ProofreadState::ErrorShown(err.to_string())
        }
    }
}

/// “全部应用”：用校对后的正文替换编辑器内容，结果随即失效
pub fn apply_all(page: &mut AdminPage) -> bool {
    let Some(pending) = page.diff_modal.pending.take() else {
        return false;
    };
    page.editor.set_content(pending.corrected);
    page.diff_modal.close();
    page.presenter.alert(APPLIED);
    true
}

pub fn render_diff(original: &str, corrected: &str) -> String {
    format!(
        r#"<div class="diff-side-by-side">
    <div class="diff-column">
        <h4>元の本文</h4>
        <pre>{original}</pre>
    </div>
    <div class="diff-column">
        <h4>校正後の本文</h4>
        <pre>{corrected}</pre>
    </div>
</div>"#,
        original = html_escape(original),
        corrected = html_escape(corrected),
    )
}

pub fn render_suggestions(rows: &[SuggestionRow]) -> String {
    if rows.is_empty() {
        return String::new();
    }
    let mut html = String::from("<h4>修正提案</h4>");
    for (i, row) in rows.iter().enumerate() {
        let s = &row.suggestion;
        html.push_str(&format!(
            r#"<div class="suggestion-item">
    <input type="checkbox" id="suggestion-{i}"{checked} />
    <label for="suggestion-{i}">
        <strong>{kind}</strong>: {reason}<br>
        <span class="text-danger">- {original}</span><br>
        <span class="text-success">+ {suggested}</span>
    </label>
</div>"#,
            checked = if row.checked { " checked" } else { "" },
            kind = html_escape(&s.kind),
            reason = html_escape(&s.reason),
            original = html_escape(&s.original_text),
            suggested = html_escape(&s.suggested_text),
        ));
    }
    html
}
