use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::DEFAULT_TONE;
use crate::admin::confirm::Confirm;
use crate::admin::layout::{alert_box, html_escape, text_paragraph};
use crate::client::{AdminApi, endpoints};
use crate::error::AssistError;
use crate::view::AdminPage;

pub const DEFAULT_TARGET_AUDIENCE: &str = "中級者";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

const SAVED: &str = "AI設定を保存しました";
const KEY_SAVE_FAILED: &str = "APIキーの保存に失敗しました";
const PREFS_SAVE_FAILED: &str = "設定の保存に失敗しました";
const KEY_REQUIRED: &str = "APIキーを入力してください";
const RESET_CONFIRM: &str = "プロンプトをデフォルトに戻しますか？";
const LOAD_FAILED: &str = "AI設定の読み込みに失敗したため保存を中止しました";
const BAD_RESPONSE: &str = "レスポンスの解析に失敗しました";

/// 保存到服务端的 AI 偏好
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AiPreferences {
    pub default_tone: String,
    pub default_target_audience: String,
    pub auto_proofread: bool,
    pub proofread_prompt: String,
    pub generate_article_prompt: String,
    pub model: String,
}

/// 服务端返回的偏好，任何字段都可能缺失或为 null
#[derive(Debug, Default, Deserialize)]
struct StoredPreferences {
    default_tone: Option<String>,
    default_target_audience: Option<String>,
    auto_proofread: Option<bool>,
    proofread_prompt: Option<String>,
    generate_article_prompt: Option<String>,
    model: Option<String>,
}

/// AI 设置表单
#[derive(Debug, Clone)]
pub struct SettingsForm {
    pub default_tone: String,
    pub default_target_audience: String,
    pub auto_proofread: bool,
    pub proofread_prompt: String,
    pub generate_article_prompt: String,
    pub model: String,
    pub api_key: String,
    /// 连接测试结果区域
    pub api_test_result: String,
    /// 模型选择提示区域
    pub model_warning: Option<String>,
}

impl Default for SettingsForm {
    fn default() -> Self {
        Self {
            default_tone: DEFAULT_TONE.into(),
            default_target_audience: DEFAULT_TARGET_AUDIENCE.into(),
            auto_proofread: false,
            proofread_prompt: String::new(),
            generate_article_prompt: String::new(),
            model: DEFAULT_MODEL.into(),
            api_key: String::new(),
            api_test_result: String::new(),
            model_warning: None,
        }
    }
}

impl SettingsForm {
    pub fn preferences(&self) -> AiPreferences {
        AiPreferences {
            default_tone: self.default_tone.clone(),
            default_target_audience: self.default_target_audience.clone(),
            auto_proofread: self.auto_proofread,
            proofread_prompt: self.proofread_prompt.clone(),
            generate_article_prompt: self.generate_article_prompt.clone(),
            model: self.model.clone(),
        }
    }

    /// 缺失字段回落到默认值；未提供模型时保留当前选择
    fn fill(&mut self, stored: StoredPreferences) {
        fn or_default(value: Option<String>, default: &str) -> String {
            value
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        }
        self.default_tone = or_default(stored.default_tone, DEFAULT_TONE);
        self.default_target_audience =
            or_default(stored.default_target_audience, DEFAULT_TARGET_AUDIENCE);
        self.auto_proofread = stored.auto_proofread.unwrap_or(false);
        self.proofread_prompt = stored.proofread_prompt.unwrap_or_default();
        self.generate_article_prompt = stored.generate_article_prompt.unwrap_or_default();
        if let Some(model) = stored.model.filter(|m| !m.is_empty()) {
            self.model = model;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelTier {
    /// 名称含 "pro"，建议付费计划
    Paid,
    Free,
}

impl ModelTier {
    pub fn classify(model: &str) -> Self {
        if model.contains("pro") {
            Self::Paid
        } else {
            Self::Free
        }
    }

    pub fn banner_html(self) -> String {
        match self {
            Self::Paid => alert_box(
                "warning",
                "⚠️ Proモデルは有料プランが推奨されます。無料プランでは利用制限がある場合があります。",
            ),
            Self::Free => alert_box("success", "✓ 無料プランでも安心してご利用いただけます。"),
        }
    }
}

/// 模型选择变化时更新提示
pub fn on_model_change(form: &mut SettingsForm, model: &str) -> ModelTier {
    form.model = model.to_string();
    let tier = ModelTier::classify(model);
    form.model_warning = Some(tier.banner_html());
    tier
}

async fn fetch_preferences<A: AdminApi>(api: &A) -> Result<Option<StoredPreferences>, AssistError> {
    let resp = api.call(Method::GET, endpoints::AI_PREFERENCES, None).await?;
    if !resp.is_success() {
        tracing::warn!(status = %resp.status, "读取 AI 设置失败");
        return Ok(None);
    }
    let prefs = resp
        .body
        .get("data")
        .and_then(|d| d.get("ai_preferences"))
        .filter(|p| p.is_object())
        .cloned();
    match prefs {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}

/// 读取 AI 设置填入表单；失败只记录日志，不打断页面
pub async fn load_settings<A: AdminApi>(api: &A, page: &mut AdminPage) -> bool {
    match fetch_preferences(api).await {
        Ok(Some(stored)) => {
            page.settings.fill(stored);
            true
        }
        Ok(None) => false,
        Err(err) => {
            tracing::error!("AI 设置读取失败：{err}");
            false
        }
    }
}

/// 保存：API key 非空时先保存 key，再保存偏好；任一步失败立即返回
pub async fn save_settings<A: AdminApi>(api: &A, form: &SettingsForm) -> Result<(), AssistError> {
    if !form.api_key.is_empty() {
        api.call(
            Method::POST,
            endpoints::GEMINI_API_KEY,
            Some(json!({ "api_key": form.api_key })),
        )
        .await?
        .into_result(KEY_SAVE_FAILED)?;
    }

    let body = json!({ "ai_preferences": form.preferences() });
    api.call(Method::PUT, endpoints::AI_PREFERENCES, Some(body))
        .await?
        .into_result(PREFS_SAVE_FAILED)?;
    Ok(())
}

/// 设置表单提交；成功后清空 key 输入框
pub async fn submit_settings<A: AdminApi>(api: &A, page: &mut AdminPage) -> bool {
    match save_settings(api, &page.settings).await {
        Ok(()) => {
            page.settings.api_key.clear();
            page.presenter.alert(SAVED);
            true
        }
        Err(err) => {
            super::alert_error(&mut page.presenter, &err);
            false
        }
    }
}

/// 读取服务端设置后再修改、保存；读取失败时中止，不用默认值覆盖已保存的设置
pub async fn update_settings<A: AdminApi>(
    api: &A,
    page: &mut AdminPage,
    edit: impl FnOnce(&mut SettingsForm),
) -> Result<(), AssistError> {
    if !load_settings(api, page).await {
        return Err(AssistError::validation(LOAD_FAILED));
    }
    edit(&mut page.settings);
    save_settings(api, &page.settings).await?;
    page.settings.api_key.clear();
    page.presenter.alert(SAVED);
    Ok(())
}

/// API 连接测试，结果写入内联区域，不修改已保存的设置
pub async fn test_connection<A: AdminApi>(api: &A, page: &mut AdminPage) -> Option<bool> {
    if page.settings.api_key.is_empty() {
        page.presenter.alert(KEY_REQUIRED);
        return None;
    }
    page.settings.api_test_result = "<p>接続テスト中...</p>".into();

    let body = json!({ "api_key": page.settings.api_key });
    let (ok, html) = match api.call(Method::POST, endpoints::TEST_CONNECTION, Some(body)).await {
        Ok(resp) if resp.is_success() && !resp.body.is_null() => {
            (true, text_paragraph("text-success", "✓ 接続成功！"))
        }
        // 2xx 但响应体不是 JSON
        Ok(resp) if resp.is_success() => (
            false,
            format!(r#"<p class="text-danger">✗ エラー: {}</p>"#, html_escape(BAD_RESPONSE)),
        ),
        Ok(resp) => {
            let message = resp.error_message().unwrap_or_default();
            (
                false,
                format!(r#"<p class="text-danger">✗ 接続失敗: {}</p>"#, html_escape(message)),
            )
        }
        Err(err) => (
            false,
            format!(r#"<p class="text-danger">✗ エラー: {}</p>"#, html_escape(&err.to_string())),
        ),
    };
    tracing::info!(ok, "API 连接测试完成");
    page.settings.api_test_result = html;
    Some(ok)
}

/// 将提示词恢复为服务端保存的内容
pub async fn reset_prompts<A: AdminApi>(api: &A, page: &mut AdminPage, confirm: &impl Confirm) -> bool {
    if !confirm.confirm(RESET_CONFIRM) {
        return false;
    }
    load_settings(api, page).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::FakeApi;

    fn page_with_key(key: &str) -> AdminPage {
        let mut page = AdminPage::default();
        page.settings.api_key = key.into();
        page
    }

    #[tokio::test]
    async fn load_fills_defaults_for_missing_fields() {
        let api = FakeApi::new();
        api.respond(
            endpoints::AI_PREFERENCES,
            200,
            json!({ "data": { "ai_preferences": {
                "default_tone": "",
                "proofread_prompt": "丁寧に",
                "auto_proofread": null,
            }}}),
        );
        let mut page = AdminPage::default();
        page.settings.model = "gemini-2.5-pro".into();

        assert!(load_settings(&api, &mut page).await);

        let s = &page.settings;
        assert_eq!(s.default_tone, "formal");
        assert_eq!(s.default_target_audience, "中級者");
        assert!(!s.auto_proofread);
        assert_eq!(s.proofread_prompt, "丁寧に");
        assert_eq!(s.generate_article_prompt, "");
        // 未返回模型时保留选择框当前值
        assert_eq!(s.model, "gemini-2.5-pro");
    }

    #[tokio::test]
    async fn load_uses_stored_model() {
        let api = FakeApi::new();
        api.respond(
            endpoints::AI_PREFERENCES,
            200,
            json!({ "data": { "ai_preferences": { "model": "gemini-2.0-flash", "auto_proofread": true }}}),
        );
        let mut page = AdminPage::default();

        load_settings(&api, &mut page).await;
        assert_eq!(page.settings.model, "gemini-2.0-flash");
        assert!(page.settings.auto_proofread);
    }

    #[tokio::test]
    async fn load_failure_leaves_form_untouched() {
        let api = FakeApi::new();
        api.respond(endpoints::AI_PREFERENCES, 500, json!({ "error": "db" }));
        let mut page = AdminPage::default();
        page.settings.proofread_prompt = "手元".into();

        assert!(!load_settings(&api, &mut page).await);
        assert_eq!(page.settings.proofread_prompt, "手元");
        assert!(page.presenter.alerts().is_empty());
    }

    #[tokio::test]
    async fn empty_key_saves_preferences_only() {
        let api = FakeApi::new();
        api.respond(endpoints::AI_PREFERENCES, 200, json!({}));
        let mut page = page_with_key("");

        assert!(submit_settings(&api, &mut page).await);

        let calls = api.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, Method::PUT);
        assert_eq!(calls[0].path, endpoints::AI_PREFERENCES);
        assert_eq!(
            calls[0].body.as_ref().unwrap()["ai_preferences"]["model"],
            "gemini-2.5-flash"
        );
        assert_eq!(page.presenter.last_alert(), Some("AI設定を保存しました"));
    }

    #[tokio::test]
    async fn key_is_saved_first_and_then_cleared() {
        let api = FakeApi::new();
        api.respond(endpoints::GEMINI_API_KEY, 200, json!({}))
            .respond(endpoints::AI_PREFERENCES, 200, json!({}));
        let mut page = page_with_key("AIza-secret");

        assert!(submit_settings(&api, &mut page).await);

        let calls = api.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].path, endpoints::GEMINI_API_KEY);
        assert_eq!(calls[0].body, Some(json!({ "api_key": "AIza-secret" })));
        assert_eq!(calls[1].path, endpoints::AI_PREFERENCES);
        assert_eq!(page.settings.api_key, "");
    }

    #[tokio::test]
    async fn key_failure_aborts_before_preferences() {
        let api = FakeApi::new();
        api.respond(endpoints::GEMINI_API_KEY, 400, json!({}));
        let mut page = page_with_key("bad");

        assert!(!submit_settings(&api, &mut page).await);

        assert_eq!(api.calls().len(), 1);
        assert_eq!(page.presenter.last_alert(), Some("エラー: APIキーの保存に失敗しました"));
        // 失败时保留输入
        assert_eq!(page.settings.api_key, "bad");
    }

    #[tokio::test]
    async fn preference_failure_reports_server_message() {
        let api = FakeApi::new();
        api.respond(endpoints::AI_PREFERENCES, 422, json!({ "error": "モデル名が不正です" }));
        let mut page = page_with_key("");

        assert!(!submit_settings(&api, &mut page).await);
        assert_eq!(page.presenter.last_alert(), Some("エラー: モデル名が不正です"));
    }

    #[tokio::test]
    async fn connection_test_requires_key() {
        let api = FakeApi::new();
        let mut page = page_with_key("");

        assert_eq!(test_connection(&api, &mut page).await, None);
        assert!(api.calls().is_empty());
        assert_eq!(page.presenter.last_alert(), Some("APIキーを入力してください"));
    }

    #[tokio::test]
    async fn connection_test_reports_inline() {
        let api = FakeApi::new();
        api.respond(endpoints::TEST_CONNECTION, 200, json!({}));
        let mut page = page_with_key("k");
        assert_eq!(test_connection(&api, &mut page).await, Some(true));
        assert_eq!(page.settings.api_test_result, r#"<p class="text-success">✓ 接続成功！</p>"#);

        let api = FakeApi::new();
        api.respond(endpoints::TEST_CONNECTION, 401, json!({ "error": "<無効>" }));
        assert_eq!(test_connection(&api, &mut page).await, Some(false));
        assert_eq!(
            page.settings.api_test_result,
            r#"<p class="text-danger">✗ 接続失敗: &lt;無効&gt;</p>"#
        );
        // 连接测试不保存 key
        assert_eq!(api.calls().len(), 1);
        assert_eq!(page.settings.api_key, "k");
    }

    #[tokio::test]
    async fn connection_test_rejects_non_json_success() {
        let api = FakeApi::new();
        api.respond(endpoints::TEST_CONNECTION, 200, serde_json::Value::Null);
        let mut page = page_with_key("k");

        assert_eq!(test_connection(&api, &mut page).await, Some(false));
        assert_eq!(
            page.settings.api_test_result,
            r#"<p class="text-danger">✗ エラー: レスポンスの解析に失敗しました</p>"#
        );
    }

    #[tokio::test]
    async fn update_aborts_when_stored_settings_cannot_be_read() {
        let api = FakeApi::new();
        api.respond(endpoints::AI_PREFERENCES, 500, json!({ "error": "db" }));
        let mut page = AdminPage::default();

        let err = update_settings(&api, &mut page, |form| form.default_tone = "casual".into())
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "AI設定の読み込みに失敗したため保存を中止しました");
        let calls = api.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, Method::GET);
        assert!(page.presenter.alerts().is_empty());
    }

    #[tokio::test]
    async fn update_keeps_stored_fields_it_does_not_touch() {
        let api = FakeApi::new();
        api.respond(
            endpoints::AI_PREFERENCES,
            200,
            json!({ "data": { "ai_preferences": {
                "proofread_prompt": "丁寧に",
                "model": "gemini-2.5-pro",
                "auto_proofread": true,
            }}}),
        )
        .respond(endpoints::AI_PREFERENCES, 200, json!({ "success": true }));
        let mut page = AdminPage::default();

        update_settings(&api, &mut page, |form| form.default_tone = "casual".into())
            .await
            .unwrap();

        let calls = api.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].method, Method::PUT);
        let saved = &calls[1].body.as_ref().unwrap()["ai_preferences"];
        assert_eq!(saved["default_tone"], "casual");
        assert_eq!(saved["proofread_prompt"], "丁寧に");
        assert_eq!(saved["model"], "gemini-2.5-pro");
        assert_eq!(saved["auto_proofread"], true);
        assert_eq!(page.presenter.last_alert(), Some("AI設定を保存しました"));
    }

    #[test]
    fn model_banner_follows_pro_marker() {
        let mut form = SettingsForm::default();
        assert_eq!(on_model_change(&mut form, "gemini-2.5-pro"), ModelTier::Paid);
        assert!(form.model_warning.as_deref().unwrap().contains("alert-warning"));

        assert_eq!(on_model_change(&mut form, "gemini-2.5-flash"), ModelTier::Free);
        assert!(form.model_warning.as_deref().unwrap().contains("alert-success"));
        assert_eq!(form.model, "gemini-2.5-flash");
    }

    #[tokio::test]
    async fn reset_prompts_needs_confirmation() {
        let api = FakeApi::new();
        api.respond(
            endpoints::AI_PREFERENCES,
            200,
            json!({ "data": { "ai_preferences": { "proofread_prompt": "保存済み" }}}),
        );
        let mut page = AdminPage::default();
        page.settings.proofread_prompt = "編集中".into();

        assert!(!reset_prompts(&api, &mut page, &|_: &str| false).await);
        assert_eq!(page.settings.proofread_prompt, "編集中");

        assert!(reset_prompts(&api, &mut page, &|_: &str| true).await);
        assert_eq!(page.settings.proofread_prompt, "保存済み");
    }
}
