//! Markdown 实时预览
//!
//! 编辑触发经防抖后请求服务端渲染；每次刷新分配递增序号，
//! 只有最新序号的结果会写入预览区，较早请求的迟到响应被丢弃

use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::client::{AdminApi, endpoints};
use crate::error::AssistError;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

pub const PLACEHOLDER_EMPTY: &str =
    r#"<p class="text-muted">本文を入力するとプレビューが表示されます</p>"#;
pub const PLACEHOLDER_ERROR: &str =
    r#"<p class="text-danger">プレビューの読み込みに失敗しました</p>"#;

#[derive(Debug, Deserialize)]
struct PreviewResponse {
    #[serde(default)]
    html: String,
}

pub struct Previewer<A> {
    api: Arc<A>,
    latest: Arc<AtomicU64>,
    pane: Arc<watch::Sender<String>>,
}

impl<A> Clone for Previewer<A> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            latest: Arc::clone(&self.latest),
            pane: Arc::clone(&self.pane),
        }
    }
}

impl<A: AdminApi + 'static> Previewer<A> {
    /// 返回预览器与预览区内容的订阅端
    pub fn new(api: Arc<A>) -> (Self, watch::Receiver<String>) {
        let (tx, rx) = watch::channel(String::new());
        let previewer = Self {
            api,
            latest: Arc::new(AtomicU64::new(0)),
            pane: Arc::new(tx),
        };
        (previewer, rx)
    }

    /// 立即刷新一次
    ///
    /// 序号在调用时即分配，而不是在 future 首次被 poll 时
    pub fn refresh(&self, content: String) -> impl Future<Output = ()> + Send + use<A> {
        let seq = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        let this = self.clone();
        async move {
            let html = if content.trim().is_empty() {
                PLACEHOLDER_EMPTY.to_string()
            } else {
                match render_remote(this.api.as_ref(), &content).await {
                    Ok(html) => html,
                    Err(err) => {
                        tracing::error!("预览请求失败：{err}");
                        PLACEHOLDER_ERROR.to_string()
                    }
                }
            };
            this.apply(seq, html);
        }
    }

    fn apply(&self, seq: u64, html: String) {
        let latest = &self.latest;
        let applied = self.pane.send_if_modified(|pane| {
            if latest.load(Ordering::SeqCst) != seq {
                return false;
            }
            *pane = html;
            true
        });
        if !applied {
            tracing::debug!(seq, "丢弃过期的预览响应");
        }
    }

    /// 启动防抖任务，返回编辑触发端
    ///
    /// 每次触发都会重置计时，静默 interval 后以最后一次的内容刷新；
    /// 已发出的请求不会被取消
    pub fn spawn_debounced(&self, interval: Duration) -> (mpsc::UnboundedSender<String>, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let previewer = self.clone();
        let handle = tokio::spawn(async move {
            while let Some(mut content) = rx.recv().await {
                loop {
                    match tokio::time::timeout(interval, rx.recv()).await {
                        Ok(Some(next)) => content = next,
                        Ok(None) | Err(_) => break,
                    }
                }
                tokio::spawn(previewer.refresh(content));
            }
        });
        (tx, handle)
    }
}

async fn render_remote<A: AdminApi>(api: &A, content: &str) -> Result<String, AssistError> {
    let value = api
        .call(
            Method::POST,
            endpoints::PREVIEW_MARKDOWN,
            Some(json!({ "content": content })),
        )
        .await?
        .into_result("プレビューの取得に失敗しました")?;
    let resp: PreviewResponse = serde_json::from_value(value)?;
    Ok(resp.html)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::FakeApi;
    use crate::view::EditorForm;

    fn setup() -> (Arc<FakeApi>, Previewer<FakeApi>, watch::Receiver<String>) {
        let api = Arc::new(FakeApi::new());
        let (previewer, rx) = Previewer::new(Arc::clone(&api));
        (api, previewer, rx)
    }

    #[tokio::test]
    async fn empty_content_shows_placeholder_without_request() {
        let (api, previewer, rx) = setup();
        previewer.refresh("  \n".into()).await;
        assert_eq!(*rx.borrow(), PLACEHOLDER_EMPTY);
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn server_html_is_inserted_verbatim() {
        let (api, previewer, rx) = setup();
        api.respond(endpoints::PREVIEW_MARKDOWN, 200, json!({ "html": "<h1>見出し</h1>" }));

        previewer.refresh("# 見出し".into()).await;

        assert_eq!(*rx.borrow(), "<h1>見出し</h1>");
        assert_eq!(
            api.calls()[0].body,
            Some(json!({ "content": "# 見出し" }))
        );
    }

    #[tokio::test]
    async fn failure_shows_error_placeholder() {
        let (api, previewer, rx) = setup();
        api.respond(endpoints::PREVIEW_MARKDOWN, 500, json!({}));
        previewer.refresh("text".into()).await;
        assert_eq!(*rx.borrow(), PLACEHOLDER_ERROR);
    }

    #[tokio::test(start_paused = true)]
    async fn burst_of_keystrokes_sends_one_request() {
        let (api, previewer, rx) = setup();
        api.respond(endpoints::PREVIEW_MARKDOWN, 200, json!({ "html": "<p>abcde</p>" }));
        let (trigger, _task) = previewer.spawn_debounced(DEFAULT_DEBOUNCE);

        let mut typed = String::new();
        for ch in "abcde".chars() {
            typed.push(ch);
            trigger.send(typed.clone()).unwrap();
            tokio::time::sleep(Duration::from_millis(80)).await;
        }
        assert!(api.calls().is_empty());

        tokio::time::sleep(Duration::from_millis(600)).await;

        let calls = api.calls_to(endpoints::PREVIEW_MARKDOWN);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].body, Some(json!({ "content": "abcde" })));
        assert_eq!(*rx.borrow(), "<p>abcde</p>");
    }

    #[tokio::test(start_paused = true)]
    async fn separated_edits_each_refresh() {
        let (api, previewer, _rx) = setup();
        api.respond(endpoints::PREVIEW_MARKDOWN, 200, json!({ "html": "" }));
        let (trigger, _task) = previewer.spawn_debounced(DEFAULT_DEBOUNCE);

        trigger.send("a".into()).unwrap();
        tokio::time::sleep(Duration::from_millis(700)).await;
        trigger.send("ab".into()).unwrap();
        tokio::time::sleep(Duration::from_millis(700)).await;

        assert_eq!(api.calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_response_does_not_overwrite_newer_one() {
        let (api, previewer, rx) = setup();
        api.respond_after(
            endpoints::PREVIEW_MARKDOWN,
            200,
            json!({ "html": "old" }),
            Duration::from_secs(2),
        )
        .respond_after(
            endpoints::PREVIEW_MARKDOWN,
            200,
            json!({ "html": "new" }),
            Duration::from_millis(10),
        );

        let first = previewer.refresh("old".into());
        let second = previewer.refresh("new".into());
        tokio::join!(first, second);

        assert_eq!(*rx.borrow(), "new");
    }

    #[tokio::test(start_paused = true)]
    async fn clearing_the_editor_supersedes_in_flight_request() {
        let (api, previewer, rx) = setup();
        api.respond_after(
            endpoints::PREVIEW_MARKDOWN,
            200,
            json!({ "html": "late" }),
            Duration::from_secs(1),
        );

        let pending = previewer.refresh("text".into());
        let cleared = previewer.refresh(String::new());
        tokio::join!(pending, cleared);

        assert_eq!(*rx.borrow(), PLACEHOLDER_EMPTY);
    }

    #[tokio::test(start_paused = true)]
    async fn editor_writes_feed_the_debouncer() {
        let (api, previewer, rx) = setup();
        api.respond(endpoints::PREVIEW_MARKDOWN, 200, json!({ "html": "<p>applied</p>" }));
        let (trigger, _task) = previewer.spawn_debounced(DEFAULT_DEBOUNCE);

        let mut editor = EditorForm::new("");
        editor.attach_preview(trigger);
        editor.set_content("applied");
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(*rx.borrow(), "<p>applied</p>");
    }
}
