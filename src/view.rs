//! 后台编辑页的类型化视图模型
//!
//! 页面上被各工作流读写的元素都是这里的具名字段，在构造时确定，
//! 不在每次事件处理时按 id 临时查找

use tokio::sync::{mpsc, watch};

use crate::admin::slug::SlugForm;
use crate::assist::article::ArticleModal;
use crate::assist::proofread::DiffModal;
use crate::assist::settings::SettingsForm;
use crate::presenter::{LoadingOverlay, Presenter};

/// 文章编辑表单：标题字段（可选）、正文编辑区、语气选择
#[derive(Debug, Default)]
pub struct EditorForm {
    title: Option<String>,
    content: String,
    tone: Option<String>,
    preview_trigger: Option<mpsc::UnboundedSender<String>>,
}

impl EditorForm {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    /// 页面带有标题输入框
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// 页面带有语气选择框
    pub fn with_tone(mut self, tone: impl Into<String>) -> Self {
        self.tone = Some(tone.into());
        self
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn has_title_field(&self) -> bool {
        self.title.is_some()
    }

    /// 仅当页面有标题字段时写入
    pub fn set_title(&mut self, title: &str) -> bool {
        match self.title.as_mut() {
            Some(field) => {
                *field = title.to_string();
                true
            }
            None => false,
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// 写入正文并触发预览刷新
    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
        if let Some(tx) = &self.preview_trigger
            && tx.send(self.content.clone()).is_err()
        {
            tracing::debug!("预览任务已结束，解除关联");
            self.preview_trigger = None;
        }
    }

    /// 选中的语气，缺省为 formal
    pub fn tone(&self) -> &str {
        self.tone
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or(crate::assist::DEFAULT_TONE)
    }

    pub fn attach_preview(&mut self, trigger: mpsc::UnboundedSender<String>) {
        self.preview_trigger = Some(trigger);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modal {
    Diff,
    Article,
}

/// 一个后台页面上的全部可交互部件
#[derive(Debug, Default)]
pub struct AdminPage {
    pub editor: EditorForm,
    pub slug: SlugForm,
    pub diff_modal: DiffModal,
    pub article_modal: ArticleModal,
    pub settings: SettingsForm,
    pub presenter: Presenter,
    pub loading: LoadingOverlay,
    /// 预览区，由 `Previewer` 写入
    pub preview: Option<watch::Receiver<String>>,
}

impl AdminPage {
    pub fn new(editor: EditorForm) -> Self {
        Self {
            editor,
            ..Self::default()
        }
    }

    /// 当前预览区内容；未启用预览时为 None
    pub fn preview_html(&self) -> Option<String> {
        self.preview.as_ref().map(|rx| rx.borrow().clone())
    }

    /// 点击模态框背景时关闭该模态框
    pub fn click_backdrop(&mut self, modal: Modal) {
        match modal {
            Modal::Diff => self.diff_modal.close(),
            Modal::Article => self.article_modal.close(),
        }
    }
}
