//! AI 辅助写作工作流：校对、文章生成、AI 设置
//!
//! 每个工作流由一次用户操作触发，发出请求后根据结果更新页面；
//! 结果以显式的状态值交给后续的“应用 / 插入”操作，使用后即失效

pub mod article;
pub mod proofread;
pub mod settings;

use crate::error::AssistError;
use crate::presenter::Presenter;

pub const DEFAULT_TONE: &str = "formal";

/// 以阻塞提示的形式报告工作流错误
fn alert_error(presenter: &mut Presenter, err: &AssistError) {
    tracing::warn!("AI 辅助请求失败：{err}");
    presenter.alert(format!("エラー: {err}"));
}
