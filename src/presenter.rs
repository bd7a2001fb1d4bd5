use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use crate::admin::layout::html_escape;

/// 通知完全可见的时长
pub const NOTICE_VISIBLE: Duration = Duration::from_millis(3000);
/// 滑出动画时长，结束后通知被移除
pub const NOTICE_TRANSITION: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Danger,
    Warning,
    Info,
}

impl NoticeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Danger => "danger",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticePhase {
    Visible,
    Leaving,
    Gone,
}

#[derive(Debug, Clone)]
pub struct Notice {
    pub message: String,
    pub kind: NoticeKind,
    pub shown_at: Instant,
}

impl Notice {
    pub fn phase(&self, now: Instant) -> NoticePhase {
        let age = now.saturating_duration_since(self.shown_at);
        if age < NOTICE_VISIBLE {
            NoticePhase::Visible
        } else if age < NOTICE_VISIBLE + NOTICE_TRANSITION {
            NoticePhase::Leaving
        } else {
            NoticePhase::Gone
        }
    }

    pub fn to_html(&self) -> String {
        format!(
            r#"<div class="alert alert-{kind}">{message}</div>"#,
            kind = self.kind.as_str(),
            message = html_escape(&self.message),
        )
    }
}

/// 通知横幅与阻塞式提示
///
/// 多个通知直接堆叠，不去重也不排队
#[derive(Debug, Default)]
pub struct Presenter {
    notices: Vec<Notice>,
    alerts: Vec<String>,
}

impl Presenter {
    pub fn notify(&mut self, message: impl Into<String>, kind: NoticeKind) {
        self.notify_at(message, kind, Instant::now());
    }

    pub fn notify_at(&mut self, message: impl Into<String>, kind: NoticeKind, now: Instant) {
        let message = message.into();
        tracing::info!(kind = kind.as_str(), "{message}");
        self.notices.push(Notice {
            message,
            kind,
            shown_at: now,
        });
    }

    /// 阻塞式提示（对应浏览器 alert）
    pub fn alert(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!(target: "aidiary::alert", "{message}");
        self.alerts.push(message);
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    /// 尚未完全消失的通知
    pub fn visible(&self, now: Instant) -> impl Iterator<Item = &Notice> {
        self.notices
            .iter()
            .filter(move |n| n.phase(now) != NoticePhase::Gone)
    }

    pub fn prune(&mut self, now: Instant) {
        self.notices.retain(|n| n.phase(now) != NoticePhase::Gone);
    }

    pub fn alerts(&self) -> &[String] {
        &self.alerts
    }

    pub fn last_alert(&self) -> Option<&str> {
        self.alerts.last().map(String::as_str)
    }

    pub fn take_alerts(&mut self) -> Vec<String> {
        std::mem::take(&mut self.alerts)
    }
}

/// 共享的加载遮罩
///
/// 以进行中请求数计数，计数大于 0 时可见；多个请求并发时，
/// 只有最后一个完成后遮罩才会隐藏
#[derive(Debug, Clone, Default)]
pub struct LoadingOverlay {
    in_flight: Arc<AtomicUsize>,
}

impl LoadingOverlay {
    pub fn begin(&self) -> LoadingGuard {
        if self.in_flight.fetch_add(1, Ordering::SeqCst) == 0 {
            tracing::debug!("显示加载遮罩");
        }
        LoadingGuard {
            in_flight: Arc::clone(&self.in_flight),
        }
    }

    pub fn is_visible(&self) -> bool {
        self.in_flight() > 0
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

/// 释放时将进行中计数减一
#[derive(Debug)]
pub struct LoadingGuard {
    in_flight: Arc<AtomicUsize>,
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        if self.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            tracing::debug!("隐藏加载遮罩");
        }
    }
}
