use std::io::{BufRead, Write};

pub const DELETE_CONFIRM_MESSAGE: &str = "本当に削除しますか？この操作は取り消せません。";

/// 阻塞式确认对话框
pub trait Confirm {
    fn confirm(&self, message: &str) -> bool;
}

impl<F: Fn(&str) -> bool> Confirm for F {
    fn confirm(&self, message: &str) -> bool {
        self(message)
    }
}

/// 终端确认：读取一行，y / yes 视为确认
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, message: &str) -> bool {
        print!("{message} [y/N] ");
        let _ = std::io::stdout().flush();
        let mut line = String::new();
        if std::io::stdin().lock().read_line(&mut line).is_err() {
            return false;
        }
        matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submit {
    Proceed,
    Prevented,
}

/// action 中包含 `/delete` 的表单视为删除表单
pub fn is_delete_form(action: &str) -> bool {
    action.contains("/delete")
}

/// 拦截表单提交：删除表单需要确认，其余直接放行
pub fn intercept_submit(action: &str, confirm: &impl Confirm) -> Submit {
    if !is_delete_form(action) {
        return Submit::Proceed;
    }
    if confirm.confirm(DELETE_CONFIRM_MESSAGE) {
        Submit::Proceed
    } else {
        tracing::debug!(action, "删除已取消");
        Submit::Prevented
    }
}
