//! 后台页面片段的公共 HTML 工具

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// 转义后再把换行转成 `<br>`
pub fn escape_with_breaks(s: &str) -> String {
    html_escape(s).replace('\n', "<br>")
}

/// `<p class="{class}">{text}</p>`，text 会被转义
pub fn text_paragraph(class: &str, text: &str) -> String {
    format!(r#"<p class="{class}">{}</p>"#, html_escape(text))
}

/// 带样式的提示框，inner_html 原样插入
pub fn alert_box(kind: &str, inner_html: &str) -> String {
    format!(r#"<div class="alert alert-{kind}">{inner_html}</div>"#)
}
