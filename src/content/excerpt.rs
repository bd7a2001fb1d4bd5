/// 从 HTML 内容中提取纯文本摘要
///
/// 超长时优先在句末标点处截断，并追加省略号
pub fn extract_excerpt(html: &str, max_chars: usize) -> String {
    let plain = strip_html_tags(html);
    let chars: Vec<char> = plain.trim().chars().collect();
    if chars.len() <= max_chars {
        return chars.into_iter().collect();
    }

    let search_from = max_chars.saturating_sub(30);
    let end = (search_from..max_chars)
        .rev()
        .find(|&i| matches!(chars[i], '。' | '？' | '！' | '.' | '?' | '!'))
        .map(|i| i + 1)
        .unwrap_or(max_chars);

    let mut excerpt: String = chars[..end].iter().collect();
    excerpt.push('…');
    excerpt
}

/// 去除标签，解码常见实体，压缩连续空白
pub fn strip_html_tags(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => {
                in_tag = false;
                text.push(' ');
            }
            _ if !in_tag => text.push(ch),
            _ => {}
        }
    }

    let decoded = text
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&");

    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_kept() {
        assert_eq!(extract_excerpt("<p>短い &amp; 本文</p>", 160), "短い & 本文");
    }

    #[test]
    fn cuts_at_sentence_end() {
        let html = format!("<p>{}。{}</p>", "あ".repeat(50), "い".repeat(50));
        let excerpt = extract_excerpt(&html, 60);
        assert_eq!(excerpt, format!("{}。…", "あ".repeat(50)));
    }

    #[test]
    fn cuts_hard_without_punctuation() {
        let excerpt = extract_excerpt(&"x".repeat(100), 10);
        assert_eq!(excerpt, format!("{}…", "x".repeat(10)));
    }
}
