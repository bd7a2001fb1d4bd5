use regex::Regex;
use std::sync::LazyLock;

pub const CSRF_HEADER: &str = "X-CSRF-Token";
const META_NAME: &str = "csrf-token";

static META_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<meta\b[^>]*>").unwrap());

static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)([a-z_:-]+)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap()
});

/// 从后台页面 HTML 中读取 `<meta name="csrf-token" content="...">`
///
/// 属性顺序不限，取第一个匹配的 meta；content 为空视为不存在
pub fn extract_meta_token(html: &str) -> Option<String> {
    for tag in META_TAG_RE.find_iter(html) {
        let mut name = None;
        let mut content = None;
        for cap in ATTR_RE.captures_iter(tag.as_str()) {
            let value = cap.get(2).or_else(|| cap.get(3)).map(|m| m.as_str());
            match cap[1].to_ascii_lowercase().as_str() {
                "name" => name = value,
                "content" => content = value,
                _ => {}
            }
        }
        if name.is_some_and(|n| n.eq_ignore_ascii_case(META_NAME)) {
            return content.filter(|c| !c.is_empty()).map(str::to_owned);
        }
    }
    None
}
