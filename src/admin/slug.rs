use regex::Regex;
use std::sync::LazyLock;

// 仅保留 ASCII 单词字符、空白与连字符
static DISALLOWED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_\s-]").unwrap());

static SEPARATOR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\s_-]+").unwrap());

/// 由名称生成 slug
///
/// 小写化，去掉非 ASCII 单词字符，空白/下划线/连字符折叠为单个 `-`，去掉首尾 `-`
pub fn generate_slug(text: &str) -> String {
    let lowered = text.to_lowercase();
    let cleaned = DISALLOWED_RE.replace_all(lowered.trim(), "");
    let joined = SEPARATOR_RE.replace_all(&cleaned, "-");
    joined.trim_matches('-').to_string()
}

/// 名称字段与 slug 字段的联动
///
/// slug 为空或仍处于自动生成状态时，名称输入会重新生成 slug；
/// 用户手动输入非空 slug 后停止自动生成
#[derive(Debug, Clone, Default)]
pub struct SlugForm {
    pub name: String,
    pub slug: String,
    auto: Option<bool>,
}

impl SlugForm {
    pub fn new(name: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slug: slug.into(),
            auto: None,
        }
    }

    pub fn on_name_input(&mut self, name: &str) {
        self.name = name.to_string();
        if self.slug.is_empty() || self.auto != Some(false) {
            self.slug = generate_slug(name);
            self.auto = Some(true);
        }
    }

    pub fn on_slug_input(&mut self, slug: &str) {
        self.slug = slug.to_string();
        if !slug.is_empty() {
            self.auto = Some(false);
        }
    }

    pub fn is_auto(&self) -> bool {
        self.auto != Some(false)
    }
}
