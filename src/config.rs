use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

pub const CONFIG_FILE: &str = "aidiary.toml";

#[derive(Debug, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub editor: EditorConfig,
    #[serde(default)]
    pub preview: PreviewConfig,
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// 后台服务地址
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// 固定的 CSRF token，为空时从 token_page 读取
    #[serde(default)]
    pub csrf_token: String,
    /// 含有 `<meta name="csrf-token">` 的后台页面
    #[serde(default = "default_token_page")]
    pub token_page: String,
}

#[derive(Debug, Deserialize)]
pub struct EditorConfig {
    #[serde(default = "default_tone")]
    pub default_tone: String,
}

#[derive(Debug, Deserialize)]
pub struct PreviewConfig {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// 预览 HTML 输出文件
    #[serde(default = "default_preview_output")]
    pub output: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    #[serde(default = "default_site_name")]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_base_url")]
    pub home_url: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub author: String,
    #[serde(default = "default_date_format")]
    pub date_format: String,
    #[serde(default = "default_excerpt_length")]
    pub excerpt_length: usize,
    #[serde(default)]
    pub menu: Vec<MenuItem>,
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct MenuItem {
    pub label: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl AppConfig {
    /// 读取项目根目录下的 aidiary.toml，文件不存在时使用默认配置
    pub fn load(project_root: &Path) -> Result<Self> {
        let config_path = project_root.join(CONFIG_FILE);
        if !config_path.exists() {
            tracing::debug!("{} 不存在，使用默认配置", config_path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("读取 {} 失败", config_path.display()))?;
        Self::parse(&content).with_context(|| format!("解析 {} 失败", config_path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

// 默认值函数
fn default_base_url() -> String { "http://127.0.0.1:3000".into() }
fn default_token_page() -> String { "/admin".into() }
fn default_tone() -> String { crate::assist::DEFAULT_TONE.into() }
fn default_debounce_ms() -> u64 { 500 }
fn default_preview_output() -> String { "preview.html".into() }
fn default_site_name() -> String { "My Blog".into() }
fn default_language() -> String { "ja".into() }
fn default_date_format() -> String { "%Y年%m月%d日".into() }
fn default_excerpt_length() -> usize { 160 }
fn default_log_level() -> String { "info".into() }

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            csrf_token: String::new(),
            token_page: default_token_page(),
        }
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            default_tone: default_tone(),
        }
    }
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            output: default_preview_output(),
        }
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: default_site_name(),
            description: String::new(),
            home_url: default_base_url(),
            language: default_language(),
            author: String::new(),
            date_format: default_date_format(),
            excerpt_length: default_excerpt_length(),
            menu: Vec::new(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = AppConfig::parse("").unwrap();
        assert_eq!(config.api.base_url, "http://127.0.0.1:3000");
        assert_eq!(config.api.token_page, "/admin");
        assert_eq!(config.editor.default_tone, "formal");
        assert_eq!(config.preview.debounce_ms, 500);
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = AppConfig::parse(
            r#"
[api]
base_url = "https://blog.example.com"

[site]
name = "AI日記"

[[site.menu]]
label = "ホーム"
url = "/"
"#,
        )
        .unwrap();
        assert_eq!(config.api.base_url, "https://blog.example.com");
        assert_eq!(config.api.csrf_token, "");
        assert_eq!(config.site.name, "AI日記");
        assert_eq!(config.site.language, "ja");
        assert_eq!(config.site.menu.len(), 1);
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(dir.path()).unwrap();
        assert_eq!(config.preview.output, "preview.html");
    }

    #[test]
    fn invalid_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "[api\n").unwrap();
        let err = AppConfig::load(dir.path()).unwrap_err();
        assert!(format!("{err:#}").contains(CONFIG_FILE));
    }
}
