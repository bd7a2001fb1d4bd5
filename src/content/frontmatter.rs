use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Default, Deserialize)]
pub struct RawFrontMatter {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub date: Option<String>,
    pub tags: Option<Vec<String>>,
    pub category: Option<String>,
    pub categories: Option<Vec<String>>,
    pub draft: Option<bool>,
    pub excerpt: Option<String>,
    pub author: Option<String>,
}

pub struct ParsedContent {
    pub front_matter: RawFrontMatter,
    pub body: String,
}

pub fn parse_file(path: &Path) -> Result<ParsedContent> {
    let content = std::fs::read_to_string(path)?;
    Ok(parse_content(&content))
}

/// 分离 Front Matter 和正文；没有或无法解析的 Front Matter 视为空
pub fn parse_content(content: &str) -> ParsedContent {
    let matter = gray_matter::Matter::<gray_matter::engine::YAML>::new();
    match matter.parse_with_struct::<RawFrontMatter>(content) {
        Some(parsed) => ParsedContent {
            front_matter: parsed.data,
            body: parsed.content,
        },
        None => ParsedContent {
            front_matter: RawFrontMatter::default(),
            body: matter.parse(content).content,
        },
    }
}

/// 去除 YYYY-MM-DD- 日期前缀和扩展名
pub fn slug_from_filename(filename: &str) -> String {
    let name = filename
        .trim_end_matches(".md")
        .trim_end_matches(".markdown");
    let bytes = name.as_bytes();
    let has_date_prefix = bytes.len() > 11
        && bytes[0..4].iter().all(u8::is_ascii_digit)
        && bytes[4] == b'-'
        && bytes[5..7].iter().all(u8::is_ascii_digit)
        && bytes[7] == b'-'
        && bytes[8..10].iter().all(u8::is_ascii_digit)
        && bytes[10] == b'-';
    if has_date_prefix {
        name[11..].to_string()
    } else {
        name.to_string()
    }
}

/// 支持 RFC 3339、不带时区的 ISO 8601、`YYYY-MM-DD`、`YYYY/MM/DD`
pub fn parse_date(date_str: &str) -> Result<DateTime<Utc>> {
    let s = date_str.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.to_utc());
    }
    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Ok(dt.and_utc());
    }
    for format in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(date) = chrono::NaiveDate::parse_from_str(s, format) {
            return Ok(date.and_time(chrono::NaiveTime::MIN).and_utc());
        }
    }
    anyhow::bail!("无法解析日期：{}", s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn splits_front_matter() {
        let parsed = parse_content("---\ntitle: こんにちは\ntags: [a, b]\n---\n本文です");
        assert_eq!(parsed.front_matter.title.as_deref(), Some("こんにちは"));
        assert_eq!(parsed.front_matter.tags.unwrap(), vec!["a", "b"]);
        assert_eq!(parsed.body.trim(), "本文です");
    }

    #[test]
    fn no_front_matter_is_all_body() {
        let parsed = parse_content("# 見出し\n本文");
        assert!(parsed.front_matter.title.is_none());
        assert!(parsed.body.contains("# 見出し"));
    }

    #[test]
    fn filename_slug() {
        assert_eq!(slug_from_filename("2024-03-05-hello.md"), "hello");
        assert_eq!(slug_from_filename("hello.markdown"), "hello");
        assert_eq!(slug_from_filename("2024-03-05.md"), "2024-03-05");
    }

    #[test]
    fn date_formats() {
        assert_eq!(parse_date("2024-01-15").unwrap().day(), 15);
        assert_eq!(parse_date("2024/01/15").unwrap().month(), 1);
        assert!(parse_date("2024-01-15T10:30:00+09:00").is_ok());
        assert!(parse_date("2024-01-15T10:30:00").is_ok());
        assert!(parse_date("昨日").is_err());
    }
}
