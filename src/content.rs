pub mod excerpt;
pub mod frontmatter;
pub mod markdown;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::path::Path;

use crate::admin::slug::generate_slug;

/// 主题渲染用的文章
#[derive(Debug, Clone)]
pub struct Post {
    pub slug: String,
    pub title: String,
    pub date: DateTime<Utc>,
    pub author: String,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    pub content_html: String,
    pub excerpt: String,
}

/// 读取目录下所有 Markdown 文章，跳过草稿，按日期倒序
pub fn load_posts(dir: &Path, default_author: &str, excerpt_length: usize) -> Result<Vec<Post>> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("读取目录 {} 失败", dir.display()))? {
        let path = entry?.path();
        let is_markdown = path
            .extension()
            .is_some_and(|ext| ext == "md" || ext == "markdown");
        if is_markdown {
            paths.push(path);
        }
    }
    // 目录遍历顺序不固定，先按路径排序，保证重名 slug 的编号稳定
    paths.sort();

    let mut posts = Vec::new();
    for path in &paths {
        match load_post(path, default_author, excerpt_length)? {
            Some(post) => posts.push(post),
            None => tracing::debug!("跳过草稿 {}", path.display()),
        }
    }
    posts.sort_by(|a, b| b.date.cmp(&a.date));
    dedup_slugs(&mut posts);
    Ok(posts)
}

/// 重名 slug 依次追加 `-2`、`-3`…，最早的文章保留原 slug
fn dedup_slugs(posts: &mut [Post]) {
    let mut taken = HashSet::new();
    for post in posts.iter_mut().rev() {
        if taken.insert(post.slug.clone()) {
            continue;
        }
        let base = post.slug.clone();
        let mut n = 2;
        while !taken.insert(format!("{base}-{n}")) {
            n += 1;
        }
        tracing::warn!("slug {base} 重复，改为 {base}-{n}");
        post.slug = format!("{base}-{n}");
    }
}

/// ASCII slug 为空时（如日文文件名）退回保留 Unicode 的 slug
fn derive_slug(text: &str) -> String {
    let ascii = generate_slug(text);
    if !ascii.is_empty() {
        return ascii;
    }
    markdown::slugify(text)
}

fn load_post(path: &Path, default_author: &str, excerpt_length: usize) -> Result<Option<Post>> {
    let parsed = frontmatter::parse_file(path)
        .with_context(|| format!("解析文章 {} 失败", path.display()))?;
    let fm = parsed.front_matter;
    if fm.draft.unwrap_or(false) {
        return Ok(None);
    }

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let file_slug = frontmatter::slug_from_filename(&filename);
    let title = fm.title.unwrap_or_else(|| file_slug.clone());
    let slug = [fm.slug.as_deref(), Some(file_slug.as_str())]
        .into_iter()
        .flatten()
        .map(derive_slug)
        .find(|s| !s.is_empty())
        .unwrap_or_else(|| "post".to_string());

    let date = match fm.date.as_deref() {
        Some(s) => frontmatter::parse_date(s)?,
        None => file_modified(path).unwrap_or_else(Utc::now),
    };

    let content_html = markdown::render_markdown(&parsed.body);
    let excerpt = match fm.excerpt {
        Some(e) if !e.trim().is_empty() => e,
        _ => excerpt::extract_excerpt(&content_html, excerpt_length),
    };

    let mut categories = fm.categories.unwrap_or_default();
    if let Some(category) = fm.category {
        categories.insert(0, category);
    }

    Ok(Some(Post {
        slug,
        title,
        date,
        author: fm.author.unwrap_or_else(|| default_author.to_string()),
        categories,
        tags: fm.tags.unwrap_or_default(),
        content_html,
        excerpt,
    }))
}

fn file_modified(path: &Path) -> Option<DateTime<Utc>> {
    let modified = std::fs::metadata(path).ok()?.modified().ok()?;
    Some(modified.into())
}
