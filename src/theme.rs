//! 默认主题：单篇文章、归档、侧边栏
//!
//! 模板随二进制嵌入，使用 MiniJinja 渲染（.html 模板自动转义）

use anyhow::{Context, Result};
use minijinja::{Environment, Value, context};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::config::{MenuItem, SiteConfig};
use crate::content::Post;
use crate::content::markdown::slugify;

const TEMPLATES: [(&str, &str); 6] = [
    ("base.html", include_str!("../themes/default/templates/base.html")),
    ("header.html", include_str!("../themes/default/templates/header.html")),
    ("sidebar.html", include_str!("../themes/default/templates/sidebar.html")),
    ("entry-footer.html", include_str!("../themes/default/templates/entry-footer.html")),
    ("single.html", include_str!("../themes/default/templates/single.html")),
    ("archive.html", include_str!("../themes/default/templates/archive.html")),
];

/// 侧边栏“最近の投稿”显示条数
const RECENT_POSTS: usize = 5;

#[derive(Debug, Clone, Serialize)]
struct SiteView {
    name: String,
    description: String,
    home_url: String,
    language: String,
    charset: &'static str,
    menu: Vec<MenuItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TermLink {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    pub slug: String,
    pub title: String,
    pub permalink: String,
    pub date: String,
    pub author: String,
    pub categories: Vec<TermLink>,
    pub tags: Vec<TermLink>,
    pub content_html: String,
    pub excerpt: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Sidebar {
    pub recent: Vec<TermLink>,
    pub categories: Vec<TermLink>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveKind {
    All,
    Category(String),
    Tag(String),
}

impl ArchiveKind {
    pub fn heading(&self) -> String {
        match self {
            Self::All => "アーカイブ".into(),
            Self::Category(name) => format!("カテゴリー: {name}"),
            Self::Tag(name) => format!("タグ: {name}"),
        }
    }
}

pub struct Theme {
    env: Environment<'static>,
    site: SiteView,
    date_format: String,
}

impl Theme {
    pub fn new(site: &SiteConfig) -> Result<Self> {
        let mut env = Environment::new();
        for (name, source) in TEMPLATES {
            env.add_template(name, source)
                .with_context(|| format!("注册主题模板 {name} 失败"))?;
        }
        let mut menu = site.menu.clone();
        if menu.is_empty() {
            menu.push(MenuItem {
                label: "ホーム".into(),
                url: home(&site.home_url).to_string(),
            });
        }
        Ok(Self {
            env,
            site: SiteView {
                name: site.name.clone(),
                description: site.description.clone(),
                home_url: home(&site.home_url).to_string(),
                language: site.language.clone(),
                charset: "UTF-8",
                menu,
            },
            date_format: site.date_format.clone(),
        })
    }

    pub fn permalink(&self, slug: &str) -> String {
        format!("{}/posts/{}/", self.site.home_url, slug)
    }

    fn term_link(&self, base: &str, name: &str) -> TermLink {
        TermLink {
            name: name.to_string(),
            url: format!("{}/{}/{}/", self.site.home_url, base, slugify(name)),
        }
    }

    pub fn post_view(&self, post: &Post) -> PostView {
        PostView {
            slug: post.slug.clone(),
            title: post.title.clone(),
            permalink: self.permalink(&post.slug),
            date: post.date.format(&self.date_format).to_string(),
            author: post.author.clone(),
            categories: post.categories.iter().map(|c| self.term_link("category", c)).collect(),
            tags: post.tags.iter().map(|t| self.term_link("tags", t)).collect(),
            content_html: post.content_html.clone(),
            excerpt: post.excerpt.clone(),
        }
    }

    /// 最近文章（输入已按日期倒序）与去重后的分类
    pub fn sidebar(&self, posts: &[Post]) -> Sidebar {
        let recent = posts
            .iter()
            .take(RECENT_POSTS)
            .map(|p| TermLink {
                name: p.title.clone(),
                url: self.permalink(&p.slug),
            })
            .collect();
        let mut names: Vec<&str> = posts
            .iter()
            .flat_map(|p| p.categories.iter().map(String::as_str))
            .collect();
        names.sort_unstable();
        names.dedup();
        let categories = names
            .into_iter()
            .map(|name| self.term_link("category", name))
            .collect();
        Sidebar { recent, categories }
    }

    pub fn render_single(&self, post: Option<&Post>, sidebar: &Sidebar) -> Result<String> {
        let ctx = context! {
            site => &self.site,
            sidebar => sidebar,
            post => post.map(|p| self.post_view(p)),
        };
        self.render("single.html", ctx)
    }

    pub fn render_archive(&self, kind: &ArchiveKind, posts: &[&Post], sidebar: &Sidebar) -> Result<String> {
        let views: Vec<PostView> = posts.iter().map(|p| self.post_view(p)).collect();
        let ctx = context! {
            site => &self.site,
            sidebar => sidebar,
            heading => kind.heading(),
            posts => views,
        };
        self.render("archive.html", ctx)
    }

    fn render(&self, name: &str, ctx: Value) -> Result<String> {
        let tmpl = self.env.get_template(name)?;
        tmpl.render(ctx)
            .with_context(|| format!("渲染主题模板 {name} 失败"))
    }
}

fn home(url: &str) -> &str {
    url.trim_end_matches('/')
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub posts: usize,
    pub archives: usize,
}

/// 输出全部文章页与首页、分类、标签归档页
pub fn render_site(theme: &Theme, posts: &[Post], out_dir: &Path) -> Result<RenderStats> {
    let sidebar = theme.sidebar(posts);
    let mut stats = RenderStats::default();

    for post in posts {
        let html = theme.render_single(Some(post), &sidebar)?;
        write_page(&out_dir.join("posts").join(&post.slug), &html)?;
        stats.posts += 1;
    }

    let all: Vec<&Post> = posts.iter().collect();
    write_page(out_dir, &theme.render_archive(&ArchiveKind::All, &all, &sidebar)?)?;
    stats.archives += 1;

    let mut by_category: BTreeMap<&str, Vec<&Post>> = BTreeMap::new();
    let mut by_tag: BTreeMap<&str, Vec<&Post>> = BTreeMap::new();
    for post in posts {
        for category in &post.categories {
            by_category.entry(category).or_default().push(post);
        }
        for tag in &post.tags {
            by_tag.entry(tag).or_default().push(post);
        }
    }
    for (name, list) in by_category {
        let html = theme.render_archive(&ArchiveKind::Category(name.to_string()), &list, &sidebar)?;
        write_page(&out_dir.join("category").join(slugify(name)), &html)?;
        stats.archives += 1;
    }
    for (name, list) in by_tag {
        let html = theme.render_archive(&ArchiveKind::Tag(name.to_string()), &list, &sidebar)?;
        write_page(&out_dir.join("tags").join(slugify(name)), &html)?;
        stats.archives += 1;
    }

    tracing::info!(posts = stats.posts, archives = stats.archives, "主题页面渲染完成");
    Ok(stats)
}

fn write_page(dir: &Path, html: &str) -> Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("创建目录 {} 失败", dir.display()))?;
    let path = dir.join("index.html");
    std::fs::write(&path, html).with_context(|| format!("写入 {} 失败", path.display()))
}
