use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

mod admin;
mod assist;
mod client;
mod config;
mod content;
mod error;
mod init;
mod presenter;
mod preview;
mod theme;
mod view;

use admin::confirm::{Confirm, StdinConfirm, Submit};
use assist::article::{ArticleForm, ArticleState};
use assist::proofread::ProofreadState;
use client::ApiClient;
use config::AppConfig;
use view::{AdminPage, EditorForm};

#[derive(Parser)]
#[command(name = "aidiary", about = "博客后台 AI 辅助写作客户端", version = long_version())]
struct Cli {
    /// 项目根目录（默认当前目录）
    #[arg(short, long, global = true, default_value = ".")]
    root: PathBuf,

    /// 覆盖配置中的后台地址
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 写入默认配置与示例文章
    Init,

    /// 校对 Markdown 文件
    Proofread {
        file: PathBuf,

        /// 语气（formal / casual ...），默认取配置
        #[arg(long)]
        tone: Option<String>,

        /// 不询问，直接把校对结果写回文件
        #[arg(long)]
        apply: bool,
    },

    /// 生成文章草稿
    Generate {
        #[arg(long)]
        topic: String,

        /// 逗号分隔的关键词
        #[arg(long, default_value = "")]
        keywords: String,

        #[arg(long, default_value = assist::settings::DEFAULT_TARGET_AUDIENCE)]
        audience: String,

        #[arg(long, default_value = "1000")]
        words: String,

        #[arg(long)]
        tone: Option<String>,

        /// 把生成结果写入该文件（标题写入 front matter）
        #[arg(long)]
        insert: Option<PathBuf>,
    },

    /// AI 设置
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },

    /// 监听文件变化并输出 Markdown 预览
    Preview {
        file: PathBuf,

        /// 预览 HTML 输出路径，默认取配置
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// 提交删除表单（需确认）
    Delete {
        /// 表单 action，如 /admin/posts/42/delete
        action: String,
    },

    /// 由名称生成 slug
    Slug { text: String },

    /// 用默认主题渲染本地文章
    Render {
        /// 文章目录（默认 content/posts）
        #[arg(long)]
        posts: Option<PathBuf>,

        /// 输出目录
        #[arg(long, default_value = "public")]
        out: PathBuf,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    /// 显示服务端保存的 AI 设置
    Show,

    /// 修改并保存 AI 设置，未指定的字段保持不变
    Save {
        #[arg(long)]
        tone: Option<String>,

        #[arg(long)]
        audience: Option<String>,

        #[arg(long)]
        model: Option<String>,

        #[arg(long)]
        auto_proofread: Option<bool>,

        #[arg(long)]
        proofread_prompt: Option<String>,

        #[arg(long)]
        generate_prompt: Option<String>,

        /// 同时保存新的 Gemini API key
        #[arg(long)]
        api_key: Option<String>,
    },

    /// 测试 API key 是否可用
    Test {
        #[arg(long)]
        api_key: String,
    },

    /// 显示模型的计划提示
    Model { name: String },

    /// 将提示词恢复为服务端保存的内容
    Reset,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let root = cli.root.canonicalize().unwrap_or_else(|_| cli.root.clone());

    // 使用配置中的日志级别作为默认值，RUST_LOG 优先
    let default_level = AppConfig::load(&root)
        .ok()
        .map(|c| c.log.level)
        .unwrap_or_else(|| "info".to_string());

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&default_level)),
        )
        .init();

    match cli.command {
        Commands::Init => {
            if init::ensure_initialized(&root)? {
                tracing::info!("已初始化项目：{}", root.display());
            } else {
                tracing::info!("{} 已存在，跳过", config::CONFIG_FILE);
            }
            Ok(())
        }
        Commands::Slug { text } => {
            println!("{}", admin::slug::generate_slug(&text));
            Ok(())
        }
        Commands::Render { posts, out } => {
            let config = AppConfig::load(&root)?;
            let posts_dir = posts.unwrap_or_else(|| root.join("content/posts"));
            let posts = content::load_posts(&posts_dir, &config.site.author, config.site.excerpt_length)?;
            let theme = theme::Theme::new(&config.site)?;
            let out = if out.is_absolute() { out } else { root.join(out) };
            let stats = theme::render_site(&theme, &posts, &out)?;
            println!("{} 篇文章，{} 个归档页 → {}", stats.posts, stats.archives, out.display());
            Ok(())
        }
        command => {
            let mut config = AppConfig::load(&root)?;
            if let Some(base_url) = cli.base_url {
                config.api.base_url = base_url;
            }
            tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?
                .block_on(run_remote(command, config))
        }
    }
}

/// 需要连接后台的命令
async fn run_remote(command: Commands, config: AppConfig) -> anyhow::Result<()> {
    let api = ApiClient::connect(&config.api)
        .await
        .with_context(|| format!("连接后台 {} 失败", config.api.base_url))?;

    match command {
        Commands::Proofread { file, tone, apply } => {
            let tone = tone.unwrap_or(config.editor.default_tone);
            proofread(&api, &file, &tone, apply).await
        }
        Commands::Generate {
            topic,
            keywords,
            audience,
            words,
            tone,
            insert,
        } => {
            let form = ArticleForm {
                topic,
                keywords,
                target_audience: audience,
                word_count: words,
            };
            let tone = tone.unwrap_or(config.editor.default_tone);
            generate(&api, &form, &tone, insert.as_deref()).await
        }
        Commands::Settings { action } => settings(&api, action).await,
        Commands::Preview { file, out } => {
            let out = out.unwrap_or_else(|| PathBuf::from(&config.preview.output));
            let interval = Duration::from_millis(config.preview.debounce_ms);
            run_preview(api, &file, &out, interval).await
        }
        Commands::Delete { action } => delete(&api, &action).await,
        Commands::Init | Commands::Slug { .. } | Commands::Render { .. } => Ok(()),
    }
}

async fn proofread(api: &ApiClient, file: &Path, tone: &str, apply: bool) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("读取 {} 失败", file.display()))?;
    let mut page = AdminPage::new(EditorForm::new(content).with_tone(tone));

    let state = assist::proofread::perform_proofread(api, &mut page).await;
    if state != ProofreadState::DiffShown {
        flush_messages(&mut page);
        return Ok(());
    }

    if let Some(pending) = page.diff_modal.pending() {
        println!("{}\n", pending.corrected());
        println!("修正提案");
        for row in pending.rows() {
            let s = &row.suggestion;
            println!("- [{}] {} → {}（{}）", s.kind, s.original_text, s.suggested_text, s.reason);
        }
    }

    if apply || StdinConfirm.confirm("校正結果を適用しますか？") {
        assist::proofread::apply_all(&mut page);
        std::fs::write(file, page.editor.content())
            .with_context(|| format!("写入 {} 失败", file.display()))?;
    } else {
        page.diff_modal.close();
    }
    flush_messages(&mut page);
    Ok(())
}

async fn generate(
    api: &ApiClient,
    form: &ArticleForm,
    tone: &str,
    insert: Option<&Path>,
) -> anyhow::Result<()> {
    let mut page = AdminPage::new(EditorForm::new("").with_title("").with_tone(tone));
    page.article_modal.open();

    let state = assist::article::perform_generate(api, &mut page, form).await;
    if state != ArticleState::PreviewShown {
        flush_messages(&mut page);
        return Ok(());
    }
    println!("{}", content::excerpt::strip_html_tags(&page.article_modal.preview_html));

    if let Some(path) = insert
        && assist::article::insert_article(&mut page)
    {
        let title = page.editor.title().unwrap_or_default();
        let body = format!("---\ntitle: {title:?}\n---\n\n{}\n", page.editor.content());
        std::fs::write(path, body).with_context(|| format!("写入 {} 失败", path.display()))?;
    }
    flush_messages(&mut page);
    Ok(())
}

async fn settings(api: &ApiClient, action: SettingsAction) -> anyhow::Result<()> {
    let mut page = AdminPage::default();
    match action {
        SettingsAction::Show => {
            assist::settings::load_settings(api, &mut page).await;
            println!("{}", serde_json::to_string_pretty(&page.settings.preferences())?);
        }
        SettingsAction::Save {
            tone,
            audience,
            model,
            auto_proofread,
            proofread_prompt,
            generate_prompt,
            api_key,
        } => {
            let result = assist::settings::update_settings(api, &mut page, |form| {
                if let Some(tone) = tone {
                    form.default_tone = tone;
                }
                if let Some(audience) = audience {
                    form.default_target_audience = audience;
                }
                if let Some(model) = model {
                    assist::settings::on_model_change(form, &model);
                }
                if let Some(auto) = auto_proofread {
                    form.auto_proofread = auto;
                }
                if let Some(prompt) = proofread_prompt {
                    form.proofread_prompt = prompt;
                }
                if let Some(prompt) = generate_prompt {
                    form.generate_article_prompt = prompt;
                }
                form.api_key = api_key.unwrap_or_default();
            })
            .await;
            if let Some(banner) = &page.settings.model_warning {
                println!("{}", content::excerpt::strip_html_tags(banner));
            }
            flush_messages(&mut page);
            if let Err(err) = result {
                anyhow::bail!("エラー: {err}");
            }
        }
        SettingsAction::Test { api_key } => {
            page.settings.api_key = api_key;
            if assist::settings::test_connection(api, &mut page).await.is_some() {
                println!("{}", content::excerpt::strip_html_tags(&page.settings.api_test_result));
            }
        }
        SettingsAction::Model { name } => {
            assist::settings::on_model_change(&mut page.settings, &name);
            if let Some(banner) = &page.settings.model_warning {
                println!("{}", content::excerpt::strip_html_tags(banner));
            }
        }
        SettingsAction::Reset => {
            if assist::settings::reset_prompts(api, &mut page, &StdinConfirm).await {
                println!("{}", serde_json::to_string_pretty(&page.settings.preferences())?);
            }
        }
    }
    flush_messages(&mut page);
    Ok(())
}

async fn delete(api: &ApiClient, action: &str) -> anyhow::Result<()> {
    if admin::confirm::intercept_submit(action, &StdinConfirm) == Submit::Prevented {
        return Ok(());
    }
    let mut page = AdminPage::default();
    match api.submit_form(action).await {
        Ok(url) => {
            if !admin::query::notify_from_url(&url, &mut page.presenter) {
                tracing::info!("已提交：{url}");
            }
        }
        Err(err) => page.presenter.alert(format!("エラー: {err}")),
    }
    flush_messages(&mut page);
    Ok(())
}

/// 监听文件，内容变化经防抖后刷新预览并写入输出文件
async fn run_preview(api: ApiClient, file: &Path, out: &Path, interval: Duration) -> anyhow::Result<()> {
    use notify::{RecursiveMode, Watcher};

    let read = |path: &Path| {
        std::fs::read_to_string(path).with_context(|| format!("读取 {} 失败", path.display()))
    };

    let (previewer, pane) = preview::Previewer::new(Arc::new(api));
    let (trigger, debounce_task) = previewer.spawn_debounced(interval);
    let mut page = AdminPage::new(EditorForm::new(read(file)?));
    page.editor.attach_preview(trigger);
    page.preview = Some(pane.clone());

    // 首次渲染不经过防抖
    previewer.refresh(page.editor.content().to_string()).await;

    let out_path = out.to_path_buf();
    let mut pane_rx = pane;
    let writer = tokio::spawn(async move {
        loop {
            let html = pane_rx.borrow_and_update().clone();
            match std::fs::write(&out_path, html) {
                Ok(()) => tracing::info!("预览已更新：{}", out_path.display()),
                Err(err) => tracing::error!("写入预览失败：{err}"),
            }
            if pane_rx.changed().await.is_err() {
                break;
            }
        }
    });

    let (fs_tx, mut fs_rx) = tokio::sync::mpsc::unbounded_channel();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        if let Ok(event) = res
            && (event.kind.is_modify() || event.kind.is_create())
        {
            let _ = fs_tx.send(());
        }
    })?;
    watcher
        .watch(file, RecursiveMode::NonRecursive)
        .with_context(|| format!("监听 {} 失败", file.display()))?;
    tracing::info!("正在监听 {}，Ctrl+C 退出", file.display());

    loop {
        tokio::select! {
            Some(()) = fs_rx.recv() => match read(file) {
                Ok(content) if content != page.editor.content() => page.editor.set_content(content),
                Ok(_) => {}
                Err(err) => tracing::warn!("{err:#}"),
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    drop(watcher);
    drop(page);
    debounce_task.abort();
    writer.abort();
    Ok(())
}

/// 打印页面上积累的提示与通知
fn flush_messages(page: &mut AdminPage) {
    for alert in page.presenter.take_alerts() {
        println!("{alert}");
    }
    for notice in page.presenter.notices() {
        println!("[{}] {}", notice.kind.as_str(), notice.message);
    }
}

const fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        "\ncommit:  ",
        env!("AIDIARY_GIT_COMMIT"),
        "\nbuild:   ",
        env!("AIDIARY_BUILD_TIME"),
        "\ntarget:  ",
        env!("AIDIARY_BUILD_TARGET"),
        "\nprofile: ",
        env!("AIDIARY_BUILD_PROFILE"),
    )
}
