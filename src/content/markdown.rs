use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd, html};

/// 解析 Markdown 为 HTML
///
/// 开启表格、脚注、删除线、任务列表；标题自动带上锚点 id
pub fn render_markdown(source: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let mut events: Vec<Event> = Parser::new_ext(source, options).collect();
    assign_heading_ids(&mut events);

    let mut html_output = String::new();
    html::push_html(&mut html_output, events.into_iter());
    html_output
}

/// 为没有显式 id 的标题生成 id
fn assign_heading_ids(events: &mut [Event]) {
    let mut i = 0;
    while i < events.len() {
        if let Event::Start(Tag::Heading { id: None, .. }) = &events[i] {
            let mut text = String::new();
            for event in &events[i + 1..] {
                match event {
                    Event::End(TagEnd::Heading(_)) => break,
                    Event::Text(t) | Event::Code(t) => text.push_str(t),
                    _ => {}
                }
            }
            let anchor = slugify(&text);
            if !anchor.is_empty()
                && let Event::Start(Tag::Heading { id, .. }) = &mut events[i]
            {
                *id = Some(anchor.into());
            }
        }
        i += 1;
    }
}

/// 标题锚点与分类 URL 用的 slug，保留非 ASCII 字母数字
pub fn slugify(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
