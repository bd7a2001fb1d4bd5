use reqwest::Url;

use crate::presenter::{NoticeKind, Presenter};

/// 按优先级检查的 URL 参数及对应提示
const QUERY_TOASTS: [(&str, &str); 3] = [
    ("created", "投稿を作成しました"),
    ("updated", "投稿を更新しました"),
    ("deleted", "投稿を削除しました"),
];

/// 根据 query string 中的 created / updated / deleted 参数得到成功提示
///
/// 参数值必须非空；同时出现多个时只取优先级最高的一个
pub fn toast_for_query(query: &str) -> Option<&'static str> {
    let query = query.strip_prefix('?').unwrap_or(query);
    let pairs: Vec<(String, String)> = url_pairs(query);
    QUERY_TOASTS.iter().find_map(|(key, message)| {
        pairs
            .iter()
            .find(|(k, _)| k == key)
            .filter(|(_, v)| !v.is_empty())
            .map(|_| *message)
    })
}

fn url_pairs(query: &str) -> Vec<(String, String)> {
    // 借助 Url 的 form-urlencoded 解码
    match Url::parse(&format!("http://localhost/?{query}")) {
        Ok(url) => url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect(),
        Err(_) => Vec::new(),
    }
}

/// 页面加载时根据 URL 参数弹出成功通知
pub fn notify_from_url(url: &Url, presenter: &mut Presenter) -> bool {
    match url.query().and_then(toast_for_query) {
        Some(message) => {
            presenter.notify(message, NoticeKind::Success);
            true
        }
        None => false,
    }
}
