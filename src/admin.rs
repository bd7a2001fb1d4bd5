//! 后台页面通用交互：删除确认、slug 自动生成、URL 参数提示

pub mod confirm;
pub mod layout;
pub mod query;
pub mod slug;
