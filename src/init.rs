use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::config::CONFIG_FILE;

// 嵌入默认 aidiary.toml
const DEFAULT_CONFIG: &str = r#"[api]
base_url = "http://127.0.0.1:3000"
# 留空时从 token_page 的 <meta name="csrf-token"> 读取
csrf_token = ""
token_page = "/admin"

[editor]
default_tone = "formal"

[preview]
debounce_ms = 500
output = "preview.html"

[site]
name = "My Blog"
description = ""
home_url = "http://127.0.0.1:3000"
language = "ja"
author = ""

[log]
level = "info"
"#;

const SAMPLE_POST: &str = r#"---
title: はじめての投稿
date: 2024-01-01
categories:
  - お知らせ
tags:
  - はじめに
---

# はじめての投稿

`aidiary proofread content/posts/hello.md` で校正を試せます。
"#;

/// 检测项目是否已初始化，未初始化则写入默认配置与示例文章。
/// 返回 `true` 表示执行了初始化，`false` 表示已存在。
pub fn ensure_initialized(root: &Path) -> Result<bool> {
    let config_path = root.join(CONFIG_FILE);
    if config_path.exists() {
        return Ok(false);
    }

    let posts_dir = root.join("content/posts");
    fs::create_dir_all(&posts_dir)
        .with_context(|| format!("创建目录 {} 失败", posts_dir.display()))?;
    fs::write(&config_path, DEFAULT_CONFIG)
        .with_context(|| format!("写入 {} 失败", config_path.display()))?;

    let sample = posts_dir.join("hello.md");
    if !sample.exists() {
        fs::write(&sample, SAMPLE_POST)?;
    }
    Ok(true)
}
