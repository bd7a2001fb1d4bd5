//! 测试用的进程内 `AdminApi` 实现：按路径预设响应并记录每次调用

use reqwest::{Method, StatusCode};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use super::{AdminApi, ApiResponse};
use crate::error::AssistError;

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

struct Scripted {
    status: StatusCode,
    body: Value,
    delay: Duration,
}

#[derive(Default)]
pub struct FakeApi {
    calls: Mutex<Vec<RecordedCall>>,
    scripts: Mutex<HashMap<String, VecDeque<Scripted>>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// 为 path 追加一个响应，按调用顺序依次消费；最后一个会被重复使用
    pub fn respond(&self, path: &str, status: u16, body: Value) -> &Self {
        self.respond_after(path, status, body, Duration::ZERO)
    }

    pub fn respond_after(&self, path: &str, status: u16, body: Value, delay: Duration) -> &Self {
        let status = StatusCode::from_u16(status).expect("合法状态码");
        self.scripts
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .push_back(Scripted { status, body, delay });
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, path: &str) -> Vec<RecordedCall> {
        self.calls().into_iter().filter(|c| c.path == path).collect()
    }

    fn next_response(&self, path: &str) -> (ApiResponse, Duration) {
        let mut scripts = self.scripts.lock().unwrap();
        let Some(queue) = scripts.get_mut(path) else {
            return (
                ApiResponse::new(
                    StatusCode::NOT_FOUND,
                    serde_json::json!({ "error": format!("unscripted path {path}") }),
                ),
                Duration::ZERO,
            );
        };
        let scripted = if queue.len() > 1 {
            queue.pop_front().expect("非空队列")
        } else {
            let last = queue.front().expect("非空队列");
            Scripted {
                status: last.status,
                body: last.body.clone(),
                delay: last.delay,
            }
        };
        (ApiResponse::new(scripted.status, scripted.body), scripted.delay)
    }
}

impl AdminApi for FakeApi {
    async fn call(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<ApiResponse, AssistError> {
        self.calls.lock().unwrap().push(RecordedCall {
            method,
            path: path.to_string(),
            body,
        });
        let (resp, delay) = self.next_response(path);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(resp)
    }
}
