//! 流水线进度事件，可序列化为SSE帧

use anyhow::Result;
use serde::Serialize;
use serde_json::{Value, json};
use std::future::Future;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

use crate::error::public_message;

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Status {
        stage: Option<String>,
        message: String,
        progress: Option<u8>,
    },
    Complete(Value),
    Error {
        error: String,
    },
}

impl ProgressEvent {
    pub fn status(stage: &str, message: impl Into<String>, progress: u8) -> Self {
        ProgressEvent::Status {
            stage: Some(stage.to_string()),
            message: message.into(),
            progress: Some(progress.min(100)),
        }
    }

    pub fn event_name(&self) -> &'static str {
        match self {
            ProgressEvent::Status { .. } => "status",
            ProgressEvent::Complete(_) => "complete",
            ProgressEvent::Error { .. } => "error",
        }
    }

    pub fn data(&self) -> Value {
        match self {
            ProgressEvent::Status {
                stage,
                message,
                progress,
            } => {
                let mut data = json!({ "message": message });
                if let Some(progress) = progress {
                    data["progress"] = json!(progress);
                }
                if let Some(stage) = stage {
                    data["stage"] = json!(stage);
                }
                data
            }
            ProgressEvent::Complete(value) => value.clone(),
            ProgressEvent::Error { error } => json!({ "error": error }),
        }
    }

    /// 格式化为 `event: ...\ndata: ...\n\n`
    pub fn to_sse(&self) -> String {
        format!("event: {}\ndata: {}\n\n", self.event_name(), self.data())
    }

    /// 结果或错误之后不会再有事件
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ProgressEvent::Status { .. })
    }
}

/// 进度上报器；未绑定通道时所有上报都是空操作
#[derive(Clone, Default)]
pub struct ProgressReporter {
    tx: Option<UnboundedSender<ProgressEvent>>,
}

impl ProgressReporter {
    pub fn silent() -> Self {
        Self::default()
    }

    pub fn channel() -> (Self, UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    pub fn emit(&self, event: ProgressEvent) {
        if let Some(tx) = &self.tx {
            // 接收端已关闭时忽略
            let _ = tx.send(event);
        }
    }

    pub fn status(&self, stage: &str, message: impl Into<String>, progress: u8) {
        self.emit(ProgressEvent::status(stage, message, progress));
    }

    pub fn complete<T: Serialize>(&self, result: &T) {
        match serde_json::to_value(result) {
            Ok(value) => self.emit(ProgressEvent::Complete(value)),
            Err(e) => self.error(format!("Failed to serialize result: {}", e)),
        }
    }

    pub fn error(&self, error: impl Into<String>) {
        self.emit(ProgressEvent::Error {
            error: error.into(),
        });
    }
}

/// 在后台任务中运行流水线，并把进度、结果或错误写入事件通道
pub fn spawn_streaming<F, Fut, T>(run: F) -> UnboundedReceiver<ProgressEvent>
where
    F: FnOnce(ProgressReporter) -> Fut + Send + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
    T: Serialize + Send + 'static,
{
    let (reporter, rx) = ProgressReporter::channel();
    tokio::spawn(async move {
        match run(reporter.clone()).await {
            Ok(result) => reporter.complete(&result),
            Err(e) => {
                tracing::error!("流水线执行失败: {:#}", e);
                reporter.error(public_message(&e));
            }
        }
    });
    rx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_sse_frame() {
        let event = ProgressEvent::status("scoping", "Extracting text", 15);
        let frame = event.to_sse();
        assert!(frame.starts_with("event: status\ndata: "));
        assert!(frame.ends_with("\n\n"));

        let data = event.data();
        assert_eq!(data["stage"], "scoping");
        assert_eq!(data["progress"], 15);
        assert_eq!(data["message"], "Extracting text");
    }

    #[test]
    fn test_error_and_complete_frames() {
        let err = ProgressEvent::Error {
            error: "boom".to_string(),
        };
        assert_eq!(err.to_sse(), "event: error\ndata: {\"error\":\"boom\"}\n\n");
        assert!(err.is_terminal());

        let done = ProgressEvent::Complete(json!({"status": "success"}));
        assert_eq!(
            done.to_sse(),
            "event: complete\ndata: {\"status\":\"success\"}\n\n"
        );
    }

    #[test]
    fn test_silent_reporter_is_noop() {
        let reporter = ProgressReporter::silent();
        reporter.status("x", "y", 10);
    }

    #[tokio::test]
    async fn test_spawn_streaming_success_and_failure() {
        let mut rx = spawn_streaming(|reporter| async move {
            reporter.status("work", "halfway", 50);
            Ok(json!({"answer": 42}))
        });
        let first = rx.recv().await.unwrap();
        assert_eq!(first.event_name(), "status");
        let last = rx.recv().await.unwrap();
        assert_eq!(last, ProgressEvent::Complete(json!({"answer": 42})));
        assert!(rx.recv().await.is_none());

        let mut rx = spawn_streaming(|_reporter| async move {
            Err::<Value, _>(crate::error::PipelineError::EmptyInput.into())
        });
        let last = rx.recv().await.unwrap();
        assert_eq!(
            last,
            ProgressEvent::Error {
                error: "input text is empty".to_string()
            }
        );
    }
}
