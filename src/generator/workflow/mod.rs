use crate::chat::ChatService;
use crate::cli::{ChatCommand, Command};
use crate::config::Config;
use crate::generator::context::GeneratorContext;
use crate::generator::outlet;
use crate::generator::pipelines::{self, FeasibilityRequest};
use crate::generator::progress::{ProgressEvent, ProgressReporter, spawn_streaming};
use crate::types::chat::ChatRequest;
use crate::types::output::{RoadmapOutput, ScopingOutput, SummaryOutput};
use crate::types::state::PipelineState;

use anyhow::{Context, Result, anyhow};
use serde_json::Value;
use std::collections::HashMap;
use std::io::{BufRead, Write};
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedReceiver;

/// 时间跟踪作用域
pub struct TimingScope {
    start_time: Instant,
    phase_start_times: HashMap<String, Instant>,
    phase_durations: Vec<(String, Duration)>,
}

impl Default for TimingScope {
    fn default() -> Self {
        Self::new()
    }
}

impl TimingScope {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            phase_start_times: HashMap::new(),
            phase_durations: Vec::new(),
        }
    }

    /// 开始一个新的阶段计时
    pub fn start_phase(&mut self, phase_name: &str) {
        self.phase_start_times
            .insert(phase_name.to_string(), Instant::now());
    }

    /// 结束一个阶段的计时
    pub fn end_phase(&mut self, phase_name: &str) -> Option<Duration> {
        let start_time = self.phase_start_times.remove(phase_name)?;
        let duration = start_time.elapsed();
        self.phase_durations
            .push((phase_name.to_string(), duration));
        Some(duration)
    }

    /// 获取格式化的执行时间报告
    pub fn generate_timing_report(&self) -> String {
        let mut report = format!(
            "总执行时间: {:.2}秒\n",
            self.start_time.elapsed().as_secs_f64()
        );

        if !self.phase_durations.is_empty() {
            report.push_str("\n各阶段执行时间:\n");
            for (phase, duration) in &self.phase_durations {
                report.push_str(&format!("- {}: {:.3}秒\n", phase, duration.as_secs_f64()));
            }
        }

        report
    }
}

/// 一次命令执行的结果：对外的JSON以及可落盘的流水线状态
pub struct CommandOutcome {
    pub result: Value,
    pub state: Option<PipelineState>,
}

impl CommandOutcome {
    fn new<T: serde::Serialize>(result: &T, state: Option<PipelineState>) -> Result<Self> {
        Ok(Self {
            result: serde_json::to_value(result)?,
            state,
        })
    }
}

fn command_label(command: &Command) -> &'static str {
    match command {
        Command::Roadmap { .. } => "文档路线图生成",
        Command::RoadmapSummary { .. } => "摘要路线图生成",
        Command::Feasibility { .. } => "可行性评估",
        Command::Summarize { .. } => "研究摘要",
        Command::Scope { .. } => "范围界定",
        Command::Chat { action } => match action {
            ChatCommand::Send { .. } => "对话",
            ChatCommand::Roadmap { .. } => "对话路线图生成",
            ChatCommand::List => "会话列表",
        },
    }
}

fn needs_model(command: &Command) -> bool {
    !matches!(
        command,
        Command::Chat {
            action: ChatCommand::List
        }
    )
}

/// 从标准输入读取一行补充信息，空行表示放弃
fn ask_on_stdin(question: &str) -> Option<String> {
    println!("\n❓ {}", question);
    print!("> ");
    let _ = std::io::stdout().flush();

    let mut line = String::new();
    match std::io::stdin().lock().read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line.trim().to_string()).filter(|l| !l.is_empty()),
    }
}

/// 执行单个命令
pub async fn execute(
    context: &GeneratorContext,
    command: Command,
    reporter: &ProgressReporter,
) -> Result<CommandOutcome> {
    match command {
        Command::Roadmap { file } => {
            let state = pipelines::roadmap_from_document(context, &file, reporter).await?;
            CommandOutcome::new(&RoadmapOutput::from_state(&state), Some(state))
        }
        Command::RoadmapSummary { text, file } => {
            let summary = match (text, file) {
                (Some(text), _) => text,
                (None, Some(path)) => tokio::fs::read_to_string(&path)
                    .await
                    .with_context(|| format!("Failed to read summary file: {}", path.display()))?,
                (None, None) => String::new(),
            };
            let state = pipelines::roadmap_from_summary(context, &summary, reporter).await?;
            CommandOutcome::new(&RoadmapOutput::from_state(&state), Some(state))
        }
        Command::Feasibility { summary, document } => {
            let state = match (summary, document) {
                (_, Some(path)) => {
                    pipelines::feasibility_from_document(context, &path, reporter).await?
                }
                (summary, None) => {
                    let request = FeasibilityRequest {
                        summary: summary.unwrap_or_default(),
                        fields: None,
                    };
                    pipelines::feasibility_from_summary(context, request, reporter).await?
                }
            };
            let report = pipelines::feasibility_output(&state)?;
            CommandOutcome::new(&report, Some(state))
        }
        Command::Summarize { text, file } => {
            let state = match file {
                Some(path) => pipelines::summarize_file(context, &path).await?,
                None => pipelines::summarize_text(context, &text.unwrap_or_default()).await?,
            };
            let output = SummaryOutput {
                summary: state.summary_text().to_string(),
            };
            CommandOutcome::new(&output, Some(state))
        }
        Command::Scope { file, interactive } => {
            let state = if interactive {
                pipelines::scope_with_followups(context, &file, reporter, ask_on_stdin).await?
            } else {
                pipelines::run_scoping(context, &file, reporter).await?
            };
            CommandOutcome::new(&ScopingOutput::from_state(&state), Some(state))
        }
        Command::Chat { action } => {
            let service = ChatService::new(context.clone());
            match action {
                ChatCommand::Send {
                    message,
                    session,
                    topic,
                } => {
                    let response = service
                        .send_message(ChatRequest {
                            session_id: session,
                            message,
                            topic,
                        })
                        .await?;
                    CommandOutcome::new(&response, None)
                }
                ChatCommand::Roadmap { session } => {
                    let state = service.roadmap(&session, reporter).await?;
                    CommandOutcome::new(&RoadmapOutput::from_state(&state), Some(state))
                }
                ChatCommand::List => CommandOutcome::new(&service.list().await?, None),
            }
        }
    }
}

/// 启动命令
pub async fn launch(config: &Config, command: Command, stream: bool) -> Result<()> {
    let context = if needs_model(&command) && !stream {
        // 启动时检查模型连接
        GeneratorContext::connect(config.clone()).await?
    } else {
        GeneratorContext::new(config.clone())?
    };

    if stream {
        return stream_command(context, command).await;
    }

    let label = command_label(&command);
    let mut timing = TimingScope::new();
    println!("🤖 执行 {} ...", label);
    timing.start_phase(label);

    let (reporter, mut rx) = ProgressReporter::channel();
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if let ProgressEvent::Status {
                message,
                progress: Some(progress),
                ..
            } = event
            {
                println!("⏳ [{:>3}%] {}", progress, message);
            }
        }
    });
    let outcome = execute(&context, command, &reporter).await;
    drop(reporter);
    let _ = printer.await;
    let outcome = outcome?;

    if let Some(duration) = timing.end_phase(label) {
        println!("✅ {} 完成，耗时 {:.2}秒", label, duration.as_secs_f64());
    }

    println!("{}", serde_json::to_string_pretty(&outcome.result)?);
    if let Some(state) = &outcome.state {
        outlet::save(&context, state).await?;
    }

    if config.verbose {
        println!("\n{}", timing.generate_timing_report());
        if let Some(usage) = context.llm.usage_report() {
            println!("{}", usage);
        }
    }
    Ok(())
}

/// 在后台任务中执行命令，并把进度事件以SSE帧写到标准输出
async fn stream_command(context: GeneratorContext, command: Command) -> Result<()> {
    let command = match command {
        Command::Scope {
            file,
            interactive: true,
        } => {
            tracing::warn!("⚠️ 流式输出模式下不支持交互追问");
            Command::Scope {
                file,
                interactive: false,
            }
        }
        other => other,
    };
    let mut rx = spawn_streaming(move |reporter| async move {
        execute(&context, command, &reporter)
            .await
            .map(|outcome| outcome.result)
    });

    let mut out = std::io::stdout();
    relay_sse(&mut rx, &mut out).await
}

/// 逐帧写出进度事件，直到收到结果或错误
async fn relay_sse(
    rx: &mut UnboundedReceiver<ProgressEvent>,
    out: &mut impl Write,
) -> Result<()> {
    while let Some(event) = rx.recv().await {
        write!(out, "{}", event.to_sse())?;
        out.flush()?;
        if event.is_terminal() {
            return match event {
                ProgressEvent::Error { error } => Err(anyhow!(error)),
                _ => Ok(()),
            };
        }
    }
    Err(anyhow!("进度通道在结果返回前关闭"))
}
