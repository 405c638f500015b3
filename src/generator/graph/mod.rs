//! 状态图编排：命名节点、直接边与条件边

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::PipelineError;
use crate::generator::context::GeneratorContext;
use crate::generator::progress::ProgressReporter;
use crate::types::state::PipelineState;

/// 终止节点名
pub const END: &str = "__end__";

const DEFAULT_MAX_STEPS: usize = 32;

/// 图中的一个处理步骤
#[async_trait]
pub trait Node: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(&self, ctx: &GeneratorContext, state: &mut PipelineState) -> Result<()>;
}

type Router = Arc<dyn Fn(&PipelineState) -> &'static str + Send + Sync>;

enum Edge {
    Direct(String),
    Conditional {
        router: Router,
        branches: HashMap<&'static str, String>,
    },
}

type MessageFn = Arc<dyn Fn(&PipelineState) -> String + Send + Sync>;

/// 进入或离开节点时上报的进度
#[derive(Clone)]
pub struct ProgressMarker {
    pub stage: &'static str,
    pub progress: u8,
    message: MessageFn,
}

impl ProgressMarker {
    pub fn new(stage: &'static str, message: &'static str, progress: u8) -> Self {
        Self {
            stage,
            progress,
            message: Arc::new(move |_| message.to_string()),
        }
    }

    /// 消息文本由当前状态计算
    pub fn computed<F>(stage: &'static str, progress: u8, message: F) -> Self
    where
        F: Fn(&PipelineState) -> String + Send + Sync + 'static,
    {
        Self {
            stage,
            progress,
            message: Arc::new(message),
        }
    }

    fn emit(&self, reporter: &ProgressReporter, state: &PipelineState) {
        reporter.status(self.stage, (self.message)(state), self.progress);
    }
}

/// 构建中的状态图
pub struct StateGraph {
    nodes: HashMap<&'static str, Box<dyn Node>>,
    edges: HashMap<String, Edge>,
    entry: Option<String>,
    on_enter: HashMap<String, ProgressMarker>,
    on_exit: HashMap<String, ProgressMarker>,
    max_steps: usize,
}

impl Default for StateGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl StateGraph {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            edges: HashMap::new(),
            entry: None,
            on_enter: HashMap::new(),
            on_exit: HashMap::new(),
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    pub fn add_node(mut self, node: impl Node + 'static) -> Self {
        self.nodes.insert(node.name(), Box::new(node));
        self
    }

    pub fn set_entry_point(mut self, name: &str) -> Self {
        self.entry = Some(name.to_string());
        self
    }

    pub fn add_edge(mut self, from: &str, to: &str) -> Self {
        self.edges
            .insert(from.to_string(), Edge::Direct(to.to_string()));
        self
    }

    /// 条件边：`router` 返回的标签通过 `branches` 映射到目标节点
    pub fn add_conditional_edges<F>(
        mut self,
        from: &str,
        router: F,
        branches: &[(&'static str, &str)],
    ) -> Self
    where
        F: Fn(&PipelineState) -> &'static str + Send + Sync + 'static,
    {
        let branches = branches
            .iter()
            .map(|(label, target)| (*label, target.to_string()))
            .collect();
        self.edges.insert(
            from.to_string(),
            Edge::Conditional {
                router: Arc::new(router),
                branches,
            },
        );
        self
    }

    /// 节点执行前上报进度
    pub fn on_enter(mut self, node: &str, marker: ProgressMarker) -> Self {
        self.on_enter.insert(node.to_string(), marker);
        self
    }

    /// 节点执行成功后上报进度
    pub fn on_exit(mut self, node: &str, marker: ProgressMarker) -> Self {
        self.on_exit.insert(node.to_string(), marker);
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    fn target_exists(&self, target: &str) -> bool {
        target == END || self.nodes.contains_key(target)
    }

    /// 校验入口和所有边的目标
    pub fn compile(self) -> Result<CompiledGraph> {
        let entry = self
            .entry
            .clone()
            .ok_or_else(|| PipelineError::GraphMisconfigured("no entry point".to_string()))?;
        if !self.nodes.contains_key(entry.as_str()) {
            return Err(
                PipelineError::GraphMisconfigured(format!("unknown entry point '{}'", entry))
                    .into(),
            );
        }

        for (from, edge) in &self.edges {
            if !self.nodes.contains_key(from.as_str()) {
                return Err(PipelineError::GraphMisconfigured(format!(
                    "edge from unknown node '{}'",
                    from
                ))
                .into());
            }
            let targets: Vec<&String> = match edge {
                Edge::Direct(to) => vec![to],
                Edge::Conditional { branches, .. } => branches.values().collect(),
            };
            if let Some(missing) = targets.into_iter().find(|t| !self.target_exists(t)) {
                return Err(PipelineError::GraphMisconfigured(format!(
                    "edge from '{}' to unknown node '{}'",
                    from, missing
                ))
                .into());
            }
        }

        if let Some(dangling) = self
            .nodes
            .keys()
            .find(|name| !self.edges.contains_key(**name))
        {
            return Err(PipelineError::GraphMisconfigured(format!(
                "node '{}' has no outgoing edge",
                dangling
            ))
            .into());
        }

        Ok(CompiledGraph {
            nodes: self.nodes,
            edges: self.edges,
            entry,
            on_enter: self.on_enter,
            on_exit: self.on_exit,
            max_steps: self.max_steps,
        })
    }
}

/// 一次运行的结果
#[derive(Debug)]
pub struct GraphRun {
    pub state: PipelineState,
    /// 按执行顺序记录的节点名
    pub visited: Vec<&'static str>,
}

/// 校验通过、可执行的状态图
pub struct CompiledGraph {
    nodes: HashMap<&'static str, Box<dyn Node>>,
    edges: HashMap<String, Edge>,
    entry: String,
    on_enter: HashMap<String, ProgressMarker>,
    on_exit: HashMap<String, ProgressMarker>,
    max_steps: usize,
}

impl CompiledGraph {
    /// 顺序执行节点直到到达 [`END`]
    pub async fn invoke(
        &self,
        ctx: &GeneratorContext,
        mut state: PipelineState,
        reporter: &ProgressReporter,
    ) -> Result<GraphRun> {
        let mut current = self.entry.clone();
        let mut visited = Vec::new();

        while current != END {
            if visited.len() >= self.max_steps {
                return Err(PipelineError::StepLimitExceeded(self.max_steps).into());
            }
            let node = self.nodes.get(current.as_str()).ok_or_else(|| {
                PipelineError::GraphMisconfigured(format!("unknown node '{}'", current))
            })?;

            if let Some(marker) = self.on_enter.get(&current) {
                marker.emit(reporter, &state);
            }
            tracing::debug!(
                node = node.name(),
                raw_chars = state.raw_text().len(),
                summary_chars = state.summary_text().len(),
                "节点开始"
            );

            node.run(ctx, &mut state).await?;
            visited.push(node.name());

            tracing::debug!(
                node = node.name(),
                summary_chars = state.summary_text().len(),
                goals = state.fields.goals.len(),
                missing = state.missing_fields.len(),
                consolidated_chars = state.research.consolidated.len(),
                "节点完成"
            );
            if let Some(marker) = self.on_exit.get(&current) {
                marker.emit(reporter, &state);
            }

            current = self.next_node(&current, &state)?;
        }

        Ok(GraphRun { state, visited })
    }

    fn next_node(&self, from: &str, state: &PipelineState) -> Result<String> {
        match self.edges.get(from) {
            Some(Edge::Direct(to)) => Ok(to.clone()),
            Some(Edge::Conditional { router, branches }) => {
                let label = router(state);
                branches.get(label).cloned().ok_or_else(|| {
                    PipelineError::GraphMisconfigured(format!(
                        "router of '{}' returned unknown label '{}'",
                        from, label
                    ))
                    .into()
                })
            }
            None => Ok(END.to_string()),
        }
    }
}
