//! 历史栈：导航条目与只读快照
//!
//! 栈是「如何回去」的唯一记录，只有 push 和 pop 改变形状。条目创建后
//! 名字、选项与时间戳不可变，只有返回通道与保留实例会被消费：通道恰好
//! 解析一次（发送端被 take 即消费），保留实例恰好安装或丢弃一次。

use std::any::TypeId;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::core::error::StageError;
use crate::core::retention::ExitStrategy;
use crate::host::{ProcessMode, SceneHandle, SceneNode};

/// 条目标识，创建时分配且永不复用
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct EntryId(Uuid);

impl EntryId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// 调用方声明的实例类型预期
///
/// 记录 TypeId 与类型名：前者做检查，后者进诊断信息。不匹配的实例
/// 会在报错前被销毁。
#[derive(Debug, Clone, Copy)]
pub struct TypeExpectation {
    type_id: TypeId,
    pub type_name: &'static str,
}

impl TypeExpectation {
    pub fn of<T: SceneNode>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }

    pub fn matches(&self, scene: &SceneHandle) -> bool {
        scene.as_any().type_id() == self.type_id
    }
}

/// 一次场景变更的选项
#[derive(Debug, Clone, Default)]
pub struct ChangeOptions {
    /// 对被换下场景的处置方式，默认 Delete
    pub exit_strategy: ExitStrategy,
    /// 传给进入场景 before_enter 挂钩的参数
    pub args: Vec<Value>,
    /// 实例类型预期，不匹配时转场以 TypeMismatch 失败
    pub expect: Option<TypeExpectation>,
}

impl ChangeOptions {
    pub fn with_strategy(mut self, strategy: ExitStrategy) -> Self {
        self.exit_strategy = strategy;
        self
    }

    pub fn with_args(mut self, args: Vec<Value>) -> Self {
        self.args = args;
        self
    }

    pub fn with_expect<T: SceneNode>(mut self) -> Self {
        self.expect = Some(TypeExpectation::of::<T>());
        self
    }
}

pub(crate) type ReturnSender = oneshot::Sender<Result<Value, StageError>>;

/// push_scene_with_return 给调用方的凭据，对应条目被弹出时恰好解析一次
pub struct ReturnTicket {
    rx: oneshot::Receiver<Result<Value, StageError>>,
}

impl ReturnTicket {
    pub(crate) fn new(rx: oneshot::Receiver<Result<Value, StageError>>) -> Self {
        Self { rx }
    }

    /// 等待匹配的 pop 提供的结果
    ///
    /// 条目被替换、无值弹出或应用退出时得到对应的错误，而不是永远挂起。
    pub async fn wait(self) -> Result<Value, StageError> {
        match self.rx.await {
            Ok(outcome) => outcome,
            // 发送端意外消失时等价于栈被拆除
            Err(_) => Err(StageError::Terminated),
        }
    }
}

/// 历史栈条目
///
/// preserved 仅在退出策略保留实例时持有被换下的场景；preserved_process
/// 仅在禁用处理的策略下捕获，恢复时逐字写回。
pub struct HistoryEntry {
    pub id: EntryId,
    pub scene_name: String,
    pub options: ChangeOptions,
    pub created_at: DateTime<Utc>,
    pub(crate) preserved: Option<SceneHandle>,
    pub(crate) preserved_process: Option<ProcessMode>,
    pub(crate) return_tx: Option<ReturnSender>,
}

impl HistoryEntry {
    pub(crate) fn new(
        scene_name: impl Into<String>,
        options: ChangeOptions,
        preserved: Option<SceneHandle>,
        preserved_process: Option<ProcessMode>,
        return_tx: Option<ReturnSender>,
    ) -> Self {
        Self {
            id: EntryId::new(),
            scene_name: scene_name.into(),
            options,
            created_at: Utc::now(),
            preserved,
            preserved_process,
            return_tx,
        }
    }

    pub fn has_return_channel(&self) -> bool {
        self.return_tx.is_some()
    }

    pub fn retains_instance(&self) -> bool {
        self.preserved.is_some()
    }

    /// 解析返回通道，返回是否真的有通道在等
    ///
    /// 发送端被 take 出来消费，再次调用自然是 no-op。接收端可能已被
    /// 丢弃，发送失败不视为错误。
    pub(crate) fn resolve_return(&mut self, outcome: Result<Value, StageError>) -> bool {
        match self.return_tx.take() {
            Some(tx) => {
                let _ = tx.send(outcome);
                true
            }
            None => false,
        }
    }

    pub fn info(&self) -> EntryInfo {
        EntryInfo {
            id: self.id,
            scene_name: self.scene_name.clone(),
            exit_strategy: self.options.exit_strategy,
            args: self.options.args.clone(),
            created_at: self.created_at,
            has_return_channel: self.has_return_channel(),
            retains_instance: self.retains_instance(),
        }
    }
}

/// 条目的只读投影，供检查、日志与序列化
#[derive(Debug, Clone, Serialize)]
pub struct EntryInfo {
    pub id: EntryId,
    pub scene_name: String,
    pub exit_strategy: ExitStrategy,
    pub args: Vec<Value>,
    pub created_at: DateTime<Utc>,
    pub has_return_channel: bool,
    pub retains_instance: bool,
}

/// 历史栈本体
#[derive(Default)]
pub struct HistoryStack {
    entries: Vec<HistoryEntry>,
}

impl HistoryStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: HistoryEntry) {
        self.entries.push(entry);
    }

    pub fn pop(&mut self) -> Result<HistoryEntry, StageError> {
        self.entries.pop().ok_or(StageError::EmptyStack)
    }

    pub fn peek(&self) -> Option<&HistoryEntry> {
        self.entries.last()
    }

    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 最近优先的只读快照
    pub fn snapshot(&self) -> Vec<EntryInfo> {
        self.entries.iter().rev().map(HistoryEntry::info).collect()
    }

    /// 取走全部条目，栈顶在前（退出清算用）
    pub(crate) fn drain_top_first(&mut self) -> Vec<HistoryEntry> {
        let mut drained: Vec<HistoryEntry> = self.entries.drain(..).collect();
        drained.reverse();
        drained
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str) -> HistoryEntry {
        HistoryEntry::new(name, ChangeOptions::default(), None, None, None)
    }

    #[test]
    fn test_stack_is_lifo() {
        let mut stack = HistoryStack::new();
        stack.push(entry("main"));
        stack.push(entry("settings"));
        assert_eq!(stack.depth(), 2);
        assert_eq!(stack.peek().unwrap().scene_name, "settings");

        let popped = stack.pop().unwrap();
        assert_eq!(popped.scene_name, "settings");
        assert_eq!(stack.depth(), 1);
    }

    #[test]
    fn test_pop_on_empty_stack_errors() {
        let mut stack = HistoryStack::new();
        assert!(matches!(stack.pop(), Err(StageError::EmptyStack)));
    }

    #[test]
    fn test_snapshot_is_most_recent_first() {
        let mut stack = HistoryStack::new();
        stack.push(entry("main"));
        stack.push(entry("settings"));
        stack.push(entry("audio"));

        let snapshot = stack.snapshot();
        let names: Vec<&str> = snapshot.iter().map(|e| e.scene_name.as_str()).collect();
        assert_eq!(names, vec!["audio", "settings", "main"]);
    }

    #[test]
    fn test_entry_ids_are_unique() {
        let a = entry("main");
        let b = entry("main");
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn test_return_channel_resolves_exactly_once() {
        let (tx, rx) = oneshot::channel();
        let mut entry = HistoryEntry::new("inventory", ChangeOptions::default(), None, None, Some(tx));
        assert!(entry.has_return_channel());

        assert!(entry.resolve_return(Ok(Value::from(42))));
        // 第二次解析没有通道可用
        assert!(!entry.resolve_return(Ok(Value::from(99))));

        let ticket = ReturnTicket::new(rx);
        assert_eq!(ticket.wait().await.unwrap(), Value::from(42));
    }

    #[test]
    fn test_drain_returns_top_first() {
        let mut stack = HistoryStack::new();
        stack.push(entry("main"));
        stack.push(entry("settings"));

        let drained = stack.drain_top_first();
        assert_eq!(drained[0].scene_name, "settings");
        assert_eq!(drained[1].scene_name, "main");
        assert!(stack.is_empty());
    }

    #[test]
    fn test_type_expectation_matches_concrete_type() {
        use crate::host::mock::{HookScene, StubScene};
        use std::sync::Arc;

        let stub = StubScene::new("menu");
        let hook: SceneHandle = Arc::new(HookScene::new("dialog"));

        let expect_stub = TypeExpectation::of::<StubScene>();
        assert!(expect_stub.matches(&stub));
        assert!(!expect_stub.matches(&hook));
    }
}
