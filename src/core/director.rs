//! 转场引擎：场景栈编排的主控
//!
//! 所有导航操作在这里串行化：同一时刻至多一个转场在飞行中（单飞许可），
//! push/replace 对冲突快速失败，pop 排队等待。转场协议按固定顺序推进
//! 退出、加载、进入三个阶段并发射五个检查点；观察者可以在生命周期检查点
//! 挂起转场，引擎会停在下一道暂停门直到 resume。返回通道在条目离开栈时
//! 恰好解析一次：带值弹出、无值弹出、被替换或随退出清算，各得其所。
//!
//! 锁纪律：栈锁与暂停门锁都不跨越 await 持有，跨操作互斥只靠单飞许可。

use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::sync::{mpsc, oneshot, OwnedSemaphorePermit, Semaphore};

use crate::catalog::SceneCatalog;
use crate::config::StageConfig;
use crate::core::checkpoint::{Checkpoint, CheckpointBus, CheckpointKind};
use crate::core::error::StageError;
use crate::core::history::{ChangeOptions, EntryInfo, HistoryEntry, HistoryStack, ReturnTicket};
use crate::core::quit::{QuitController, QuitReason};
use crate::core::retention::{self, ExitStrategy};
use crate::host::{SceneHandle, StageHost};
use crate::loader::{RetrySource, TemplateSource};

/// 暂停门：suspend 建一对 oneshot，检查点发射后取走接收端等待，
/// resume 消费发送端放行。单门不变式靠 Option 保证。
struct PauseGate {
    tx: Option<oneshot::Sender<()>>,
    rx: Option<oneshot::Receiver<()>>,
}

/// pop 的三种解析方式
enum PopOutcome {
    NoValue,
    Value(Value),
    Error(StageError),
}

/// 转场引擎
pub struct SceneDirector {
    catalog: SceneCatalog,
    source: Arc<dyn TemplateSource>,
    host: Arc<dyn StageHost>,
    bus: CheckpointBus,
    stack: Mutex<HistoryStack>,
    /// 单飞许可：可用许可为 0 即有转场在飞行中
    flight: Arc<Semaphore>,
    pause: Mutex<Option<PauseGate>>,
    overlay_path: Option<String>,
    overlay: Mutex<Option<SceneHandle>>,
    quit: QuitController,
}

impl SceneDirector {
    pub fn new(
        catalog: SceneCatalog,
        source: Arc<dyn TemplateSource>,
        host: Arc<dyn StageHost>,
    ) -> Self {
        Self {
            catalog,
            source,
            host,
            bus: CheckpointBus::new(),
            stack: Mutex::new(HistoryStack::new()),
            flight: Arc::new(Semaphore::new(1)),
            pause: Mutex::new(None),
            overlay_path: None,
            overlay: Mutex::new(None),
            quit: QuitController::new(),
        }
    }

    /// 按配置组装：场景表进目录，加载源按重试预算包一层，覆盖层路径透传
    pub fn from_config(
        cfg: &StageConfig,
        source: Arc<dyn TemplateSource>,
        host: Arc<dyn StageHost>,
    ) -> Self {
        let catalog = SceneCatalog::from_config(cfg);
        let source: Arc<dyn TemplateSource> = if cfg.loader.retry_attempts > 1 {
            Arc::new(RetrySource::from_config(source, &cfg.loader))
        } else {
            source
        };
        let mut director = Self::new(catalog, source, host);
        director.overlay_path = cfg.stage.transition_scene.clone();
        director
    }

    /// 设置转场覆盖层（加载画面）的路径，start 时实例化并挂接
    pub fn with_transition_overlay(mut self, path: impl Into<String>) -> Self {
        self.overlay_path = Some(path.into());
        self
    }

    /// 启动：压入哨兵条目并挂接转场覆盖层
    ///
    /// 哨兵对应配置的主场景，永远是栈底。重复调用只告警不重复压栈。
    /// 覆盖层是尽力而为：加载失败只记录，引擎照常可用。
    pub async fn start(&self) -> Result<(), StageError> {
        let main = self.catalog.main_scene_name().to_string();
        self.catalog.resolve(&main)?;
        {
            let mut stack = self.stack.lock().expect("history stack lock poisoned");
            if !stack.is_empty() {
                tracing::warn!("scene director already started, ignoring");
                return Ok(());
            }
            stack.push(HistoryEntry::new(
                main.as_str(),
                ChangeOptions::default(),
                None,
                None,
                None,
            ));
        }
        tracing::info!("scene director started, sentinel entry [{}] pushed", main);

        if let Some(path) = self.overlay_path.clone() {
            match self.load_overlay(&path).await {
                Ok(instance) => {
                    // 覆盖层常驻树中，自己订阅检查点来决定何时显示
                    self.host.attach(&instance);
                    *self.overlay.lock().expect("overlay lock poisoned") = Some(instance);
                    tracing::info!("transition overlay attached from {}", path);
                }
                Err(e) => {
                    tracing::warn!("transition overlay {} not attached: {}", path, e);
                }
            }
        }
        Ok(())
    }

    async fn load_overlay(&self, path: &str) -> Result<SceneHandle, StageError> {
        let (progress_tx, _progress_rx) = mpsc::unbounded_channel();
        let template = self.source.load(path, progress_tx).await?;
        template
            .instantiate()
            .map_err(|e| StageError::Load(format!("transition overlay instantiate failed: {e}")))
    }

    // ------------------------------------------------------------------
    // 导航操作
    // ------------------------------------------------------------------

    /// 压入新场景
    ///
    /// 当前场景按 options.exit_strategy 处置，新条目入栈。已有转场在
    /// 飞行中时立即返回 TransitionInProgress，不排队。协议失败时弹掉
    /// 新条目恢复栈形状，错误向调用方传播。
    pub async fn push_scene(&self, scene_name: &str, options: ChangeOptions) -> Result<(), StageError> {
        let _permit = self.try_begin()?;
        let entry = self.build_entry(scene_name, options.clone(), None);
        let entry_id = entry.id;
        self.stack
            .lock()
            .expect("history stack lock poisoned")
            .push(entry);
        tracing::info!("push scene [{}] ({:?})", scene_name, options.exit_strategy);

        match self.perform_change(scene_name, &options).await {
            Ok(()) => Ok(()),
            Err(err) => {
                // 回滚：单飞保证栈顶仍是我们刚压入的条目
                let _ = self.stack.lock().expect("history stack lock poisoned").pop();
                tracing::warn!("push of [{}] rolled back ({}): {}", scene_name, entry_id, err);
                Err(err)
            }
        }
    }

    /// 压入新场景并建立返回通道
    ///
    /// 返回的凭据在条目被弹出、替换或随退出清算时恰好解析一次。
    /// Delete 策略下被换下的实例无法在返回时复原，只能整场重载，
    /// 这里记录警告提醒调用方。
    pub async fn push_scene_with_return(
        &self,
        scene_name: &str,
        options: ChangeOptions,
    ) -> Result<ReturnTicket, StageError> {
        if !options.exit_strategy.preserves_instance() {
            tracing::warn!(
                "push_scene_with_return [{}] uses Delete, outgoing scene will be reloaded on return",
                scene_name
            );
        }
        let _permit = self.try_begin()?;
        let (return_tx, return_rx) = oneshot::channel();
        let entry = self.build_entry(scene_name, options.clone(), Some(return_tx));
        self.stack
            .lock()
            .expect("history stack lock poisoned")
            .push(entry);
        tracing::info!("push scene [{}] with return channel", scene_name);

        match self.perform_change(scene_name, &options).await {
            Ok(()) => Ok(ReturnTicket::new(return_rx)),
            Err(err) => {
                let mut popped = self.stack.lock().expect("history stack lock poisoned").pop();
                if let Ok(entry) = &mut popped {
                    // 通道在条目离开栈时必须解析，哪怕接收端马上会被丢弃
                    entry.resolve_return(Err(err.clone()));
                }
                tracing::warn!("push of [{}] rolled back: {}", scene_name, err);
                Err(err)
            }
        }
    }

    /// 原地替换栈顶条目
    ///
    /// 旧条目出栈且其返回通道立即以 Replaced 解析，随后才跑转场协议。
    /// 协议失败时旧条目（通道已解析）回到栈顶，新条目丢弃。成功时旧条目
    /// 保留的实例已无人能恢复，就地销毁以免悬挂。
    pub async fn replace_scene(&self, scene_name: &str, options: ChangeOptions) -> Result<(), StageError> {
        let _permit = self.try_begin()?;
        let mut original = self.stack.lock().expect("history stack lock poisoned").pop()?;
        original.resolve_return(Err(StageError::Replaced));
        tracing::info!("replace scene [{}] -> [{}]", original.scene_name, scene_name);

        let entry = self.build_entry(scene_name, options.clone(), None);
        self.stack
            .lock()
            .expect("history stack lock poisoned")
            .push(entry);

        match self.perform_change(scene_name, &options).await {
            Ok(()) => {
                if let Some(instance) = original.preserved.take() {
                    if let Err(e) = self.host.destroy(&instance).await {
                        tracing::warn!("failed to destroy orphaned instance of [{}]: {}", original.scene_name, e);
                    }
                }
                Ok(())
            }
            Err(err) => {
                {
                    let mut stack = self.stack.lock().expect("history stack lock poisoned");
                    let _ = stack.pop();
                    stack.push(original);
                }
                tracing::warn!("replace with [{}] rolled back: {}", scene_name, err);
                Err(err)
            }
        }
    }

    /// 重载栈顶条目的场景
    ///
    /// 当前实例以 Delete 处置后按条目原本的名字与选项重新加载。条目
    /// 本身原样保留：id、返回通道与保留链都不动，栈形状不变，因此
    /// 失败时也没有需要回滚的栈操作。
    pub async fn reset_scene(&self) -> Result<(), StageError> {
        let _permit = self.try_begin()?;
        let (scene_name, options) = {
            let stack = self.stack.lock().expect("history stack lock poisoned");
            let top = stack.peek().ok_or(StageError::EmptyStack)?;
            (top.scene_name.clone(), top.options.clone())
        };
        tracing::info!("reset scene [{}]", scene_name);

        let path = self.locate(&scene_name).await?;
        let from_scene = self.current_scene_name();
        self.exit_current(ExitStrategy::Delete).await?;
        self.load_and_enter(&scene_name, &path, &options, &from_scene)
            .await
    }

    /// 弹出栈顶条目，不携带返回值
    ///
    /// 若条目持有返回通道，以 PoppedWithoutValue 解析。弹出哨兵会触发
    /// 应用退出而不是转场，此时仍正常返回被弹出的条目。与 push 不同，
    /// pop 会排队等待在飞行中的转场结束。
    pub async fn pop_scene(&self) -> Result<EntryInfo, StageError> {
        self.pop_internal(PopOutcome::NoValue).await
    }

    /// 弹出栈顶条目并向等待方交付返回值
    pub async fn pop_scene_with(&self, value: Value) -> Result<EntryInfo, StageError> {
        self.pop_internal(PopOutcome::Value(value)).await
    }

    /// 弹出栈顶条目并向等待方交付错误
    ///
    /// 没有返回通道在等时错误会被记录而不是抛出。
    pub async fn pop_scene_with_error(&self, error: StageError) -> Result<EntryInfo, StageError> {
        self.pop_internal(PopOutcome::Error(error)).await
    }

    /// 请求退出：清算历史栈并广播退出信号
    ///
    /// 与 pop 一样排队等待在飞行中的转场结束，清算期间不会有检查点交错。
    pub async fn quit(&self) {
        let _permit = self.begin_wait().await;
        self.quit_internal(QuitReason::Requested).await;
    }

    // ------------------------------------------------------------------
    // 挂起与恢复
    // ------------------------------------------------------------------

    /// 挂起当前转场
    ///
    /// 引擎会停在下一道暂停门（生命周期检查点发射之后）直到 resume。
    /// 没有转场在飞行中时是 no-op；重复挂起不叠加，单门单次 resume。
    pub fn suspend_transition(&self) {
        if !self.transition_in_progress() {
            tracing::debug!("suspend requested outside a transition, ignoring");
            return;
        }
        let mut pause = self.pause.lock().expect("pause gate lock poisoned");
        if pause.is_some() {
            return;
        }
        let (tx, rx) = oneshot::channel();
        *pause = Some(PauseGate {
            tx: Some(tx),
            rx: Some(rx),
        });
        tracing::debug!("transition suspended");
    }

    /// 恢复被挂起的转场，没有挂起时是 no-op
    pub fn resume_transition(&self) {
        let gate = self.pause.lock().expect("pause gate lock poisoned").take();
        if let Some(gate) = gate {
            if let Some(tx) = gate.tx {
                let _ = tx.send(());
            }
            tracing::debug!("transition resumed");
        }
    }

    // ------------------------------------------------------------------
    // 检查点订阅
    // ------------------------------------------------------------------

    pub fn on_before_exit<F>(&self, handler: F)
    where
        F: Fn(&Checkpoint) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.bus.subscribe(CheckpointKind::BeforeExit, handler);
    }

    pub fn on_after_exit<F>(&self, handler: F)
    where
        F: Fn(&Checkpoint) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.bus.subscribe(CheckpointKind::AfterExit, handler);
    }

    pub fn on_load_progress<F>(&self, handler: F)
    where
        F: Fn(&Checkpoint) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.bus.subscribe(CheckpointKind::LoadProgress, handler);
    }

    pub fn on_before_enter<F>(&self, handler: F)
    where
        F: Fn(&Checkpoint) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.bus.subscribe(CheckpointKind::BeforeEnter, handler);
    }

    pub fn on_after_enter<F>(&self, handler: F)
    where
        F: Fn(&Checkpoint) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.bus.subscribe(CheckpointKind::AfterEnter, handler);
    }

    // ------------------------------------------------------------------
    // 只读访问
    // ------------------------------------------------------------------

    /// 是否有转场在飞行中
    pub fn transition_in_progress(&self) -> bool {
        self.flight.available_permits() == 0
    }

    /// 历史栈快照，最近的条目在前
    pub fn history(&self) -> Vec<EntryInfo> {
        self.stack
            .lock()
            .expect("history stack lock poisoned")
            .snapshot()
    }

    pub fn history_depth(&self) -> usize {
        self.stack.lock().expect("history stack lock poisoned").depth()
    }

    /// 栈顶条目
    pub fn peek_history(&self) -> Option<EntryInfo> {
        self.stack
            .lock()
            .expect("history stack lock poisoned")
            .peek()
            .map(HistoryEntry::info)
    }

    /// 当前条目携带的参数（进入场景时传给 before_enter 的那组）
    pub fn current_arguments(&self) -> Vec<Value> {
        self.stack
            .lock()
            .expect("history stack lock poisoned")
            .peek()
            .map(|e| e.options.args.clone())
            .unwrap_or_default()
    }

    /// 退出信号控制器，宿主主循环用它等待退出
    pub fn quit_signal(&self) -> QuitController {
        self.quit.clone()
    }

    /// 转场覆盖层实例，未启用或尚未 start 时为 None
    pub fn transition_overlay(&self) -> Option<SceneHandle> {
        self.overlay.lock().expect("overlay lock poisoned").clone()
    }

    // ------------------------------------------------------------------
    // 协议内部
    // ------------------------------------------------------------------

    fn try_begin(&self) -> Result<OwnedSemaphorePermit, StageError> {
        let permit = self
            .flight
            .clone()
            .try_acquire_owned()
            .map_err(|_| StageError::TransitionInProgress)?;
        self.discard_stale_gate();
        Ok(permit)
    }

    async fn begin_wait(&self) -> OwnedSemaphorePermit {
        let permit = self
            .flight
            .clone()
            .acquire_owned()
            .await
            .expect("single-flight semaphore closed");
        self.discard_stale_gate();
        permit
    }

    /// 中止的转场可能把未放行的暂停门留在槽里，新转场必须不受其约束
    fn discard_stale_gate(&self) {
        let stale = self.pause.lock().expect("pause gate lock poisoned").take();
        if stale.is_some() {
            tracing::debug!("pause gate left by an aborted transition discarded");
        }
    }

    fn current_scene_name(&self) -> String {
        self.host
            .current()
            .map(|s| s.name().to_string())
            .unwrap_or_default()
    }

    /// 组装新条目：在任何状态改写之前捕获被换下的实例与处理模式
    fn build_entry(
        &self,
        scene_name: &str,
        options: ChangeOptions,
        return_tx: Option<crate::core::history::ReturnSender>,
    ) -> HistoryEntry {
        let outgoing = self.host.current();
        let preserved = if options.exit_strategy.preserves_instance() {
            outgoing.clone()
        } else {
            None
        };
        let preserved_process = outgoing
            .as_ref()
            .and_then(|scene| retention::capture_process(&*self.host, scene, options.exit_strategy));
        HistoryEntry::new(scene_name, options, preserved, preserved_process, return_tx)
    }

    /// 解析符号名并确认路径存在，任何状态改写之前的 fail-fast
    async fn locate(&self, name: &str) -> Result<String, StageError> {
        let path = self.catalog.resolve(name)?.to_string();
        if !self.source.exists(&path).await {
            return Err(StageError::SceneNotFound(format!(
                "scene [{name}] path not found in storage: {path}"
            )));
        }
        Ok(path)
    }

    /// 完整转场协议：定位、退出、加载、进入
    async fn perform_change(&self, scene_name: &str, options: &ChangeOptions) -> Result<(), StageError> {
        let path = self.locate(scene_name).await?;
        let from_scene = self.current_scene_name();
        self.exit_current(options.exit_strategy).await?;
        self.load_and_enter(scene_name, &path, options, &from_scene).await
    }

    /// 退出阶段：BeforeExit 检查点、按策略处置、AfterExit 检查点
    async fn exit_current(&self, strategy: ExitStrategy) -> Result<(), StageError> {
        let outgoing = self.host.current();
        self.emit_gated(Checkpoint::BeforeExit {
            scene: outgoing.clone(),
        })
        .await?;
        if let Some(scene) = &outgoing {
            retention::apply_exit(&*self.host, scene, strategy).await?;
        }
        self.emit_gated(Checkpoint::AfterExit).await?;
        Ok(())
    }

    /// 加载与进入阶段
    ///
    /// 加载期间进度检查点与加载 future 在同一个 select 循环里交错，
    /// 进度不过暂停门。实例化后先做类型预期检查（不匹配就地销毁），
    /// 再发 BeforeEnter、跑 before_enter 挂钩、挂接并设为当前场景，
    /// 最后发 AfterEnter。
    async fn load_and_enter(
        &self,
        scene_name: &str,
        path: &str,
        options: &ChangeOptions,
        from_scene: &str,
    ) -> Result<(), StageError> {
        let (progress_tx, mut progress_rx) = mpsc::unbounded_channel::<u8>();
        let load_fut = self.source.load(path, progress_tx);
        tokio::pin!(load_fut);
        let template = loop {
            tokio::select! {
                result = &mut load_fut => break result?,
                Some(percent) = progress_rx.recv() => {
                    self.bus.emit(&Checkpoint::LoadProgress {
                        percent,
                        to_scene: scene_name.to_string(),
                        from_scene: from_scene.to_string(),
                    })?;
                }
            }
        };
        // 加载结束瞬间仍滞留在通道里的进度也要发出去
        while let Ok(percent) = progress_rx.try_recv() {
            self.bus.emit(&Checkpoint::LoadProgress {
                percent,
                to_scene: scene_name.to_string(),
                from_scene: from_scene.to_string(),
            })?;
        }

        let instance = template
            .instantiate()
            .map_err(|e| StageError::Load(format!("instantiate failed for [{scene_name}]: {e}")))?;

        if let Some(expect) = &options.expect {
            if !expect.matches(&instance) {
                if let Err(e) = self.host.destroy(&instance).await {
                    tracing::warn!("failed to destroy mismatched instance of [{}]: {}", scene_name, e);
                }
                return Err(StageError::TypeMismatch {
                    name: scene_name.to_string(),
                    expected: expect.type_name,
                });
            }
        }

        self.emit_gated(Checkpoint::BeforeEnter {
            scene_name: scene_name.to_string(),
            scene: instance.clone(),
            args: options.args.clone(),
        })
        .await?;

        instance
            .before_enter(&options.args)
            .await
            .map_err(|e| StageError::Hook(e.to_string()))?;

        self.host.attach(&instance);
        self.host.set_current(&instance);

        self.emit_gated(Checkpoint::AfterEnter {
            scene_name: scene_name.to_string(),
            scene: instance,
            args: options.args.clone(),
        })
        .await?;
        tracing::info!("scene [{}] entered", scene_name);
        Ok(())
    }

    async fn pop_internal(&self, outcome: PopOutcome) -> Result<EntryInfo, StageError> {
        let _permit = self.begin_wait().await;
        let mut entry = match self.stack.lock().expect("history stack lock poisoned").pop() {
            Ok(entry) => entry,
            Err(err) => {
                // 清算之后的 pop：重新触发退出并报告空栈
                tracing::warn!("pop on empty scene stack, re-triggering quit");
                self.quit.trigger(QuitReason::RootPopped);
                return Err(err);
            }
        };

        let now_empty = self.stack.lock().expect("history stack lock poisoned").is_empty();
        if now_empty {
            // 哨兵出栈：触发退出而不是转场
            tracing::info!("sentinel [{}] popped, quitting application", entry.scene_name);
            let info = entry.info();
            self.resolve_pop_channel(&mut entry, outcome);
            self.quit_internal(QuitReason::RootPopped).await;
            return Ok(info);
        }

        tracing::info!("pop scene [{}]", entry.scene_name);
        match self.perform_return(&mut entry).await {
            Ok(()) => {
                let info = entry.info();
                self.resolve_pop_channel(&mut entry, outcome);
                Ok(info)
            }
            Err(err) => {
                // 回滚：条目带着未消费的通道与保留实例回到栈顶
                self.stack
                    .lock()
                    .expect("history stack lock poisoned")
                    .push(entry);
                tracing::warn!("pop rolled back: {}", err);
                Err(err)
            }
        }
    }

    /// 返回协议：弹出的场景以 Delete 处置，之后要么恢复保留实例、
    /// 要么按新栈顶的名字整场重载
    async fn perform_return(&self, entry: &mut HistoryEntry) -> Result<(), StageError> {
        let from_scene = self.current_scene_name();
        self.exit_current(ExitStrategy::Delete).await?;

        if let Some(instance) = entry.preserved.take() {
            retention::restore(
                &*self.host,
                &instance,
                entry.options.exit_strategy,
                entry.preserved_process,
            );
            tracing::info!("preserved instance [{}] restored", instance.name());
            return Ok(());
        }

        let (scene_name, options) = {
            let stack = self.stack.lock().expect("history stack lock poisoned");
            let top = stack.peek().ok_or(StageError::EmptyStack)?;
            (top.scene_name.clone(), top.options.clone())
        };
        let path = self.locate(&scene_name).await?;
        self.load_and_enter(&scene_name, &path, &options, &from_scene).await
    }

    fn resolve_pop_channel(&self, entry: &mut HistoryEntry, outcome: PopOutcome) {
        match outcome {
            PopOutcome::NoValue => {
                entry.resolve_return(Err(StageError::PoppedWithoutValue));
            }
            PopOutcome::Value(value) => {
                if !entry.resolve_return(Ok(value)) {
                    tracing::debug!("pop value for [{}] had no waiting channel", entry.scene_name);
                }
            }
            PopOutcome::Error(error) => {
                if !entry.resolve_return(Err(error.clone())) {
                    // 没有等待方时记录而不是抛出
                    tracing::error!(
                        "scene [{}] popped with error but no return channel was waiting: {}",
                        entry.scene_name,
                        error
                    );
                }
            }
        }
    }

    /// 退出清算：退出当前场景、解析所有挂起通道、销毁所有保留实例，
    /// 最后广播退出信号。清算路径上的错误只记录不传播。
    async fn quit_internal(&self, reason: QuitReason) {
        if let Err(e) = self.exit_current(ExitStrategy::Delete).await {
            tracing::warn!("exit during quit failed, continuing teardown: {}", e);
        }
        let drained = self
            .stack
            .lock()
            .expect("history stack lock poisoned")
            .drain_top_first();
        for mut entry in drained {
            entry.resolve_return(Err(StageError::Terminated));
            if let Some(instance) = entry.preserved.take() {
                if let Err(e) = self.host.destroy(&instance).await {
                    tracing::warn!(
                        "failed to destroy preserved instance of [{}] during quit: {}",
                        entry.scene_name,
                        e
                    );
                }
            }
        }
        self.quit.trigger(reason);
        tracing::info!("application quit triggered ({:?})", reason);
    }

    /// 发射生命周期检查点，然后停在暂停门上（若有观察者挂起了转场）
    async fn emit_gated(&self, checkpoint: Checkpoint) -> Result<(), StageError> {
        self.bus.emit(&checkpoint)?;
        self.wait_gate().await;
        Ok(())
    }

    async fn wait_gate(&self) {
        let rx = {
            let mut pause = self.pause.lock().expect("pause gate lock poisoned");
            pause.as_mut().and_then(|gate| gate.rx.take())
        };
        if let Some(rx) = rx {
            // resume 消费发送端后这里返回；发送端被丢弃也视为放行
            let _ = rx.await;
        }
    }
}
