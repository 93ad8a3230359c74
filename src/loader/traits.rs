//! 模板源抽象
//!
//! 模板的实际读取（磁盘、打包存储、网络）在引擎外部。编排器只依赖两个动作：
//! exists 做转场前的 fail-fast 校验，load 异步产出可实例化的模板并把进度
//! 写进通道。进度通道可能在加载结束前被关闭，实现必须容忍发送失败。

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::core::error::StageError;
use crate::host::SceneTemplate;

/// 场景模板的来源
#[async_trait]
pub trait TemplateSource: Send + Sync {
    /// 路径在存储中是否存在（只探测，不加载）
    async fn exists(&self, path: &str) -> bool;

    /// 加载一个模板，进度以 0..=100 的百分比写入 progress 通道
    async fn load(
        &self,
        path: &str,
        progress: mpsc::UnboundedSender<u8>,
    ) -> Result<Arc<dyn SceneTemplate>, StageError>;
}
