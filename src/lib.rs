//! playground - 在线代码练习场的会话引擎
//!
//! 模块结构：
//! - models: 数据模型（VirtualFileTree, NodePath, FileId）
//! - kernel: 会话核心（标签页、AI 补全状态机、PlaygroundSession）
//! - kernel::services: 端口与适配器（沙箱运行时、存储、补全、聊天、设置）

pub mod kernel;
pub mod models;
