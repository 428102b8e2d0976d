//! # Lit Review
//!
//! 把一个研究主题变成带引用的文献综述草稿的交互式助手
//!
//! ## 架构设计
//!
//! ### ① 数据模型（Models）
//! - `models/` - 查询方案、论文、卡片、综述、篮子
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `SchemaValidator` - 契约校验
//! - `ArxivSearch` - 文献检索
//! - `StructuredGenerator` - 远程优先、本地兜底的结构化生成
//! - `ReviewWriter` - 综述导出
//!
//! ### ③ 流程层（Workflow）
//! - `Session` - 会话状态
//! - `ReviewFlow` - 状态转移（submit_topic → search → iterate → basket → cards → review）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/app` - 控制台交互循环

pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use orchestrator::App;
pub use workflow::{ReviewFlow, Session, StepOutcome};
