//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `app` - 控制台应用
//! - 管理应用生命周期（初始化、运行）
//! - 持有唯一的会话
//! - 逐行读取命令并展示结果
//!
//! ### `command` - 命令解析
//!
//! ## 层次关系
//!
//! ```text
//! app (交互循环)
//!     ↓
//! workflow::ReviewFlow (单个状态转移)
//!     ↓
//! services (能力层：search / generator / validator / writer)
//! ```

pub mod app;
pub mod command;

pub use app::App;
pub use command::Command;
