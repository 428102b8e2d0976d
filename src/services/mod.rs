//! 业务能力层（Services Layer）
//!
//! 每个服务只描述"我能做什么"，不关心会话流程：
//!
//! - `schema_validator` - 按契约校验 JSON 实例
//! - `paper_search` - 文献检索（arXiv Atom 接口）
//! - `llm_service` - 调用兼容 OpenAI 的对话接口
//! - `fallback` - 本地确定性生成
//! - `generator` - 远程优先、本地兜底的结构化生成
//! - `review_writer` - 综述导出为 Markdown

pub mod fallback;
pub mod generator;
pub mod llm_service;
pub mod paper_search;
pub mod prompts;
pub mod review_writer;
pub mod schema_validator;

pub use generator::{GenerationFailure, Generated, Source, StructuredGenerator};
pub use llm_service::{ChatBackend, LlmService};
pub use paper_search::{ArxivSearch, SearchProvider};
pub use review_writer::ReviewWriter;
pub use schema_validator::{SchemaName, SchemaValidator};
