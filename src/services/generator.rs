//! 结构化生成服务 - 业务能力层
//!
//! 负责生成三类产物：查询方案、论文卡片、综述草稿。
//!
//! 每次生成都是两段式流程：
//! 1. 远程尝试：未配置后端时直接失败；否则调用 LLM、解析 JSON、按契约校验
//! 2. 结算：远程成功则采用；否则运行本地确定性生成，并同样按契约校验
//!
//! 契约校验是产物能否进入会话状态的唯一关卡，与来源无关。

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, LlmError, SchemaError};
use crate::models::{Paper, PaperCard, QueryBundle, Review, Strategy};
use crate::services::fallback;
use crate::services::llm_service::{ChatBackend, LlmService};
use crate::services::prompts;
use crate::services::schema_validator::{SchemaName, SchemaValidator};

/// 生成任务类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    QueryBundle,
    PaperCards,
    Review,
}

impl Task {
    pub fn name(self) -> &'static str {
        match self {
            Task::QueryBundle => "query_bundle",
            Task::PaperCards => "paper_cards",
            Task::Review => "review",
        }
    }

    fn system_prompt(self) -> &'static str {
        match self {
            Task::QueryBundle => prompts::QUERY_BUNDLE_PROMPT,
            Task::PaperCards => prompts::PAPER_CARDS_PROMPT,
            Task::Review => prompts::REVIEW_PROMPT,
        }
    }
}

/// 远程尝试失败的原因
#[derive(Debug)]
pub enum GenerationFailure {
    /// 未配置远程后端
    NotConfigured,
    /// 后端不可用（网络、状态码、超时、空内容）
    Backend(LlmError),
    /// 返回内容不是 JSON
    InvalidJson(String),
    /// 不符合契约
    Schema(SchemaError),
    /// 符合契约但与请求不一致（轮次、策略、论文 ID）
    Inconsistent(String),
}

impl std::fmt::Display for GenerationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationFailure::NotConfigured => write!(f, "未配置远程后端"),
            GenerationFailure::Backend(e) => write!(f, "后端不可用: {}", e),
            GenerationFailure::InvalidJson(e) => write!(f, "返回内容不是合法 JSON: {}", e),
            GenerationFailure::Schema(e) => write!(f, "{}", e),
            GenerationFailure::Inconsistent(msg) => write!(f, "结果与请求不一致: {}", msg),
        }
    }
}

impl From<SchemaError> for GenerationFailure {
    fn from(err: SchemaError) -> Self {
        GenerationFailure::Schema(err)
    }
}

/// 远程尝试的结果
#[derive(Debug)]
pub enum GenerationOutcome<T> {
    Success(T),
    Failed(GenerationFailure),
}

/// 产物来源
#[derive(Debug)]
pub enum Source {
    Remote,
    Fallback(GenerationFailure),
}

impl Source {
    pub fn is_remote(&self) -> bool {
        matches!(self, Source::Remote)
    }
}

/// 已通过契约校验的产物
#[derive(Debug)]
pub struct Generated<T> {
    pub artifact: T,
    pub source: Source,
}

/// 结构化生成器
pub struct StructuredGenerator {
    backend: Option<Box<dyn ChatBackend>>,
    validator: Arc<SchemaValidator>,
}

impl StructuredGenerator {
    /// 根据配置创建：有凭据时接入 LLM，否则只用本地生成
    pub fn new(config: &Config, validator: Arc<SchemaValidator>) -> Self {
        let backend: Option<Box<dyn ChatBackend>> = if config.is_llm_configured() {
            Some(Box::new(LlmService::new(config)))
        } else {
            None
        };
        Self::with_backend(backend, validator)
    }

    pub fn with_backend(backend: Option<Box<dyn ChatBackend>>, validator: Arc<SchemaValidator>) -> Self {
        Self { backend, validator }
    }

    /// 生成查询方案
    pub async fn query_bundle(&self, topic: &str, round: u32, strategy: Strategy) -> AppResult<Generated<QueryBundle>> {
        let payload = json!({
            "topic": topic,
            "round": round,
            "strategy": strategy,
            "rationale": strategy.rationale(),
        });

        let outcome = self
            .attempt(Task::QueryBundle, &payload, |value| {
                let bundle: QueryBundle = self.conform(value, SchemaName::QueryBundle)?;
                if bundle.round != round || bundle.strategy != strategy {
                    return Err(GenerationFailure::Inconsistent(format!(
                        "期望 round={} strategy={}，实际 round={} strategy={}",
                        round, strategy, bundle.round, bundle.strategy
                    )));
                }
                Ok(bundle)
            })
            .await;

        self.settle(Task::QueryBundle, outcome, || {
            let bundle = fallback::query_bundle(topic, round, strategy);
            self.validator.validate_typed(&bundle, SchemaName::QueryBundle)?;
            Ok(bundle)
        })
    }

    /// 为每篇论文生成卡片
    pub async fn paper_cards(&self, topic: &str, papers: &[Paper]) -> AppResult<Generated<Vec<PaperCard>>> {
        let started = Instant::now();
        let payload = json!({ "topic": topic, "papers": papers });

        let outcome = self
            .attempt(Task::PaperCards, &payload, |value| {
                let cards: Vec<PaperCard> = self.conform_list(value, SchemaName::PaperCard)?;
                one_per_paper(cards.iter().map(|c| c.paper_id.as_str()), papers)
                    .map_err(|msg| GenerationFailure::Inconsistent(format!("卡片{}", msg)))?;
                Ok(cards)
            })
            .await;

        let generated = self.settle(Task::PaperCards, outcome, || {
            let cards = fallback::paper_cards(topic, papers);
            for card in &cards {
                self.validator.validate_typed(card, SchemaName::PaperCard)?;
            }
            Ok(cards)
        })?;

        info!(
            event = "paper_cards_generated",
            count = generated.artifact.len(),
            latency_ms = started.elapsed().as_millis() as u64,
            "🗂️ 论文卡片生成完成"
        );
        Ok(generated)
    }

    /// 生成综述草稿
    pub async fn review(&self, topic: &str, papers: &[Paper], cards: &[PaperCard]) -> AppResult<Generated<Review>> {
        let started = Instant::now();
        let payload = json!({ "topic": topic, "papers": papers, "cards": cards });
        let known: HashSet<&str> = papers.iter().map(|p| p.id.as_str()).collect();

        let outcome = self
            .attempt(Task::Review, &payload, |value| {
                let review: Review = self.conform(value, SchemaName::Review)?;
                if let Some(stray) = review.cited_ids().find(|id| !known.contains(id)) {
                    return Err(GenerationFailure::Inconsistent(format!(
                        "综述引用了未选中的论文 {}",
                        stray
                    )));
                }
                one_per_paper(review.references.iter().map(|r| r.paper_id.as_str()), papers)
                    .map_err(|msg| GenerationFailure::Inconsistent(format!("参考文献{}", msg)))?;
                Ok(review)
            })
            .await;

        let generated = self.settle(Task::Review, outcome, || {
            let review = fallback::review(topic, papers);
            self.validator.validate_typed(&review, SchemaName::Review)?;
            Ok(review)
        })?;

        info!(
            event = "review_generated",
            sections = generated.artifact.sections.len(),
            latency_ms = started.elapsed().as_millis() as u64,
            "📝 综述草稿生成完成"
        );
        Ok(generated)
    }

    // ========== 两段式流程 ==========

    /// 第一段：远程尝试
    async fn attempt<T, F>(&self, task: Task, payload: &Value, accept: F) -> GenerationOutcome<T>
    where
        F: FnOnce(Value) -> Result<T, GenerationFailure>,
    {
        let Some(backend) = self.backend.as_ref() else {
            return GenerationOutcome::Failed(GenerationFailure::NotConfigured);
        };

        debug!("远程生成 {}，模型: {}", task.name(), backend.model_name());

        let content = match backend.complete(task.system_prompt(), &payload.to_string()).await {
            Ok(content) => content,
            Err(e) => return GenerationOutcome::Failed(GenerationFailure::Backend(e)),
        };

        let value = match parse_json_content(&content) {
            Ok(value) => value,
            Err(e) => return GenerationOutcome::Failed(GenerationFailure::InvalidJson(e.to_string())),
        };

        match accept(value) {
            Ok(artifact) => GenerationOutcome::Success(artifact),
            Err(failure) => GenerationOutcome::Failed(failure),
        }
    }

    /// 第二段：结算。远程失败时使用本地生成，本地结果不合格属于不变量被破坏
    fn settle<T, F>(&self, task: Task, outcome: GenerationOutcome<T>, fallback: F) -> AppResult<Generated<T>>
    where
        F: FnOnce() -> Result<T, SchemaError>,
    {
        match outcome {
            GenerationOutcome::Success(artifact) => {
                debug!("{} 使用远程生成结果", task.name());
                Ok(Generated {
                    artifact,
                    source: Source::Remote,
                })
            }
            GenerationOutcome::Failed(reason) => {
                match &reason {
                    GenerationFailure::NotConfigured => debug!("{} 使用本地生成", task.name()),
                    other => warn!(
                        event = "generation_fallback",
                        task = task.name(),
                        "⚠️ 远程生成失败，改用本地生成: {}",
                        other
                    ),
                }
                let artifact = fallback().map_err(|e| AppError::fallback_contract(task.name(), e))?;
                Ok(Generated {
                    artifact,
                    source: Source::Fallback(reason),
                })
            }
        }
    }

    /// 按契约校验单个对象并转换为内部类型
    fn conform<T: DeserializeOwned>(&self, value: Value, schema: SchemaName) -> Result<T, SchemaError> {
        self.validator.validate(&value, schema)?;
        serde_json::from_value(value).map_err(|source| SchemaError::Conversion {
            name: schema.name().to_string(),
            source,
        })
    }

    /// 按契约逐项校验 JSON 数组
    fn conform_list<T: DeserializeOwned>(&self, value: Value, schema: SchemaName) -> Result<Vec<T>, SchemaError> {
        let Value::Array(items) = value else {
            return Err(SchemaError::NotAnArray {
                name: schema.name().to_string(),
            });
        };
        items
            .into_iter()
            .map(|item| self.conform(item, schema))
            .collect()
    }
}

/// 检查 ID 与论文一一对应：不多、不少、不重复
fn one_per_paper<'a>(ids: impl Iterator<Item = &'a str>, papers: &[Paper]) -> Result<(), String> {
    let mut remaining: HashSet<&str> = papers.iter().map(|p| p.id.as_str()).collect();
    for id in ids {
        if !remaining.remove(id) {
            return Err(if papers.iter().any(|p| p.id == id) {
                format!("重复包含论文 {}", id)
            } else {
                format!("引用了未选中的论文 {}", id)
            });
        }
    }
    match papers.iter().find(|p| remaining.contains(p.id.as_str())) {
        Some(missing) => Err(format!("缺少论文 {}", missing.id)),
        None => Ok(()),
    }
}

/// 解析 LLM 返回的 JSON，容忍外层的 Markdown 代码块
pub fn parse_json_content(content: &str) -> Result<Value, serde_json::Error> {
    serde_json::from_str(strip_code_fence(content))
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // 去掉语言标记行（如 ```json）
    match body.split_once('\n') {
        Some((lang, inner)) if !lang.trim_start().starts_with(['{', '[']) => inner.trim(),
        _ => body.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// 返回固定内容的后端
    struct CannedBackend {
        reply: Result<String, ()>,
        calls: Mutex<usize>,
    }

    impl CannedBackend {
        fn ok(reply: impl Into<String>) -> Self {
            Self {
                reply: Ok(reply.into()),
                calls: Mutex::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                reply: Err(()),
                calls: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl ChatBackend for CannedBackend {
        fn model_name(&self) -> &str {
            "canned"
        }

        async fn complete(&self, _system: &str, _user: &str) -> Result<String, LlmError> {
            *self.calls.lock().unwrap() += 1;
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(()) => Err(LlmError::EmptyContent {
                    model: "canned".to_string(),
                }),
            }
        }
    }

    fn validator() -> Arc<SchemaValidator> {
        Arc::new(SchemaValidator::bundled().unwrap())
    }

    fn generator(backend: Option<CannedBackend>) -> StructuredGenerator {
        StructuredGenerator::with_backend(
            backend.map(|b| Box::new(b) as Box<dyn ChatBackend>),
            validator(),
        )
    }

    fn paper(id: &str) -> Paper {
        Paper {
            provider: "arxiv".to_string(),
            id: id.to_string(),
            title: format!("Paper {}", id),
            authors: vec!["A".to_string(), "B".to_string()],
            published_year: 2021,
            abstract_text: "We study things. More text.".to_string(),
            url: format!("http://arxiv.org/abs/{}", id),
            pdf_url: None,
            categories: vec!["cs.LG".to_string()],
            score: None,
        }
    }

    fn remote_bundle(round: u32, strategy: &str) -> String {
        json!({
            "topic": "graph neural networks",
            "round": round,
            "strategy": strategy,
            "rationale": "remote",
            "core_terms": ["graph neural network", "GNN"],
            "synonyms": ["graph network", "message passing", "graph learning", "geometric deep learning", "GCN"],
            "narrow_terms": [],
            "exclude_terms": [],
            "domain_shift_terms": [],
            "search_queries": ["all:GNN", "all:\"graph neural network\"", "all:message passing"]
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_unconfigured_uses_fallback() {
        let structured = generator(None);
        let result = structured.query_bundle("graph neural networks", 1, Strategy::Initial).await.unwrap();
        assert!(matches!(result.source, Source::Fallback(GenerationFailure::NotConfigured)));
        assert_eq!(result.artifact, fallback::query_bundle("graph neural networks", 1, Strategy::Initial));
    }

    #[tokio::test]
    async fn test_valid_remote_bundle_is_accepted() {
        let structured = generator(Some(CannedBackend::ok(remote_bundle(1, "initial"))));
        let result = structured.query_bundle("graph neural networks", 1, Strategy::Initial).await.unwrap();
        assert!(result.source.is_remote());
        assert_eq!(result.artifact.rationale, "remote");
        assert_eq!(result.artifact.search_queries[0], "all:GNN");
    }

    #[tokio::test]
    async fn test_fenced_remote_bundle_is_accepted() {
        let fenced = format!("```json\n{}\n```", remote_bundle(1, "initial"));
        let structured = generator(Some(CannedBackend::ok(fenced)));
        let result = structured.query_bundle("graph neural networks", 1, Strategy::Initial).await.unwrap();
        assert!(result.source.is_remote());
    }

    #[tokio::test]
    async fn test_non_json_falls_back() {
        let structured = generator(Some(CannedBackend::ok("Sure! Here are some queries.")));
        let result = structured.query_bundle("x y", 1, Strategy::Initial).await.unwrap();
        assert!(matches!(result.source, Source::Fallback(GenerationFailure::InvalidJson(_))));
    }

    #[tokio::test]
    async fn test_schema_violation_falls_back() {
        let structured = generator(Some(CannedBackend::ok(r#"{"topic": "x y", "round": 1}"#)));
        let result = structured.query_bundle("x y", 1, Strategy::Initial).await.unwrap();
        assert!(matches!(result.source, Source::Fallback(GenerationFailure::Schema(_))));
        assert_eq!(result.artifact.rationale, "Initial query formulation.");
    }

    #[tokio::test]
    async fn test_backend_error_falls_back() {
        let backend = CannedBackend::failing();
        let structured = generator(Some(backend));
        let result = structured.query_bundle("x y", 2, Strategy::Broaden).await.unwrap();
        assert!(matches!(result.source, Source::Fallback(GenerationFailure::Backend(_))));
        assert_eq!(result.artifact.round, 2);
    }

    #[tokio::test]
    async fn test_wrong_round_is_inconsistent() {
        let structured = generator(Some(CannedBackend::ok(remote_bundle(3, "initial"))));
        let result = structured.query_bundle("graph neural networks", 1, Strategy::Initial).await.unwrap();
        assert!(matches!(result.source, Source::Fallback(GenerationFailure::Inconsistent(_))));
        assert_eq!(result.artifact.round, 1);
    }

    #[tokio::test]
    async fn test_backend_called_once_per_generation() {
        let backend = Arc::new(CannedBackend::ok("not json"));
        struct Shared(Arc<CannedBackend>);
        #[async_trait]
        impl ChatBackend for Shared {
            fn model_name(&self) -> &str {
                self.0.model_name()
            }
            async fn complete(&self, system: &str, user: &str) -> Result<String, LlmError> {
                self.0.complete(system, user).await
            }
        }
        let structured = StructuredGenerator::with_backend(Some(Box::new(Shared(backend.clone()))), validator());
        structured.query_bundle("x", 1, Strategy::Initial).await.unwrap();
        // 失败后不重试，直接兜底
        assert_eq!(*backend.calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_cards_must_be_an_array() {
        let single = json!({
            "paper_id": "1",
            "title": "t",
            "one_line_takeaway": "x.",
            "research_question": "q",
            "key_claims": ["c"],
            "evidence_or_method": "e",
            "keywords": ["k"],
            "limitations": null,
            "relevance_to_topic": "r"
        });
        let structured = generator(Some(CannedBackend::ok(single.to_string())));
        let result = structured.paper_cards("t", &[paper("1")]).await.unwrap();
        assert!(matches!(result.source, Source::Fallback(GenerationFailure::Schema(SchemaError::NotAnArray { .. }))));
        assert_eq!(result.artifact.len(), 1);
    }

    #[tokio::test]
    async fn test_remote_cards_accepted_when_ids_match() {
        let cards = json!([{
            "paper_id": "1",
            "title": "Paper 1",
            "one_line_takeaway": "It works.",
            "research_question": "Does it work?",
            "key_claims": ["It works"],
            "evidence_or_method": "Experiments",
            "keywords": ["graphs"],
            "limitations": "Small data",
            "relevance_to_topic": "Direct"
        }]);
        let structured = generator(Some(CannedBackend::ok(cards.to_string())));
        let result = structured.paper_cards("t", &[paper("1")]).await.unwrap();
        assert!(result.source.is_remote());
        assert_eq!(result.artifact[0].limitations.as_deref(), Some("Small data"));
    }

    #[tokio::test]
    async fn test_remote_cards_with_unknown_id_fall_back() {
        let cards = json!([{
            "paper_id": "999",
            "title": "Ghost",
            "one_line_takeaway": "x.",
            "research_question": "q",
            "key_claims": ["c"],
            "evidence_or_method": "e",
            "keywords": ["k"],
            "limitations": null,
            "relevance_to_topic": "r"
        }]);
        let structured = generator(Some(CannedBackend::ok(cards.to_string())));
        let result = structured.paper_cards("t", &[paper("1")]).await.unwrap();
        assert!(matches!(result.source, Source::Fallback(GenerationFailure::Inconsistent(_))));
        assert_eq!(result.artifact[0].paper_id, "1");
    }

    #[tokio::test]
    async fn test_remote_empty_cards_fall_back() {
        let structured = generator(Some(CannedBackend::ok("[]")));
        let result = structured.paper_cards("t", &[paper("1"), paper("2")]).await.unwrap();
        assert!(matches!(result.source, Source::Fallback(GenerationFailure::Inconsistent(_))));
        let ids: Vec<&str> = result.artifact.iter().map(|c| c.paper_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[tokio::test]
    async fn test_remote_review_needs_one_reference_per_paper() {
        let review = json!({
            "topic": "X",
            "mode": "theme",
            "title": "Remote review",
            "abstract": "Remote abstract.",
            "sections": [{"heading": "H", "content_markdown": "C", "paper_ids": ["1"]}],
            "references": []
        });
        let papers = vec![paper("1"), paper("2")];
        let cards = fallback::paper_cards("X", &papers);
        let structured = generator(Some(CannedBackend::ok(review.to_string())));
        let result = structured.review("X", &papers, &cards).await.unwrap();
        assert!(matches!(result.source, Source::Fallback(GenerationFailure::Inconsistent(_))));
        assert_eq!(result.artifact.references.len(), 2);
    }

    #[tokio::test]
    async fn test_remote_review_with_full_references_is_accepted() {
        let review = json!({
            "topic": "X",
            "mode": "theme",
            "title": "Remote review",
            "abstract": "Remote abstract.",
            "sections": [{"heading": "H", "content_markdown": "C", "paper_ids": ["2"]}],
            "references": [
                {"paper_id": "1", "citation_text": "A, B (2021). Paper 1.", "url": null},
                {"paper_id": "2", "citation_text": "A, B (2021). Paper 2.", "url": null}
            ]
        });
        let papers = vec![paper("1"), paper("2")];
        let cards = fallback::paper_cards("X", &papers);
        let structured = generator(Some(CannedBackend::ok(review.to_string())));
        let result = structured.review("X", &papers, &cards).await.unwrap();
        assert!(result.source.is_remote());
        assert_eq!(result.artifact.title, "Remote review");
    }

    #[test]
    fn test_one_per_paper() {
        let papers = vec![paper("1"), paper("2")];
        assert!(one_per_paper(["2", "1"].into_iter(), &papers).is_ok());
        assert!(one_per_paper(["1"].into_iter(), &papers).is_err());
        assert!(one_per_paper(["1", "1", "2"].into_iter(), &papers).is_err());
        assert!(one_per_paper(["1", "2", "3"].into_iter(), &papers).is_err());
    }

    #[tokio::test]
    async fn test_review_fallback_with_two_papers() {
        let structured = generator(None);
        let papers = vec![paper("1"), paper("2")];
        let cards = fallback::paper_cards("X", &papers);
        let result = structured.review("X", &papers, &cards).await.unwrap();
        assert_eq!(result.artifact.sections.len(), 3);
        for section in &result.artifact.sections {
            assert_eq!(section.paper_ids, vec!["1", "2"]);
        }
        assert_eq!(result.artifact.references.len(), 2);
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fence("  {\"a\":1}  "), "{\"a\":1}");
        assert!(parse_json_content("```json\n{\"a\":1}\n```").is_ok());
        assert!(parse_json_content("not json").is_err());
    }
}
