//! 综述流程 - 流程层
//!
//! 核心职责：定义一次会话上的全部状态转移
//!
//! 流程顺序：
//! 1. submit_topic → 生成首轮查询方案
//! 2. search → 用首条查询检索，整体替换结果
//! 3. iterate → 换策略重新生成方案并立即检索（最多 3 轮）
//! 4. add_to_basket → 把选中的结果并入篮子
//! 5. generate_cards → 为篮子里的论文生成卡片
//! 6. generate_review → 基于卡片生成综述
//!
//! 前置条件不满足时返回 [`StepOutcome::Skipped`]，会话保持不变；
//! 检索失败向上传播，会话同样保持不变。

use std::collections::HashSet;
use std::fmt::Display;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::AppResult;
use crate::models::{Paper, QueryBundle, Strategy};
use crate::services::{ArxivSearch, SchemaName, SchemaValidator, SearchProvider, StructuredGenerator};
use crate::workflow::session::{Session, MAX_ROUNDS};

/// 状态转移结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// 已生效
    Applied,
    /// 前置条件不满足，未做任何修改
    Skipped(SkipReason),
}

impl StepOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, StepOutcome::Applied)
    }
}

/// 跳过原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    EmptyTopic,
    NoQueryBundle,
    MaxRoundsReached { round: u32 },
    UnsupportedStrategy(Strategy),
    EmptyBasket,
    NoPaperCards,
}

impl Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::EmptyTopic => write!(f, "主题不能为空"),
            SkipReason::NoQueryBundle => write!(f, "请先提交主题"),
            SkipReason::MaxRoundsReached { round } => {
                write!(f, "已达到最大轮数 ({}/{})", round, MAX_ROUNDS)
            }
            SkipReason::UnsupportedStrategy(strategy) => {
                write!(f, "迭代不支持策略 {}", strategy)
            }
            SkipReason::EmptyBasket => write!(f, "篮子为空，请先选择论文"),
            SkipReason::NoPaperCards => write!(f, "还没有论文卡片，请先生成卡片"),
        }
    }
}

/// 篮子合并结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BasketChange {
    pub added: usize,
    pub replaced: usize,
    /// 不在当前结果中的 ID
    pub not_found: Vec<String>,
}

/// 综述流程
///
/// - 编排检索与生成能力
/// - 决定何时跳过、何时提交
/// - 不持有会话，会话由调用方传入
pub struct ReviewFlow {
    generator: StructuredGenerator,
    search_provider: Box<dyn SearchProvider>,
    validator: Arc<SchemaValidator>,
    page_size: usize,
}

impl ReviewFlow {
    /// 根据配置创建：加载契约、接入 arXiv 与（可选的）LLM
    pub fn new(config: &Config) -> AppResult<Self> {
        let validator = Arc::new(match &config.contracts_dir {
            Some(dir) => SchemaValidator::from_dir(dir)?,
            None => SchemaValidator::bundled()?,
        });
        let generator = StructuredGenerator::new(config, validator.clone());
        let search_provider = Box::new(ArxivSearch::new(config)?);

        Ok(Self::with_parts(
            generator,
            search_provider,
            validator,
            config.search_page_size,
        ))
    }

    /// 使用指定组件创建
    pub fn with_parts(
        generator: StructuredGenerator,
        search_provider: Box<dyn SearchProvider>,
        validator: Arc<SchemaValidator>,
        page_size: usize,
    ) -> Self {
        Self {
            generator,
            search_provider,
            validator,
            page_size,
        }
    }

    /// 提交主题
    pub async fn submit_topic(&self, session: &mut Session, topic: &str) -> AppResult<StepOutcome> {
        if topic.trim().is_empty() {
            return Ok(skip(SkipReason::EmptyTopic));
        }

        info!(event = "topic_submitted", topic = topic, "📌 提交主题");

        let generated = self.generator.query_bundle(topic, 1, Strategy::Initial).await?;
        log_bundle(&generated.artifact, generated.source.is_remote());

        session.commit_topic(topic.to_string(), generated.artifact);
        Ok(StepOutcome::Applied)
    }

    /// 用当前方案的首条查询检索
    pub async fn search(&self, session: &mut Session) -> AppResult<StepOutcome> {
        let Some(bundle) = session.query_bundle() else {
            return Ok(skip(SkipReason::NoQueryBundle));
        };

        let results = self.run_search(bundle).await?;
        session.commit_results(results);
        Ok(StepOutcome::Applied)
    }

    /// 换策略迭代：生成新方案并立即检索，全部成功后才提交
    pub async fn iterate(&self, session: &mut Session, strategy: Strategy) -> AppResult<StepOutcome> {
        if !strategy.is_iteration() {
            return Ok(skip(SkipReason::UnsupportedStrategy(strategy)));
        }
        if session.query_bundle().is_none() {
            return Ok(skip(SkipReason::NoQueryBundle));
        }
        if session.rounds_exhausted() {
            return Ok(skip(SkipReason::MaxRoundsReached {
                round: session.round(),
            }));
        }

        let next_round = session.round() + 1;
        info!(
            event = "iteration_requested",
            strategy = strategy.as_str(),
            round = next_round,
            "🔁 第 {} 轮迭代: {}",
            next_round,
            strategy
        );

        let generated = self
            .generator
            .query_bundle(session.topic(), next_round, strategy)
            .await?;
        log_bundle(&generated.artifact, generated.source.is_remote());

        let results = self.run_search(&generated.artifact).await?;
        session.commit_iteration(generated.artifact, results);
        Ok(StepOutcome::Applied)
    }

    /// 把当前结果中选中的论文并入篮子（同 ID 覆盖）
    pub fn add_to_basket<S: AsRef<str>>(&self, session: &mut Session, selected_ids: &[S]) -> BasketChange {
        let wanted: HashSet<&str> = selected_ids.iter().map(AsRef::as_ref).collect();
        let picked: Vec<Paper> = session
            .results()
            .iter()
            .filter(|p| wanted.contains(p.id.as_str()))
            .cloned()
            .collect();

        let found: HashSet<&str> = picked.iter().map(|p| p.id.as_str()).collect();
        let mut not_found = Vec::new();
        for id in selected_ids.iter().map(AsRef::as_ref) {
            if !found.contains(id) && !not_found.iter().any(|n: &String| n == id) {
                not_found.push(id.to_string());
            }
        }

        let mut change = BasketChange {
            not_found,
            ..BasketChange::default()
        };
        let basket = session.basket_mut();
        for paper in picked {
            if basket.upsert(paper) {
                change.added += 1;
            } else {
                change.replaced += 1;
            }
        }

        info!(
            event = "basket_updated",
            added = change.added,
            replaced = change.replaced,
            size = basket.len(),
            "🧺 篮子更新: 新增 {}，覆盖 {}，共 {} 篇",
            change.added,
            change.replaced,
            basket.len()
        );
        if !change.not_found.is_empty() {
            warn!("⚠️ 以下 ID 不在当前结果中: {}", change.not_found.join(", "));
        }

        change
    }

    /// 为篮子里的论文生成卡片，整体替换
    pub async fn generate_cards(&self, session: &mut Session) -> AppResult<StepOutcome> {
        if session.basket().is_empty() {
            return Ok(skip(SkipReason::EmptyBasket));
        }

        let generated = self
            .generator
            .paper_cards(session.topic(), session.basket().papers())
            .await?;

        session.commit_cards(generated.artifact);
        Ok(StepOutcome::Applied)
    }

    /// 基于篮子和卡片生成综述
    pub async fn generate_review(&self, session: &mut Session) -> AppResult<StepOutcome> {
        if session.paper_cards().is_empty() {
            return Ok(skip(SkipReason::NoPaperCards));
        }

        let generated = self
            .generator
            .review(session.topic(), session.basket().papers(), session.paper_cards())
            .await?;

        session.commit_review(generated.artifact);
        Ok(StepOutcome::Applied)
    }

    /// 执行检索，任何一条结果不符合契约都使整个检索失败
    async fn run_search(&self, bundle: &QueryBundle) -> AppResult<Vec<Paper>> {
        let query = bundle.primary_query().unwrap_or(bundle.topic.as_str());

        info!(
            event = "search_started",
            provider = self.search_provider.name(),
            query = query,
            round = bundle.round,
            "🔍 检索: {}",
            query
        );

        let (results, latency_ms) = self
            .search_provider
            .search(query, self.page_size, 0)
            .await?;

        for paper in &results {
            self.validator.validate_typed(paper, SchemaName::Paper)?;
        }

        info!(
            event = "search_completed",
            count = results.len(),
            latency_ms = latency_ms,
            "✓ 检索完成，{} 条结果，耗时 {} ms",
            results.len(),
            latency_ms
        );

        Ok(results)
    }
}

fn skip(reason: SkipReason) -> StepOutcome {
    warn!("⚠️ 操作已跳过: {}", reason);
    StepOutcome::Skipped(reason)
}

fn log_bundle(bundle: &QueryBundle, remote: bool) {
    info!(
        event = "query_bundle_generated",
        round = bundle.round,
        strategy = bundle.strategy.as_str(),
        queries = bundle.search_queries.len(),
        remote = remote,
        "✓ 第 {} 轮查询方案已生成 ({})",
        bundle.round,
        bundle.strategy
    );
}
