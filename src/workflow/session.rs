//! 会话状态
//!
//! 封装"当前在研究什么、进行到第几轮、挑了哪些论文"这一信息。
//! 字段只能通过 [`ReviewFlow`](super::ReviewFlow) 的操作修改，
//! 每次修改都是整体替换，不会留下校验了一半的产物。

use std::fmt::Display;

use crate::models::{Basket, Paper, PaperCard, QueryBundle, Review};

/// 一个主题最多进行的检索轮数（含首轮）
pub const MAX_ROUNDS: u32 = 3;

/// 单个用户的会话
#[derive(Debug, Clone)]
pub struct Session {
    topic: String,
    round: u32,
    query_bundle: Option<QueryBundle>,
    /// 最近一次检索的结果，每次检索整体替换
    results: Vec<Paper>,
    basket: Basket,
    paper_cards: Vec<PaperCard>,
    review: Option<Review>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            topic: String::new(),
            round: 1,
            query_bundle: None,
            results: Vec::new(),
            basket: Basket::new(),
            paper_cards: Vec::new(),
            review: None,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn query_bundle(&self) -> Option<&QueryBundle> {
        self.query_bundle.as_ref()
    }

    pub fn results(&self) -> &[Paper] {
        &self.results
    }

    pub fn basket(&self) -> &Basket {
        &self.basket
    }

    pub fn paper_cards(&self) -> &[PaperCard] {
        &self.paper_cards
    }

    pub fn review(&self) -> Option<&Review> {
        self.review.as_ref()
    }

    /// 是否已达到轮数上限
    pub fn rounds_exhausted(&self) -> bool {
        self.round >= MAX_ROUNDS
    }

    // ========== 提交（仅流程层调用） ==========

    /// 新主题：轮次回到 1，替换查询方案；结果、篮子、卡片、综述保留
    pub(crate) fn commit_topic(&mut self, topic: String, bundle: QueryBundle) {
        self.topic = topic;
        self.round = 1;
        self.query_bundle = Some(bundle);
    }

    pub(crate) fn commit_results(&mut self, results: Vec<Paper>) {
        self.results = results;
    }

    /// 一次迭代的三项变更一起提交
    pub(crate) fn commit_iteration(&mut self, bundle: QueryBundle, results: Vec<Paper>) {
        self.round = bundle.round;
        self.query_bundle = Some(bundle);
        self.results = results;
    }

    pub(crate) fn basket_mut(&mut self) -> &mut Basket {
        &mut self.basket
    }

    pub(crate) fn commit_cards(&mut self, cards: Vec<PaperCard>) {
        self.paper_cards = cards;
    }

    pub(crate) fn commit_review(&mut self, review: Review) {
        self.review = Some(review);
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[主题 \"{}\" 轮次 {}/{} 结果 {} 篮子 {} 卡片 {} 综述 {}]",
            self.topic,
            self.round,
            MAX_ROUNDS,
            self.results.len(),
            self.basket.len(),
            self.paper_cards.len(),
            if self.review.is_some() { "有" } else { "无" }
        )
    }
}
