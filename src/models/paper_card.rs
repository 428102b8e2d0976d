use serde::{Deserialize, Serialize};

/// 关键词数量上限
pub const MAX_KEYWORDS: usize = 12;

/// 单篇论文的结构化摘要卡片
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperCard {
    /// 必须指向购物篮中的论文
    pub paper_id: String,
    pub title: String,
    pub one_line_takeaway: String,
    pub research_question: String,
    pub key_claims: Vec<String>,
    pub evidence_or_method: String,
    pub keywords: Vec<String>,
    pub limitations: Option<String>,
    pub relevance_to_topic: String,
}
