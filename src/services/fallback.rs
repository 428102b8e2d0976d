//! 本地确定性生成
//!
//! 远程后端不可用或结果不合格时的替代实现。相同输入必须得到完全相同的输出。

use std::collections::HashSet;

use crate::models::{Paper, PaperCard, QueryBundle, Reference, Review, ReviewSection, Strategy, MAX_KEYWORDS};

const CORE_TERM_WINDOW: usize = 6;
const MIN_CORE_TERMS: usize = 2;
const MIN_SYNONYMS: usize = 5;
const MIN_SEARCH_QUERIES: usize = 3;
const MIN_KEYWORDS: usize = 5;

const REVIEW_HEADINGS: [&str; 3] = [
    "Background and Definitions",
    "Methods and Approaches",
    "Key Findings and Gaps",
];

/// 按空白、`/`、`-` 切分并转小写，丢弃空串
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| c.is_whitespace() || c == '/' || c == '-')
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

/// 保序去重
fn unique(items: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

/// 不足 `min_len` 时补 `"{prefix} N"`
fn pad(mut items: Vec<String>, min_len: usize, prefix: &str) -> Vec<String> {
    let needed = min_len.saturating_sub(items.len());
    items.extend((1..=needed).map(|i| format!("{} {}", prefix, i)));
    items
}

pub fn query_bundle(topic: &str, round: u32, strategy: Strategy) -> QueryBundle {
    let tokens = tokenize(topic);

    let core_terms = pad(
        unique(tokens.iter().take(CORE_TERM_WINDOW).cloned()),
        MIN_CORE_TERMS,
        "core",
    );
    let synonyms = pad(
        unique(
            tokens
                .iter()
                .cloned()
                .chain(tokens.iter().map(|t| format!("{} study", t))),
        ),
        MIN_SYNONYMS,
        "synonym",
    );

    let (narrow_terms, exclude_terms) = if strategy == Strategy::Narrow {
        (
            strings(&["case study", "qualitative", "quantitative"]),
            strings(&["survey", "review"]),
        )
    } else {
        (Vec::new(), Vec::new())
    };
    let domain_shift_terms = if strategy == Strategy::ShiftDomain {
        strings(&["policy", "ethics", "history"])
    } else {
        Vec::new()
    };

    let candidates = [
        core_terms.iter().take(2).cloned().collect::<Vec<_>>().join(" AND "),
        synonyms.iter().take(3).cloned().collect::<Vec<_>>().join(" OR "),
        format!("{} {}", topic, strategy.as_str()),
    ];
    let search_queries = pad(
        unique(
            candidates
                .into_iter()
                .map(|q| q.trim().to_string())
                .filter(|q| !q.is_empty()),
        ),
        MIN_SEARCH_QUERIES,
        "query",
    );

    QueryBundle {
        topic: topic.to_string(),
        round,
        strategy,
        rationale: strategy.rationale().to_string(),
        core_terms,
        synonyms,
        narrow_terms,
        exclude_terms,
        domain_shift_terms,
        search_queries,
    }
}

pub fn paper_cards(topic: &str, papers: &[Paper]) -> Vec<PaperCard> {
    papers.iter().map(|paper| paper_card(topic, paper)).collect()
}

fn paper_card(topic: &str, paper: &Paper) -> PaperCard {
    let one_line_takeaway = takeaway(&paper.abstract_text);

    let keywords = pad(
        unique(tokenize(&paper.title).into_iter().chain(tokenize(topic))),
        MIN_KEYWORDS,
        "keyword",
    );
    let key_claims = vec![
        format!("Addresses {} through {}", topic, paper.title),
        format!("Highlights {} and {}", keywords[0], keywords[1]),
        "Provides evidence from the abstract".to_string(),
    ];

    PaperCard {
        paper_id: paper.id.clone(),
        title: paper.title.clone(),
        one_line_takeaway,
        research_question: format!("How does this work inform {}?", topic),
        key_claims,
        evidence_or_method: paper.abstract_text.clone(),
        keywords: keywords.into_iter().take(MAX_KEYWORDS).collect(),
        limitations: None,
        relevance_to_topic: format!("Connects {} to {} for review synthesis.", paper.title, topic),
    }
}

/// 摘要第一句（第一个句点之前）
fn takeaway(abstract_text: &str) -> String {
    let trimmed = abstract_text.trim();
    let first_sentence = if trimmed.is_empty() {
        "Summary unavailable"
    } else {
        trimmed.split('.').next().unwrap_or_default()
    };
    let first_sentence = first_sentence.trim();

    if first_sentence.is_empty() {
        "Key insights summarized.".to_string()
    } else {
        format!("{}.", first_sentence)
    }
}

pub fn review(topic: &str, papers: &[Paper]) -> Review {
    let paper_ids: Vec<String> = papers.iter().map(|p| p.id.clone()).collect();

    let sections = REVIEW_HEADINGS
        .iter()
        .map(|heading| ReviewSection {
            heading: heading.to_string(),
            content_markdown: format!(
                "This section synthesizes insights on **{}** across selected papers.",
                topic
            ),
            paper_ids: paper_ids.clone(),
        })
        .collect();

    let references = papers
        .iter()
        .map(|paper| Reference {
            paper_id: paper.id.clone(),
            citation_text: paper.citation(),
            url: Some(paper.url.clone()),
        })
        .collect();

    Review {
        topic: topic.to_string(),
        mode: "theme".to_string(),
        title: format!("Literature Review: {}", topic),
        abstract_text: format!(
            "This review summarizes recent work on {} based on selected abstracts.",
            topic
        ),
        sections,
        references,
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
