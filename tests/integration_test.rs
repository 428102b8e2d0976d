//! 集成测试：在假的检索提供方上跑完整会话流程

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use lit_review::error::{AppError, AppResult, LlmError, SearchError};
use lit_review::models::{Paper, Strategy};
use lit_review::services::{ChatBackend, SchemaName, SchemaValidator, SearchProvider, StructuredGenerator};
use lit_review::workflow::{ReviewFlow, Session, SkipReason, StepOutcome, MAX_ROUNDS};

/// 每次检索都返回同一批论文，可以切换为失败
struct FakeSearch {
    papers: Arc<Mutex<Vec<Paper>>>,
    fail: Arc<Mutex<bool>>,
}

#[async_trait]
impl SearchProvider for FakeSearch {
    fn name(&self) -> &str {
        "fake"
    }

    async fn search(&self, _query: &str, max_results: usize, _start: usize) -> AppResult<(Vec<Paper>, u64)> {
        if *self.fail.lock().unwrap() {
            return Err(AppError::Search(SearchError::BadStatus {
                endpoint: "fake".to_string(),
                status: 500,
            }));
        }
        let papers = self.papers.lock().unwrap();
        Ok((papers.iter().take(max_results).cloned().collect(), 5))
    }
}

/// 永远不可用的后端
struct DownBackend;

#[async_trait]
impl ChatBackend for DownBackend {
    fn model_name(&self) -> &str {
        "down"
    }

    async fn complete(&self, _system: &str, _user: &str) -> Result<String, LlmError> {
        Err(LlmError::Timeout {
            model: "down".to_string(),
            secs: 30,
        })
    }
}

struct Harness {
    flow: ReviewFlow,
    papers: Arc<Mutex<Vec<Paper>>>,
    fail: Arc<Mutex<bool>>,
    validator: Arc<SchemaValidator>,
}

fn harness(backend: Option<Box<dyn ChatBackend>>) -> Harness {
    let validator = Arc::new(SchemaValidator::bundled().unwrap());
    let papers = Arc::new(Mutex::new(Vec::new()));
    let fail = Arc::new(Mutex::new(false));
    let search = FakeSearch {
        papers: papers.clone(),
        fail: fail.clone(),
    };
    let generator = StructuredGenerator::with_backend(backend, validator.clone());
    Harness {
        flow: ReviewFlow::with_parts(generator, Box::new(search), validator.clone(), 20),
        papers,
        fail,
        validator,
    }
}

fn paper(id: &str, title: &str, authors: &[&str], year: i32) -> Paper {
    Paper {
        provider: "arxiv".to_string(),
        id: id.to_string(),
        title: title.to_string(),
        authors: authors.iter().map(|a| a.to_string()).collect(),
        published_year: year,
        abstract_text: format!("We study {}. Results are promising.", title.to_lowercase()),
        url: format!("http://arxiv.org/abs/{}", id),
        pdf_url: Some(format!("http://arxiv.org/pdf/{}", id)),
        categories: vec!["cs.LG".to_string()],
        score: None,
    }
}

#[tokio::test]
async fn test_round_sequence_is_capped_at_three() {
    let h = harness(None);
    let mut session = Session::new();

    h.flow.submit_topic(&mut session, "graph neural networks").await.unwrap();
    assert_eq!(session.round(), 1);
    let bundle = session.query_bundle().unwrap();
    assert!(bundle.search_queries.len() >= 3);
    assert!(bundle.core_terms.len() >= 2);

    assert!(h.flow.iterate(&mut session, Strategy::Broaden).await.unwrap().is_applied());
    assert_eq!(session.round(), 2);
    assert_eq!(session.query_bundle().unwrap().strategy, Strategy::Broaden);

    assert!(h.flow.iterate(&mut session, Strategy::Narrow).await.unwrap().is_applied());
    assert_eq!(session.round(), MAX_ROUNDS);

    let before_bundle = session.query_bundle().cloned();
    let before_results = session.results().to_vec();
    let outcome = h.flow.iterate(&mut session, Strategy::ShiftDomain).await.unwrap();
    assert_eq!(outcome, StepOutcome::Skipped(SkipReason::MaxRoundsReached { round: 3 }));
    assert_eq!(session.round(), 3);
    assert_eq!(session.query_bundle().cloned(), before_bundle);
    assert_eq!(session.results(), before_results.as_slice());
}

#[tokio::test]
async fn test_iterate_without_topic_is_noop() {
    let h = harness(None);
    let mut session = Session::new();
    let outcome = h.flow.iterate(&mut session, Strategy::Broaden).await.unwrap();
    assert_eq!(outcome, StepOutcome::Skipped(SkipReason::NoQueryBundle));
    assert_eq!(session.round(), 1);
}

#[tokio::test]
async fn test_new_topic_resets_round_and_keeps_basket() {
    let h = harness(None);
    *h.papers.lock().unwrap() = vec![paper("1", "One", &["A"], 2020)];
    let mut session = Session::new();

    h.flow.submit_topic(&mut session, "first topic").await.unwrap();
    h.flow.search(&mut session).await.unwrap();
    h.flow.add_to_basket(&mut session, &["1"]);
    h.flow.iterate(&mut session, Strategy::Broaden).await.unwrap();
    assert_eq!(session.round(), 2);

    h.flow.submit_topic(&mut session, "second topic").await.unwrap();
    assert_eq!(session.round(), 1);
    assert_eq!(session.topic(), "second topic");
    assert_eq!(session.basket().len(), 1);
    assert_eq!(session.results().len(), 1);
}

#[tokio::test]
async fn test_basket_is_idempotent_and_keeps_newest_copy() {
    let h = harness(None);
    *h.papers.lock().unwrap() = vec![paper("1", "Old title", &["A"], 2020)];
    let mut session = Session::new();

    h.flow.submit_topic(&mut session, "x y").await.unwrap();
    h.flow.search(&mut session).await.unwrap();
    h.flow.add_to_basket(&mut session, &["1"]);
    h.flow.add_to_basket(&mut session, &["1"]);
    assert_eq!(session.basket().len(), 1);

    // 后一次检索返回了更新过的版本
    *h.papers.lock().unwrap() = vec![paper("1", "New title", &["A"], 2021)];
    h.flow.search(&mut session).await.unwrap();
    let change = h.flow.add_to_basket(&mut session, &["1"]);
    assert_eq!(change.replaced, 1);
    assert_eq!(session.basket().len(), 1);
    assert_eq!(session.basket().get("1").unwrap().title, "New title");
}

#[tokio::test]
async fn test_cards_without_backend() {
    let h = harness(None);
    *h.papers.lock().unwrap() = vec![paper("1234.5678", "Deep Learning for X", &["A", "B"], 2021)];
    let mut session = Session::new();

    h.flow.submit_topic(&mut session, "deep learning").await.unwrap();
    h.flow.search(&mut session).await.unwrap();
    h.flow.add_to_basket(&mut session, &["1234.5678"]);
    assert!(h.flow.generate_cards(&mut session).await.unwrap().is_applied());

    let cards = session.paper_cards();
    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0].paper_id, "1234.5678");
    assert!(cards[0].keywords.len() >= 5);
    h.validator.validate_typed(&cards[0], SchemaName::PaperCard).unwrap();
}

#[tokio::test]
async fn test_review_over_two_papers_with_backend_down() {
    let h = harness(Some(Box::new(DownBackend)));
    *h.papers.lock().unwrap() = vec![
        paper("1", "First", &["A", "B", "C", "D"], 2019),
        paper("2", "Second", &["E"], 2022),
    ];
    let mut session = Session::new();

    h.flow.submit_topic(&mut session, "X").await.unwrap();
    h.flow.search(&mut session).await.unwrap();
    h.flow.add_to_basket(&mut session, &["1", "2"]);
    h.flow.generate_cards(&mut session).await.unwrap();
    assert!(h.flow.generate_review(&mut session).await.unwrap().is_applied());

    let review = session.review().unwrap();
    assert_eq!(review.sections.len(), 3);
    for section in &review.sections {
        assert_eq!(section.paper_ids, vec!["1".to_string(), "2".to_string()]);
    }
    assert_eq!(review.references.len(), 2);
    assert_eq!(review.references[0].citation_text, "A, B, C (2019). First.");
    h.validator.validate_typed(review, SchemaName::Review).unwrap();
}

#[tokio::test]
async fn test_search_failure_leaves_state_unchanged() {
    let h = harness(None);
    *h.papers.lock().unwrap() = vec![paper("1", "One", &["A"], 2020)];
    let mut session = Session::new();

    h.flow.submit_topic(&mut session, "x y").await.unwrap();
    h.flow.search(&mut session).await.unwrap();
    assert_eq!(session.results().len(), 1);

    *h.fail.lock().unwrap() = true;
    assert!(h.flow.search(&mut session).await.is_err());
    assert_eq!(session.results().len(), 1);

    assert!(h.flow.iterate(&mut session, Strategy::Narrow).await.is_err());
    assert_eq!(session.round(), 1);
    assert_eq!(session.query_bundle().unwrap().strategy, Strategy::Initial);
}
