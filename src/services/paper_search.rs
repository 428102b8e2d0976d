//! 文献检索服务 - 业务能力层
//!
//! 只负责"按查询串检索论文"能力，不关心流程
//!
//! 对接 arXiv 的 Atom 接口：一次请求、一个窗口，不翻页、不重试。

use async_trait::async_trait;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::config::Config;
use crate::error::{AppError, AppResult, ConfigError, SearchError};
use crate::models::Paper;

/// 出版年份未知时使用的哨兵值
pub const UNKNOWN_YEAR: i32 = 1900;

const PROVIDER: &str = "arxiv";

/// 检索提供方
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// 提供方名称（用于日志）
    fn name(&self) -> &str;

    /// 检索一个窗口的论文
    ///
    /// # 返回
    /// 返回 (论文列表, 请求耗时毫秒)
    async fn search(&self, query: &str, max_results: usize, start: usize) -> AppResult<(Vec<Paper>, u64)>;
}

/// arXiv 检索
pub struct ArxivSearch {
    http: Client,
    endpoint: String,
}

impl ArxivSearch {
    /// 创建新的检索服务
    pub fn new(config: &Config) -> AppResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.search_timeout_secs))
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: config.search_api_url.clone(),
        })
    }
}

#[async_trait]
impl SearchProvider for ArxivSearch {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn search(&self, query: &str, max_results: usize, start: usize) -> AppResult<(Vec<Paper>, u64)> {
        debug!("arXiv 检索: {} (start={}, max_results={})", query, start, max_results);

        let started = Instant::now();
        let response = self
            .http
            .get(&self.endpoint)
            .query(&[
                ("search_query", query.to_string()),
                ("start", start.to_string()),
                ("max_results", max_results.to_string()),
            ])
            .send()
            .await
            .map_err(|e| AppError::search_request_failed(&self.endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::BadStatus {
                endpoint: self.endpoint.clone(),
                status: status.as_u16(),
            }
            .into());
        }

        let body = response
            .text()
            .await
            .map_err(|e| AppError::search_request_failed(&self.endpoint, e))?;
        let latency_ms = started.elapsed().as_millis() as u64;

        let papers = parse_atom_feed(&body)?;
        debug!("arXiv 返回 {} 条结果，耗时 {} ms", papers.len(), latency_ms);

        Ok((papers, latency_ms))
    }
}

// ========== Atom 解析 ==========

/// 当前正在收集文本的字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextField {
    Id,
    Title,
    Summary,
    Published,
    AuthorName,
}

/// 单个 `<entry>` 的原始字段
#[derive(Debug, Default)]
struct RawEntry {
    id: String,
    title: String,
    summary: String,
    published: String,
    authors: Vec<String>,
    alternate: Option<String>,
    pdf: Option<String>,
    categories: Vec<String>,
}

impl RawEntry {
    fn absorb_link(&mut self, element: &BytesStart) {
        let mut rel = None;
        let mut href = None;
        let mut title = None;
        for attr in element.attributes().flatten() {
            let value = attr
                .unescape_value()
                .map(|v| v.to_string())
                .unwrap_or_default();
            match attr.key.local_name().as_ref() {
                b"rel" => rel = Some(value),
                b"href" => href = Some(value),
                b"title" => title = Some(value),
                _ => {}
            }
        }
        let Some(href) = href.filter(|h| !h.is_empty()) else {
            return;
        };
        if rel.as_deref() == Some("alternate") {
            self.alternate = Some(href.clone());
        }
        if title.as_deref() == Some("pdf") {
            self.pdf = Some(href);
        }
    }

    fn absorb_category(&mut self, element: &BytesStart) {
        for attr in element.attributes().flatten() {
            if attr.key.local_name().as_ref() == b"term" {
                let term = attr
                    .unescape_value()
                    .map(|v| v.to_string())
                    .unwrap_or_default();
                if !term.is_empty() {
                    self.categories.push(term);
                }
            }
        }
    }

    fn into_paper(self) -> Paper {
        let id = self.id.trim().to_string();
        let published = self.published.trim();

        Paper {
            provider: PROVIDER.to_string(),
            id: normalize_id(&id),
            title: flatten_text(&self.title),
            authors: self
                .authors
                .into_iter()
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty())
                .collect(),
            published_year: parse_year(published),
            abstract_text: flatten_text(&self.summary),
            url: self.alternate.unwrap_or_else(|| id.clone()),
            pdf_url: self.pdf,
            categories: self.categories,
            score: None,
        }
    }
}

/// 解析 Atom feed，每个 `<entry>` 生成一篇论文
pub fn parse_atom_feed(xml: &str) -> Result<Vec<Paper>, SearchError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut papers = Vec::new();
    let mut current: Option<RawEntry> = None;
    let mut field: Option<TextField> = None;
    let mut in_author = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let local = e.local_name();
                if local.as_ref() == b"entry" {
                    current = Some(RawEntry::default());
                    field = None;
                    in_author = false;
                } else if let Some(entry) = current.as_mut() {
                    match local.as_ref() {
                        b"id" => field = Some(TextField::Id),
                        b"title" => field = Some(TextField::Title),
                        b"summary" => field = Some(TextField::Summary),
                        b"published" => field = Some(TextField::Published),
                        b"author" => in_author = true,
                        b"name" if in_author => {
                            entry.authors.push(String::new());
                            field = Some(TextField::AuthorName);
                        }
                        b"link" => entry.absorb_link(&e),
                        b"category" => entry.absorb_category(&e),
                        _ => {}
                    }
                }
            }
            Ok(Event::Empty(e)) => {
                if let Some(entry) = current.as_mut() {
                    match e.local_name().as_ref() {
                        b"link" => entry.absorb_link(&e),
                        b"category" => entry.absorb_category(&e),
                        _ => {}
                    }
                }
            }
            Ok(Event::Text(t)) => {
                if let (Some(entry), Some(target)) = (current.as_mut(), field) {
                    let text = t
                        .unescape()
                        .map_err(|e| SearchError::ParseFailed { source: Box::new(e) })?;
                    append_text(entry, target, &text);
                }
            }
            Ok(Event::CData(t)) => {
                if let (Some(entry), Some(target)) = (current.as_mut(), field) {
                    let text = String::from_utf8_lossy(&t).to_string();
                    append_text(entry, target, &text);
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"entry" => {
                    if let Some(entry) = current.take() {
                        papers.push(entry.into_paper());
                    }
                    field = None;
                }
                b"author" => in_author = false,
                b"id" | b"title" | b"summary" | b"published" | b"name" => field = None,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(SearchError::ParseFailed { source: Box::new(e) }),
            _ => {}
        }
    }

    Ok(papers)
}

fn append_text(entry: &mut RawEntry, target: TextField, text: &str) {
    let slot = match target {
        TextField::Id => &mut entry.id,
        TextField::Title => &mut entry.title,
        TextField::Summary => &mut entry.summary,
        TextField::Published => &mut entry.published,
        TextField::AuthorName => match entry.authors.last_mut() {
            Some(name) => name,
            None => return,
        },
    };
    slot.push_str(text);
}

/// `http://arxiv.org/abs/1234.5678v1` → `1234.5678v1`；没有 `/abs/` 时原样返回
pub fn normalize_id(raw: &str) -> String {
    match raw.rsplit_once("/abs/") {
        Some((_, tail)) => tail.to_string(),
        None => raw.to_string(),
    }
}

/// 取时间戳前四位作为年份，非数字时返回 [`UNKNOWN_YEAR`]
pub fn parse_year(published: &str) -> i32 {
    published
        .get(..4)
        .filter(|y| y.chars().all(|c| c.is_ascii_digit()))
        .and_then(|y| y.parse().ok())
        .unwrap_or(UNKNOWN_YEAR)
}

/// 去掉首尾空白，换行（含 CRLF 与单独的 CR）替换为空格
fn flatten_text(text: &str) -> String {
    text.trim().replace("\r\n", "\n").replace(['\r', '\n'], " ")
}
