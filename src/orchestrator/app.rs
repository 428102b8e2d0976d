//! 控制台应用 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：加载契约、创建检索与生成服务
//! 2. **交互循环**：逐行读取命令，一次只执行一个状态转移
//! 3. **结果展示**：把会话状态打印到 stdout
//!
//! 本模块不做业务判断，前置条件与状态提交都交给 `ReviewFlow`。

use anyhow::{Context, Result};
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::Paper;
use crate::orchestrator::command::{Command, HELP};
use crate::services::ReviewWriter;
use crate::utils::logging::{log_startup, truncate_text};
use crate::workflow::{ReviewFlow, Session, StepOutcome};

const ABSTRACT_PREVIEW_CHARS: usize = 300;

/// 应用主结构
pub struct App {
    flow: ReviewFlow,
    writer: ReviewWriter,
    session: Session,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        log_startup(&config);

        let flow = ReviewFlow::new(&config).context("初始化综述流程失败")?;
        let writer = ReviewWriter::new(&config.output_dir);

        Ok(Self {
            flow,
            writer,
            session: Session::new(),
        })
    }

    /// 运行交互循环，直到 quit 或输入结束
    pub async fn run(mut self) -> Result<()> {
        println!("{}", HELP);
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            print_prompt();
            let Some(line) = lines.next_line().await.context("读取输入失败")? else {
                break;
            };

            let command = match Command::parse(&line) {
                Ok(Some(command)) => command,
                Ok(None) => continue,
                Err(message) => {
                    println!("{}", message);
                    continue;
                }
            };

            if command == Command::Quit {
                break;
            }

            match self.execute(command).await {
                Ok(()) => {}
                // 本地生成结果不合格说明程序本身有缺陷，不再继续
                Err(e @ AppError::FallbackContract { .. }) => return Err(e.into()),
                Err(e) => {
                    error!("❌ 操作失败: {}", e);
                    println!("❌ 操作失败: {}", e);
                }
            }
        }

        info!("👋 会话结束 {}", self.session);
        Ok(())
    }

    async fn execute(&mut self, command: Command) -> AppResult<()> {
        match command {
            Command::Topic(topic) => {
                let outcome = self.flow.submit_topic(&mut self.session, &topic).await?;
                if report(&outcome) {
                    self.show_bundle();
                }
            }
            Command::Bundle => self.show_bundle(),
            Command::Search => {
                let outcome = self.flow.search(&mut self.session).await?;
                if report(&outcome) {
                    self.show_results();
                }
            }
            Command::Results => self.show_results(),
            Command::Iterate(strategy) => {
                let outcome = self.flow.iterate(&mut self.session, strategy).await?;
                if report(&outcome) {
                    self.show_bundle();
                    self.show_results();
                }
            }
            Command::Select(ids) => {
                let change = self.flow.add_to_basket(&mut self.session, ids.as_slice());
                println!(
                    "篮子: 新增 {} 篇，覆盖 {} 篇，共 {} 篇",
                    change.added,
                    change.replaced,
                    self.session.basket().len()
                );
                if !change.not_found.is_empty() {
                    println!("不在当前结果中: {}", change.not_found.join(", "));
                }
            }
            Command::Basket => self.show_basket(),
            Command::Cards => {
                let outcome = self.flow.generate_cards(&mut self.session).await?;
                if report(&outcome) {
                    self.show_cards();
                }
            }
            Command::Review => {
                let outcome = self.flow.generate_review(&mut self.session).await?;
                if report(&outcome) {
                    self.show_review();
                }
            }
            Command::Export(path) => self.export(path.as_deref()).await?,
            Command::Status => println!("{}", self.session),
            Command::Help => println!("{}", HELP),
            Command::Quit => {}
        }
        Ok(())
    }

    async fn export(&self, path: Option<&str>) -> AppResult<()> {
        let Some(review) = self.session.review() else {
            println!("还没有综述，请先执行 review");
            return Ok(());
        };
        let written = match path {
            Some(path) => {
                self.writer.write_to(review, Path::new(path)).await?;
                path.to_string()
            }
            None => self.writer.write(review).await?.display().to_string(),
        };
        println!("已导出: {}", written);
        Ok(())
    }

    // ========== 展示 ==========

    fn show_bundle(&self) {
        let Some(bundle) = self.session.query_bundle() else {
            println!("还没有查询方案，请先提交主题");
            return;
        };
        println!("第 {} 轮 ({}) - {}", bundle.round, bundle.strategy, bundle.rationale);
        println!("核心词: {}", bundle.core_terms.join(", "));
        println!("同义词: {}", bundle.synonyms.join(", "));
        if !bundle.narrow_terms.is_empty() {
            println!("收窄词: {}", bundle.narrow_terms.join(", "));
        }
        if !bundle.exclude_terms.is_empty() {
            println!("排除词: {}", bundle.exclude_terms.join(", "));
        }
        if !bundle.domain_shift_terms.is_empty() {
            println!("相邻领域: {}", bundle.domain_shift_terms.join(", "));
        }
        for (i, query) in bundle.search_queries.iter().enumerate() {
            println!("  查询 {}: {}", i + 1, query);
        }
    }

    fn show_results(&self) {
        let results = self.session.results();
        if results.is_empty() {
            println!("没有检索结果");
            return;
        }
        for paper in results {
            print_paper(paper);
        }
        println!("共 {} 条结果，使用 select <id> 加入篮子", results.len());
    }

    fn show_basket(&self) {
        let basket = self.session.basket();
        if basket.is_empty() {
            println!("篮子为空");
            return;
        }
        for paper in basket.papers() {
            println!("- [{}] {} ({})", paper.id, paper.title, paper.published_year);
        }
    }

    fn show_cards(&self) {
        for card in self.session.paper_cards() {
            println!("\n[{}] {}", card.paper_id, card.title);
            println!("  要点: {}", card.one_line_takeaway);
            println!("  问题: {}", card.research_question);
            println!("  关键词: {}", card.keywords.join(", "));
            if let Some(limitations) = &card.limitations {
                println!("  局限: {}", limitations);
            }
        }
    }

    fn show_review(&self) {
        if let Some(review) = self.session.review() {
            println!("{}", crate::services::review_writer::render_markdown(review));
        }
    }
}

/// 打印跳过原因，返回是否已生效
fn report(outcome: &StepOutcome) -> bool {
    match outcome {
        StepOutcome::Applied => true,
        StepOutcome::Skipped(reason) => {
            println!("⚠️ {}", reason);
            false
        }
    }
}

fn print_paper(paper: &Paper) {
    println!("\n[{}] {}", paper.id, paper.title);
    println!("  作者: {} | 年份: {}", paper.authors.join(", "), paper.published_year);
    if !paper.categories.is_empty() {
        println!("  分类: {}", paper.categories.join(", "));
    }
    println!("  摘要: {}", truncate_text(&paper.abstract_text, ABSTRACT_PREVIEW_CHARS));
    println!("  链接: {}", paper.url);
    if let Some(pdf_url) = &paper.pdf_url {
        println!("  PDF: {}", pdf_url);
    }
}

fn print_prompt() {
    use std::io::Write;
    print!("> ");
    let _ = std::io::stdout().flush();
}
