//! Concurrent breadth-first crawler.
//!
//! A pool of `max_workers` fetch loops pulls URLs from a shared frontier,
//! fetches and parses them, and feeds newly discovered links back in. The
//! crawl stops when the frontier runs dry with no work in flight, or when
//! the page budget or wall-clock timeout trips; on a trip the frontier is
//! drained and every worker receives a shutdown sentinel so none blocks on
//! an empty queue.

use crate::error::{Result, SearchError};
use lazy_static::lazy_static;
use parking_lot::Mutex;
use reqwest::{header, redirect, Client, StatusCode, Url};
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

lazy_static! {
    static ref TITLE_SEL: Selector = Selector::parse("title").expect("valid selector");
    static ref BODY_SEL: Selector = Selector::parse("body").expect("valid selector");
    static ref ANCHOR_SEL: Selector = Selector::parse("a").expect("valid selector");
}

/// One successfully fetched and parsed page. Immutable once recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub url: String,
    pub title: String,
    /// Flattened visible text with whitespace collapsed to single spaces.
    pub content: String,
    /// Outbound links, absolute and normalized; may point outside the corpus.
    pub links: Vec<String>,
}

/// Crawl output: normalized URL to document. Frozen once the crawl returns.
pub type CorpusMap = HashMap<String, Document>;

#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Hard cap on distinct URLs claimed for fetching.
    pub max_pages: usize,
    /// Number of concurrent fetch loops.
    pub max_workers: usize,
    /// Wall-clock budget for the whole crawl, measured from start.
    pub timeout: Option<Duration>,
    /// Per-request timeout on the HTTP client.
    pub fetch_timeout: Duration,
    /// Fixed delay before each fetch attempt.
    pub politeness_delay: Duration,
    /// Response bodies larger than this are skipped.
    pub max_body_bytes: usize,
    pub user_agent: String,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_pages: 50,
            max_workers: 10,
            timeout: None,
            fetch_timeout: Duration::from_secs(10),
            politeness_delay: Duration::from_millis(50),
            max_body_bytes: 2 * 1024 * 1024,
            user_agent: "minisearch-bot/0.1 (+https://example.com/bot)".to_string(),
        }
    }
}

/// Frontier message: a URL to fetch, or the shutdown sentinel.
enum Job {
    Fetch(String),
    Shutdown,
}

/// Queue of pending jobs shared by all workers.
struct Frontier {
    queue: Mutex<VecDeque<Job>>,
    available: Notify,
}

impl Frontier {
    fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            available: Notify::new(),
        }
    }

    fn push(&self, job: Job) {
        self.queue.lock().push_back(job);
        self.available.notify_one();
    }

    async fn next(&self) -> Job {
        loop {
            // Register interest before checking the queue so a push between
            // the check and the await still wakes us.
            let notified = self.available.notified();
            if let Some(job) = self.queue.lock().pop_front() {
                return job;
            }
            notified.await;
        }
    }

    fn drain(&self) -> usize {
        let mut queue = self.queue.lock();
        let dropped = queue.len();
        queue.clear();
        dropped
    }
}

#[derive(Default)]
struct CrawlState {
    /// Normalized URLs already claimed by a worker. Never exceeds max_pages.
    visited: HashSet<String>,
    corpus: CorpusMap,
    /// Jobs queued plus jobs in flight. Zero means the crawl is quiescent.
    pending: usize,
}

struct CrawlShared {
    config: CrawlConfig,
    client: Client,
    frontier: Frontier,
    state: Mutex<CrawlState>,
    stop: AtomicBool,
    /// Wakes the coordinator on quiescence or a stop-condition trip.
    idle: Notify,
    deadline: Option<Instant>,
}

impl CrawlShared {
    fn stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
        self.idle.notify_waiters();
    }

    /// Called exactly once per dequeued fetch job.
    fn finish_job(&self) {
        let mut state = self.state.lock();
        state.pending -= 1;
        let quiescent = state.pending == 0;
        drop(state);
        if quiescent {
            self.idle.notify_waiters();
        }
    }

    async fn worker(self: Arc<Self>) {
        loop {
            match self.frontier.next().await {
                Job::Shutdown => break,
                Job::Fetch(url) => {
                    self.process(&url).await;
                    self.finish_job();
                }
            }
        }
    }

    async fn process(&self, url: &str) {
        if self.stopped() {
            return;
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            info!("crawl timeout reached, stopping");
            self.request_stop();
            return;
        }
        {
            let mut state = self.state.lock();
            if state.visited.len() >= self.config.max_pages {
                drop(state);
                info!(max_pages = self.config.max_pages, "page budget reached, stopping");
                self.request_stop();
                return;
            }
            // Check-and-insert under one lock so two workers never claim the
            // same URL. A claim counts toward the budget whether or not the
            // fetch succeeds, bounding total network calls.
            if !state.visited.insert(url.to_string()) {
                return;
            }
        }

        tokio::time::sleep(self.config.politeness_delay).await;
        let Some(html) = self.fetch(url).await else {
            return;
        };

        let page_url = url.to_string();
        let parsed = match tokio::task::spawn_blocking(move || parse_page(&html, &page_url)).await {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(%url, error = %err, "parse task failed");
                return;
            }
        };

        let mut state = self.state.lock();
        if !self.stopped() {
            for link in &parsed.links {
                if !state.visited.contains(link) {
                    state.pending += 1;
                    self.frontier.push(Job::Fetch(link.clone()));
                }
            }
        }
        state.corpus.insert(
            url.to_string(),
            Document {
                url: url.to_string(),
                title: parsed.title,
                content: parsed.content,
                links: parsed.links,
            },
        );
    }

    async fn fetch(&self, url: &str) -> Option<String> {
        let resp = match self.client.get(url).send().await {
            Ok(resp) => resp,
            Err(err) => {
                debug!(%url, error = %err, "fetch failed");
                return None;
            }
        };
        if resp.status() != StatusCode::OK {
            debug!(%url, status = %resp.status(), "skipping non-200 response");
            return None;
        }
        if let Some(content_type) = resp.headers().get(header::CONTENT_TYPE) {
            match content_type.to_str() {
                Ok(value) if value.starts_with("text/html") => {}
                _ => {
                    debug!(%url, "skipping non-HTML content type");
                    return None;
                }
            }
        }
        let bytes = match resp.bytes().await {
            Ok(bytes) => bytes,
            Err(err) => {
                debug!(%url, error = %err, "failed to read body");
                return None;
            }
        };
        if bytes.len() > self.config.max_body_bytes {
            debug!(%url, len = bytes.len(), "skipping oversized body");
            return None;
        }
        Some(String::from_utf8_lossy(&bytes).into_owned())
    }
}

pub struct Crawler {
    config: CrawlConfig,
    client: Client,
}

impl Crawler {
    pub fn new(config: CrawlConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .redirect(redirect::Policy::limited(5))
            .timeout(config.fetch_timeout)
            .build()
            .map_err(|err| SearchError::Client(err.to_string()))?;
        Ok(Self { config, client })
    }

    /// Crawl breadth-first from the seeds until the frontier is exhausted or
    /// a stop condition (page budget, timeout) trips.
    ///
    /// Individual page failures are logged and skipped; they never abort the
    /// crawl. With a timeout set, the call returns within the timeout plus a
    /// grace period bounded by the slowest in-flight fetch.
    pub async fn crawl(&self, seeds: &[String]) -> CorpusMap {
        let started = Instant::now();
        let workers = self.config.max_workers.max(1);
        let shared = Arc::new(CrawlShared {
            config: self.config.clone(),
            client: self.client.clone(),
            frontier: Frontier::new(),
            state: Mutex::new(CrawlState::default()),
            stop: AtomicBool::new(false),
            idle: Notify::new(),
            deadline: self.config.timeout.map(|t| started + t),
        });

        let mut unique = HashSet::new();
        {
            let mut state = shared.state.lock();
            for seed in seeds {
                match parse_seed(seed) {
                    Some(url) => {
                        if unique.insert(url.clone()) {
                            state.pending += 1;
                            shared.frontier.push(Job::Fetch(url));
                        }
                    }
                    None => debug!(%seed, "skipping unparsable seed"),
                }
            }
        }
        if unique.is_empty() {
            info!("no valid seeds, nothing to crawl");
            return CorpusMap::new();
        }
        info!(
            seeds = unique.len(),
            max_pages = self.config.max_pages,
            workers,
            "crawl started"
        );

        let mut pool = JoinSet::new();
        for _ in 0..workers {
            pool.spawn(Arc::clone(&shared).worker());
        }

        loop {
            let notified = shared.idle.notified();
            if shared.stopped() || shared.state.lock().pending == 0 {
                break;
            }
            match shared.deadline {
                Some(deadline) => {
                    tokio::select! {
                        _ = notified => {}
                        _ = tokio::time::sleep_until(deadline.into()) => {
                            info!("crawl timeout expired");
                            shared.request_stop();
                            break;
                        }
                    }
                }
                None => notified.await,
            }
        }

        let dropped = shared.frontier.drain();
        if dropped > 0 {
            debug!(dropped, "drained frontier after stop");
        }
        for _ in 0..workers {
            shared.frontier.push(Job::Shutdown);
        }
        while pool.join_next().await.is_some() {}

        let state = std::mem::take(&mut *shared.state.lock());
        info!(
            pages = state.corpus.len(),
            visited = state.visited.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "crawl finished"
        );
        state.corpus
    }
}

struct ParsedPage {
    title: String,
    content: String,
    links: Vec<String>,
}

fn parse_page(html: &str, page_url: &str) -> ParsedPage {
    let doc = Html::parse_document(html);
    let base = Url::parse(page_url).ok();

    let title = doc
        .select(&TITLE_SEL)
        .next()
        .map(|node| node.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| page_url.to_string());

    let raw_text = match doc.select(&BODY_SEL).next() {
        Some(body) => body.text().collect::<String>(),
        None => doc.root_element().text().collect::<String>(),
    };
    let content = raw_text.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut links = Vec::new();
    if let Some(base) = &base {
        for anchor in doc.select(&ANCHOR_SEL) {
            if let Some(href) = anchor.value().attr("href") {
                if let Some(link) = resolve_link(base, href) {
                    links.push(link);
                }
            }
        }
    }

    ParsedPage { title, content, links }
}

/// Resolve an href against the page URL and normalize it. Returns `None` for
/// non-http(s) schemes and unparsable hrefs.
fn resolve_link(base: &Url, href: &str) -> Option<String> {
    let url = Url::parse(href).or_else(|_| base.join(href)).ok()?;
    normalize_url(url)
}

/// Canonical string form: http(s) only, fragment stripped, one trailing
/// slash trimmed so `/page` and `/page/` collapse to the same corpus key.
fn normalize_url(mut url: Url) -> Option<String> {
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.set_fragment(None);
    let mut s = url.to_string();
    if s.ends_with('/') {
        s.pop();
    }
    Some(s)
}

fn parse_seed(seed: &str) -> Option<String> {
    let trimmed = seed.trim();
    if trimmed.is_empty() {
        return None;
    }
    let url = Url::parse(trimmed)
        .or_else(|_| Url::parse(&format!("https://{trimmed}")))
        .ok()?;
    normalize_url(url)
}
