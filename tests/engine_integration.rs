//! End-to-end tests driving the full pipeline against a local HTTP server.

use axum::extract::Path;
use axum::http::{header, StatusCode};
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use minisearch::{build_index, CrawlConfig, Crawler, RankConfig, SearchEngine, SearchError};
use std::net::SocketAddr;
use std::time::{Duration, Instant};

async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn test_config(max_pages: usize) -> CrawlConfig {
    CrawlConfig {
        max_pages,
        max_workers: 4,
        politeness_delay: Duration::from_millis(1),
        ..CrawlConfig::default()
    }
}

fn page(title: &str, body: &str) -> Html<String> {
    Html(format!("<html><head><title>{title}</title></head><body>{body}</body></html>"))
}

#[tokio::test]
async fn authority_orders_equal_relevance() {
    // A and B both vote for C; C votes for A; B receives nothing.
    let app = Router::new()
        .route("/a", get(|| async { page("A", r#"keyword <a href="/c">c</a>"#) }))
        .route("/b", get(|| async { page("B", r#"keyword <a href="/c">c</a>"#) }))
        .route("/c", get(|| async { page("C", r#"keyword <a href="/a">a</a>"#) }));
    let addr = serve(app).await;
    let base = format!("http://{addr}");

    let mut engine = SearchEngine::with_config(test_config(10), RankConfig::default());
    engine
        .build(&[format!("{base}/a"), format!("{base}/b")])
        .await
        .unwrap();

    let hits = engine.search("keyword").unwrap();
    let titles: Vec<&str> = hits.iter().map(|h| h.title.as_str()).collect();
    assert_eq!(titles, vec!["C", "A", "B"]);
}

#[tokio::test]
async fn crawl_never_exceeds_max_pages() {
    // Every page fans out to three fresh pages.
    async fn fanout(Path(n): Path<u64>) -> Html<String> {
        page(
            &format!("p{n}"),
            &format!(
                r#"word <a href="/page/{}">x</a> <a href="/page/{}">y</a> <a href="/page/{}">z</a>"#,
                3 * n + 1,
                3 * n + 2,
                3 * n + 3
            ),
        )
    }
    let app = Router::new().route("/page/:n", get(fanout));
    let addr = serve(app).await;

    let crawler = Crawler::new(test_config(5)).unwrap();
    let corpus = crawler.crawl(&[format!("http://{addr}/page/0")]).await;

    assert!(!corpus.is_empty());
    assert!(corpus.len() <= 5);
}

#[tokio::test]
async fn crawl_timeout_bounds_runtime() {
    // Slow pages with an endless chain of links.
    async fn slow(Path(n): Path<u64>) -> Html<String> {
        tokio::time::sleep(Duration::from_millis(300)).await;
        page(
            &format!("s{n}"),
            &format!(r#"word <a href="/slow/{}">next</a>"#, n + 1),
        )
    }
    let app = Router::new().route("/slow/:n", get(slow));
    let addr = serve(app).await;

    let config = CrawlConfig {
        max_pages: 10_000,
        max_workers: 2,
        timeout: Some(Duration::from_millis(500)),
        politeness_delay: Duration::from_millis(1),
        ..CrawlConfig::default()
    };
    let crawler = Crawler::new(config).unwrap();
    let started = Instant::now();
    crawler.crawl(&[format!("http://{addr}/slow/0")]).await;

    // Timeout plus a grace period bounded by the in-flight fetch.
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn page_failures_do_not_abort_the_crawl() {
    let app = Router::new()
        .route(
            "/",
            get(|| async {
                page(
                    "root",
                    r#"hello <a href="/bad">bad</a> <a href="/data">data</a> <a href="/ok">ok</a>"#,
                )
            }),
        )
        .route("/bad", get(|| async { StatusCode::INTERNAL_SERVER_ERROR }))
        .route(
            "/data",
            get(|| async { ([(header::CONTENT_TYPE, "application/json")], "{\"a\":1}") }),
        )
        .route("/ok", get(|| async { page("ok", "hello again") }));
    let addr = serve(app).await;

    let crawler = Crawler::new(test_config(10)).unwrap();
    let corpus = crawler.crawl(&[format!("http://{addr}/")]).await;

    let mut titles: Vec<&str> = corpus.values().map(|d| d.title.as_str()).collect();
    titles.sort_unstable();
    assert_eq!(titles, vec!["ok", "root"]);

    // Doc maps stay bijective over whatever survived the crawl.
    let index = build_index(&corpus);
    for url in corpus.keys() {
        let id = index.doc_map[url];
        assert_eq!(&index.reverse_doc_map[id as usize], url);
    }
}

#[tokio::test]
async fn unreachable_seeds_degrade_to_empty_results() {
    let config = CrawlConfig {
        max_pages: 5,
        max_workers: 2,
        fetch_timeout: Duration::from_millis(200),
        politeness_delay: Duration::from_millis(1),
        ..CrawlConfig::default()
    };
    let mut engine = SearchEngine::with_config(config, RankConfig::default());
    engine
        .build(&["http://127.0.0.1:9/nothing".to_string()])
        .await
        .unwrap();

    assert!(engine.search("python").unwrap().is_empty());
}

#[test]
fn search_before_build_is_a_distinct_error() {
    let engine = SearchEngine::new();
    assert!(matches!(
        engine.search("anything"),
        Err(SearchError::NotBuilt)
    ));
}
