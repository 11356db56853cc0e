//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end, writing into temporary output roots.

use site_harvest::config::{
    Config, CrawlerConfig, ExtractionConfig, OutputConfig, SiteConfig, UserAgentConfig,
    DEFAULT_EXCLUDED_EXTENSIONS, DEFAULT_EXCLUDED_PREFIXES,
};
use site_harvest::crawler::{Coordinator, FetchErrorKind};
use site_harvest::run_crawl;
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PNG_BYTES: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x01];

/// Creates a test configuration scoped to the mock server's host
fn create_test_config(server: &MockServer, seeds: &[&str], root: &Path) -> Config {
    Config {
        crawler: CrawlerConfig {
            delay_ms: 0, // No politeness delay against the mock server
            request_timeout_secs: 5,
            max_pages: None,
            seeds_only: false,
            workers: 1,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestHarvester".to_string(),
            crawler_version: "1.0".to_string(),
            contact_url: "https://example.org/contact".to_string(),
            contact_email: "test@example.org".to_string(),
        },
        output: OutputConfig {
            root: root.to_string_lossy().into_owned(),
            summary_path: None,
        },
        site: SiteConfig {
            hosts: vec!["127.0.0.1".to_string()],
            seeds: seeds
                .iter()
                .map(|s| format!("{}{}", server.uri(), s))
                .collect(),
            excluded_extensions: DEFAULT_EXCLUDED_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            excluded_prefixes: DEFAULT_EXCLUDED_PREFIXES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        },
        extraction: ExtractionConfig::default(),
    }
}

fn html_page(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_raw(format!(
            "<html><head><title>t</title></head><body>{}</body></html>",
            body
        ), "text/html; charset=utf-8")
}

fn png() -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_bytes(PNG_BYTES.to_vec())
        .insert_header("content-type", "image/png")
}

async fn mount_page(server: &MockServer, route: &str, body: &str, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(html_page(body))
        .expect(expected_calls)
        .mount(server)
        .await;
}

/// Lists every file under `dir`, relative and `/`-separated, sorted
fn list_files(dir: &Path) -> Vec<String> {
    fn walk(base: &Path, dir: &Path, out: &mut Vec<String>) {
        for entry in fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                walk(base, &path, out);
            } else {
                let rel = path.strip_prefix(base).unwrap();
                let parts: Vec<_> = rel
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect();
                out.push(parts.join("/"));
            }
        }
    }

    let mut out = Vec::new();
    if dir.exists() {
        walk(dir, dir, &mut out);
    }
    out.sort();
    out
}

#[tokio::test]
async fn test_shared_image_downloaded_once() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();

    mount_page(
        &server,
        "/docs/intro",
        r#"<div class="item-page"><h1>Intro</h1><img src="img/pic.png" alt="pic"></div>
           <a href="/docs/other">Other</a>"#,
        1,
    )
    .await;
    mount_page(
        &server,
        "/docs/other",
        r#"<div class="item-page"><h1>Other</h1><img src="/docs/img/pic.png"></div>
           <a href="/docs/intro">Back</a>"#,
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/docs/img/pic.png"))
        .respond_with(png())
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(&server, &["/docs/intro"], root.path());
    let summary = run_crawl(config).await.unwrap();

    assert_eq!(summary.pages_visited, 2);
    assert_eq!(summary.assets.downloaded, 1);
    assert_eq!(summary.assets.reused, 1);

    let images = list_files(&root.path().join("images"));
    assert_eq!(images, vec!["docs/intro/pic.png".to_string()]);
    assert_eq!(
        fs::read(root.path().join("images/docs/intro/pic.png")).unwrap(),
        PNG_BYTES
    );

    let original = format!("{}/docs/img/pic.png", server.uri());
    for page in ["docs/intro/item-page.html", "docs/other/item-page.html"] {
        let content = fs::read_to_string(root.path().join(page)).unwrap();
        assert!(content.contains(r#"src="images/docs/intro/pic.png""#), "{}", page);
        assert!(
            content.contains(&format!(r#"data-original-src="{}""#, original)),
            "{}",
            page
        );
    }
}

#[tokio::test]
async fn test_saved_files_carry_provenance_header() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();

    mount_page(
        &server,
        "/about",
        r#"<nav><a href="/">Home</a></nav>
           <div class="item-page"><ul class="breadcrumb"><li>Home</li></ul><p>About us</p>
           <script>track()</script></div>"#,
        1,
    )
    .await;

    let mut config = create_test_config(&server, &["/about"], root.path());
    config.crawler.seeds_only = true;
    run_crawl(config).await.unwrap();

    let content = fs::read_to_string(root.path().join("about/item-page.html")).unwrap();
    let mut lines = content.lines();
    assert_eq!(
        lines.next().unwrap(),
        format!("<!-- Source: {}/about -->", server.uri())
    );
    let scraped = lines.next().unwrap();
    assert!(scraped.starts_with("<!-- Scraped: ") && scraped.ends_with(" -->"));
    assert_eq!(scraped.len(), "<!-- Scraped: 2024-01-01 00:00:00 -->".len());

    assert!(content.contains("<p>About us</p>"));
    assert!(!content.contains("track()"));
    assert!(!content.contains("breadcrumb"));
}

#[tokio::test]
async fn test_javascript_and_fragment_links() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();

    mount_page(
        &server,
        "/docs/intro",
        r#"<div class="item-page">Intro</div>
           <a href="javascript:void(0)">js</a>
           <a href="/docs/intro#section">self</a>
           <a href="/docs/guide#top">guide</a>
           <a href="/docs/guide/">guide again</a>"#,
        1,
    )
    .await;
    mount_page(
        &server,
        "/docs/guide",
        r#"<div class="item-page">Guide</div><a href="/docs/intro">intro</a>"#,
        1,
    )
    .await;

    let config = create_test_config(&server, &["/docs/intro"], root.path());
    let summary = run_crawl(config).await.unwrap();

    assert_eq!(summary.pages_visited, 2);
    assert_eq!(summary.links_enqueued, 1);
    assert_eq!(summary.total_fetch_failures(), 0);
}

#[tokio::test]
async fn test_404_seed_visited_once_and_crawl_continues() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    mount_page(
        &server,
        "/alive",
        r#"<div class="item-page">alive</div><a href="/gone">dead link</a>"#,
        1,
    )
    .await;

    let config = create_test_config(&server, &["/gone", "/alive"], root.path());
    let summary = run_crawl(config).await.unwrap();

    assert_eq!(summary.pages_visited, 2);
    assert_eq!(summary.fetch_failures.get(&FetchErrorKind::HttpStatus), Some(&1));
    assert_eq!(summary.pages_saved, 1);
    assert!(!root.path().join("gone").exists());
    assert!(root.path().join("alive/item-page.html").is_file());
}

#[tokio::test]
async fn test_page_cap_stops_after_exact_count() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();

    let links: String = (0..10)
        .map(|i| format!(r#"<a href="/p{}">p{}</a>"#, i, i))
        .collect();
    mount_page(&server, "/hub", &format!(r#"<div class="item-page">hub</div>{}"#, links), 1).await;
    Mock::given(method("GET"))
        .respond_with(html_page(r#"<div class="item-page">leaf</div>"#))
        .mount(&server)
        .await;

    let mut config = create_test_config(&server, &["/hub"], root.path());
    config.crawler.max_pages = Some(3);
    let summary = run_crawl(config).await.unwrap();

    assert_eq!(summary.pages_visited, 3);
    assert!(summary.cap_reached);
    assert_eq!(summary.links_enqueued, 10);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);
}

#[tokio::test]
async fn test_page_without_regions_still_followed() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();

    mount_page(
        &server,
        "/landing",
        r#"<div class="hero"><p>Welcome</p><a href="/docs/intro">Start</a></div>"#,
        1,
    )
    .await;
    mount_page(&server, "/docs/intro", r#"<div class="item-page">Intro</div>"#, 1).await;

    let config = create_test_config(&server, &["/landing"], root.path());
    let summary = run_crawl(config).await.unwrap();

    assert_eq!(summary.pages_visited, 2);
    assert_eq!(summary.pages_no_content, 1);
    assert!(!root.path().join("landing").exists());
    assert_eq!(list_files(root.path()), vec!["docs/intro/item-page.html".to_string()]);
}

#[tokio::test]
async fn test_seeds_only_mode_ignores_links() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();

    mount_page(
        &server,
        "/a",
        r#"<div class="item-page">a</div><a href="/b">b</a><a href="/c">c</a>"#,
        1,
    )
    .await;
    mount_page(&server, "/b", r#"<div class="item-page">b</div>"#, 0).await;
    mount_page(&server, "/c", r#"<div class="item-page">c</div>"#, 1).await;

    let mut config = create_test_config(&server, &["/a", "/c"], root.path());
    config.crawler.seeds_only = true;
    let summary = run_crawl(config).await.unwrap();

    assert_eq!(summary.pages_visited, 2);
    assert_eq!(summary.links_enqueued, 0);
}

#[tokio::test]
async fn test_blog_posts_written_numbered() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();

    mount_page(
        &server,
        "/news",
        r#"<div class="blog">
             <div class="leading-0" itemprop="blogPost"><h2>First</h2></div>
             <div class="leading-1" itemprop="blogPost"><h2>Second</h2></div>
           </div>"#,
        1,
    )
    .await;
    mount_page(
        &server,
        "/about/team.html",
        r#"<div class="item-page">Team</div>
           <div itemprop="blogPost">Member</div>"#,
        1,
    )
    .await;

    let config = create_test_config(&server, &["/news", "/about/team.html"], root.path());
    let summary = run_crawl(config).await.unwrap();

    assert_eq!(summary.files_written, 4);
    assert_eq!(
        list_files(root.path()),
        vec![
            "about/team.html".to_string(),
            "about/team/blogpost-1.html".to_string(),
            "news/blogpost-1.html".to_string(),
            "news/blogpost-2.html".to_string(),
        ]
    );
    let second = fs::read_to_string(root.path().join("news/blogpost-2.html")).unwrap();
    assert!(second.contains("Second"));
}

#[tokio::test]
async fn test_colliding_routes_keep_first_page() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();

    mount_page(&server, "/docs", r#"<div class="item-page">FIRST</div>"#, 1).await;
    mount_page(
        &server,
        "/docs/item-page.html",
        r#"<div class="item-page">SECOND</div>"#,
        1,
    )
    .await;

    let config = create_test_config(&server, &["/docs", "/docs/item-page.html"], root.path());
    let summary = run_crawl(config).await.unwrap();

    assert_eq!(summary.pages_visited, 2);
    assert_eq!(summary.pages_saved, 1);
    assert_eq!(summary.write_failures, 1);
    assert_eq!(list_files(root.path()), vec!["docs/item-page.html".to_string()]);
    let content = fs::read_to_string(root.path().join("docs/item-page.html")).unwrap();
    assert!(content.starts_with(&format!("<!-- Source: {}/docs -->", server.uri())));
    assert!(content.contains("FIRST"));
}

#[tokio::test]
async fn test_root_page_saved_under_index() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();

    mount_page(&server, "/", r#"<main><p>Home</p></main>"#, 1).await;

    let config = create_test_config(&server, &["/"], root.path());
    run_crawl(config).await.unwrap();

    let content = fs::read_to_string(root.path().join("index/item-page.html")).unwrap();
    assert!(content.contains("<main><p>Home</p></main>"));
}

#[tokio::test]
async fn test_non_html_pages_skipped() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();

    mount_page(
        &server,
        "/start",
        r#"<div class="item-page">s</div><a href="/feed">feed</a>"#,
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("{}", "application/json"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(&server, &["/start"], root.path());
    let summary = run_crawl(config).await.unwrap();

    assert_eq!(
        summary
            .fetch_failures
            .get(&FetchErrorKind::UnexpectedContentType),
        Some(&1)
    );
    assert!(!root.path().join("feed").exists());
}

#[tokio::test]
async fn test_concurrent_workers_preserve_dedup() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();

    // Every page links to every other page and embeds the same image
    let pages: Vec<String> = (0..12).map(|i| format!("/p{}", i)).collect();
    let links: String = pages
        .iter()
        .map(|p| format!(r#"<a href="{}">x</a>"#, p))
        .collect();
    for page in &pages {
        mount_page(
            &server,
            page,
            &format!(
                r#"<div class="item-page"><img src="/shared/logo.png"></div>{}"#,
                links
            ),
            1,
        )
        .await;
    }
    Mock::given(method("GET"))
        .and(path("/shared/logo.png"))
        .respond_with(png().set_delay(std::time::Duration::from_millis(50)))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = create_test_config(&server, &["/p0"], root.path());
    config.crawler.workers = 4;
    let summary = Coordinator::new(config).unwrap().run().await.unwrap();

    assert_eq!(summary.pages_visited, 12);
    assert_eq!(summary.pages_saved, 12);
    assert_eq!(summary.assets.downloaded, 1);
    assert_eq!(summary.assets.reused, 11);
    assert_eq!(list_files(&root.path().join("images")).len(), 1);
}
