//! Test helpers for E2E tests.
//!
//! Provides a fixture HTTP server for feeds and database setup helpers.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use gator::config::AggregatorConfig;
use gator::rss::{Feed, NewFeed};
use gator::{Database, FeedRepository, PostRepository, RssFetcher, Scheduler, User, UserRepository};

/// Content type used for RSS fixtures.
pub const RSS_CONTENT_TYPE: &str = "application/rss+xml";

/// A canned HTTP response.
#[derive(Debug, Clone)]
pub struct Fixture {
    pub path: &'static str,
    pub status: StatusCode,
    pub content_type: &'static str,
    pub body: String,
}

impl Fixture {
    /// An RSS document served with 200 OK.
    pub fn rss(path: &'static str, body: impl Into<String>) -> Self {
        Self {
            path,
            status: StatusCode::OK,
            content_type: RSS_CONTENT_TYPE,
            body: body.into(),
        }
    }

    /// A plain text body served with 200 OK.
    pub fn text(path: &'static str, body: impl Into<String>) -> Self {
        Self {
            path,
            status: StatusCode::OK,
            content_type: "text/plain",
            body: body.into(),
        }
    }
}

/// Local HTTP server serving fixtures on an ephemeral port.
pub struct FixtureServer {
    addr: SocketAddr,
    user_agents: Arc<Mutex<Vec<String>>>,
    handle: JoinHandle<()>,
}

impl FixtureServer {
    /// Start serving `fixtures`. Unknown paths get an empty 404.
    pub async fn start(fixtures: Vec<Fixture>) -> Self {
        let user_agents = Arc::new(Mutex::new(Vec::new()));

        let mut app = Router::new();
        for fixture in fixtures {
            let seen = Arc::clone(&user_agents);
            let path = fixture.path;
            app = app.route(
                path,
                get(move |headers: HeaderMap| {
                    let fixture = fixture.clone();
                    async move {
                        if let Some(agent) = headers
                            .get(header::USER_AGENT)
                            .and_then(|v| v.to_str().ok())
                        {
                            seen.lock().unwrap().push(agent.to_string());
                        }
                        (
                            fixture.status,
                            [(header::CONTENT_TYPE, fixture.content_type)],
                            fixture.body,
                        )
                    }
                }),
            );
        }

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            user_agents,
            handle,
        }
    }

    /// Absolute URL for `path` on this server.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// User-Agent headers seen so far.
    pub fn user_agents(&self) -> Vec<String> {
        self.user_agents.lock().unwrap().clone()
    }
}

impl Drop for FixtureServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Build an RSS 2.0 document from `(title, link, pub_date)` items.
pub fn rss_document(title: &str, items: &[(&str, &str, &str)]) -> String {
    let mut xml = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<rss version=\"2.0\">\n<channel>\n\
         <title>{title}</title>\n<link>https://example.com/</link>\n\
         <description>Fixture feed</description>\n"
    );
    for (item_title, link, pub_date) in items {
        xml.push_str(&format!(
            "<item><title>{item_title}</title><link>{link}</link>\
             <pubDate>{pub_date}</pubDate><description>About {item_title}</description></item>\n"
        ));
    }
    xml.push_str("</channel>\n</rss>\n");
    xml
}

/// In-memory database with one user.
pub async fn setup_db() -> (Database, User) {
    let db = Database::open_in_memory().await.unwrap();
    let user = UserRepository::new(db.pool()).create("alice").await.unwrap();
    (db, user)
}

/// Register a feed owned by `user`.
pub async fn add_feed(db: &Database, user: &User, name: &str, url: &str) -> Feed {
    FeedRepository::new(db.pool())
        .create(&NewFeed::new(name, url, user.id))
        .await
        .unwrap()
}

/// Scheduler over `db` using a real HTTP fetcher.
pub fn scheduler<'a>(
    db: &'a Database,
    config: &AggregatorConfig,
) -> Scheduler<FeedRepository<'a>, PostRepository<'a>, RssFetcher> {
    Scheduler::new(
        FeedRepository::new(db.pool()),
        PostRepository::new(db.pool()),
        RssFetcher::new(config).unwrap(),
        std::time::Duration::from_secs(60),
    )
}
