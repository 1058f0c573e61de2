//! End-to-end tests for feed aggregation against a local HTTP server.

#![cfg(feature = "sqlite")]

mod common;

use common::{add_feed, rss_document, scheduler, setup_db, Fixture, FixtureServer};
use gator::config::AggregatorConfig;
use gator::rss::{FeedSource, RssFetcher};
use gator::{CycleOutcome, FeedRepository, GatorError, PostRepository};
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_aggregate_skips_items_with_bad_dates() {
    let server = FixtureServer::start(vec![Fixture::rss(
        "/feed.xml",
        rss_document(
            "Blog",
            &[
                ("Good", "https://blog.example/good", "Mon, 02 Jan 2006 15:04:05 -0700"),
                ("Bad", "https://blog.example/bad", "not-a-date"),
            ],
        ),
    )])
    .await;
    let (db, user) = setup_db().await;
    let feed = add_feed(&db, &user, "Blog", &server.url("/feed.xml")).await;

    let scheduler = scheduler(&db, &AggregatorConfig::default());
    match scheduler.run_cycle(&CancellationToken::new()).await {
        CycleOutcome::Ingested { feed_id, report } => {
            assert_eq!(feed_id, feed.id);
            assert_eq!(report.created, 1);
            assert_eq!(report.invalid_dates, 1);
        }
        other => panic!("unexpected outcome {other:?}"),
    }

    let stored = FeedRepository::new(db.pool())
        .get_by_id(feed.id)
        .await
        .unwrap()
        .unwrap();
    assert!(stored.last_fetched_at.is_some());
    let posts = PostRepository::new(db.pool());
    assert_eq!(posts.count().await.unwrap(), 1);

    gator::db::FeedFollowRepository::new(db.pool())
        .create(user.id, feed.id)
        .await
        .unwrap();
    let listed = posts.list_for_user(user.id, 10).await.unwrap();
    assert_eq!(listed[0].post.url, "https://blog.example/good");
    assert_eq!(listed[0].post.title, "Good");
    assert_eq!(listed[0].post.description, "About Good");
    assert_eq!(
        listed[0].post.published_at.to_rfc3339(),
        "2006-01-02T22:04:05+00:00"
    );
}

#[tokio::test]
async fn test_non_xml_feed_is_parse_failure_after_marking() {
    let server = FixtureServer::start(vec![Fixture::text("/oops", "this is not xml at all")]).await;
    let (db, user) = setup_db().await;
    let feed = add_feed(&db, &user, "Oops", &server.url("/oops")).await;

    let scheduler = scheduler(&db, &AggregatorConfig::default());
    let outcome = scheduler.run_cycle(&CancellationToken::new()).await;
    assert!(
        matches!(
            outcome,
            CycleOutcome::FetchFailed { error: GatorError::Parse(_), .. }
        ),
        "unexpected outcome {outcome:?}"
    );

    let stored = FeedRepository::new(db.pool())
        .get_by_id(feed.id)
        .await
        .unwrap()
        .unwrap();
    assert!(stored.last_fetched_at.is_some());
    assert_eq!(PostRepository::new(db.pool()).count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_missing_page_is_parse_failure() {
    let server = FixtureServer::start(Vec::new()).await;
    let (db, user) = setup_db().await;
    add_feed(&db, &user, "Gone", &server.url("/gone.xml")).await;

    let scheduler = scheduler(&db, &AggregatorConfig::default());
    let outcome = scheduler.run_cycle(&CancellationToken::new()).await;
    assert!(matches!(
        outcome,
        CycleOutcome::FetchFailed { error: GatorError::Parse(_), .. }
    ));
}

#[tokio::test]
async fn test_refetch_creates_no_duplicates() {
    let server = FixtureServer::start(vec![Fixture::rss(
        "/feed.xml",
        rss_document(
            "Blog",
            &[
                ("One", "https://blog.example/1", "2024-03-10T08:00:00Z"),
                ("Two", "https://blog.example/2", "Sun, 10 Mar 2024 09:00:00 GMT"),
            ],
        ),
    )])
    .await;
    let (db, user) = setup_db().await;
    add_feed(&db, &user, "Blog", &server.url("/feed.xml")).await;

    let scheduler = scheduler(&db, &AggregatorConfig::default());
    let cancel = CancellationToken::new();

    let first = scheduler.run_cycle(&cancel).await;
    assert!(matches!(first, CycleOutcome::Ingested { report, .. } if report.created == 2));

    let second = scheduler.run_cycle(&cancel).await;
    match second {
        CycleOutcome::Ingested { report, .. } => {
            assert_eq!(report.created, 0);
            assert_eq!(report.duplicates, 2);
            assert_eq!(report.failed, 0);
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(PostRepository::new(db.pool()).count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_feeds_are_fetched_in_rotation() {
    let server = FixtureServer::start(vec![
        Fixture::rss("/a.xml", rss_document("A", &[])),
        Fixture::rss("/b.xml", rss_document("B", &[])),
    ])
    .await;
    let (db, user) = setup_db().await;
    let a = add_feed(&db, &user, "A", &server.url("/a.xml")).await;
    let b = add_feed(&db, &user, "B", &server.url("/b.xml")).await;

    let scheduler = scheduler(&db, &AggregatorConfig::default());
    let cancel = CancellationToken::new();

    let mut order = Vec::new();
    for _ in 0..4 {
        match scheduler.run_cycle(&cancel).await {
            CycleOutcome::Ingested { feed_id, .. } => order.push(feed_id),
            other => panic!("unexpected outcome {other:?}"),
        }
    }
    assert_eq!(order, vec![a.id, b.id, a.id, b.id]);
}

#[tokio::test]
async fn test_fetcher_sends_user_agent_and_unescapes() {
    let server = FixtureServer::start(vec![Fixture::rss(
        "/feed.xml",
        r#"<rss version="2.0"><channel>
             <title>Tom &amp;amp; Jerry</title>
             <item><title>Cat &amp;amp; Mouse</title><link>https://example.com/1</link></item>
           </channel></rss>"#,
    )])
    .await;

    let fetcher = RssFetcher::new(&AggregatorConfig::default()).unwrap();
    let doc = fetcher.fetch(&server.url("/feed.xml")).await.unwrap();
    assert_eq!(doc.title, "Tom & Jerry");
    assert_eq!(doc.items[0].title, "Cat & Mouse");
    assert_eq!(server.user_agents(), vec!["gator".to_string()]);
}

#[tokio::test]
async fn test_oversized_feed_is_fetch_error() {
    let items: Vec<(String, String)> = (0..50)
        .map(|i| (format!("Item {i}"), format!("https://example.com/{i}")))
        .collect();
    let refs: Vec<(&str, &str, &str)> = items
        .iter()
        .map(|(t, l)| (t.as_str(), l.as_str(), "2024-03-10T08:00:00Z"))
        .collect();
    let server =
        FixtureServer::start(vec![Fixture::rss("/big.xml", rss_document("Big", &refs))]).await;

    let config = AggregatorConfig {
        max_feed_size_bytes: 512,
        ..AggregatorConfig::default()
    };
    let fetcher = RssFetcher::new(&config).unwrap();
    let result = fetcher.fetch(&server.url("/big.xml")).await;
    assert!(matches!(result, Err(GatorError::Fetch(_))));
}

#[tokio::test]
async fn test_run_stops_on_cancel() {
    let server = FixtureServer::start(vec![Fixture::rss(
        "/feed.xml",
        rss_document("Blog", &[("One", "https://blog.example/1", "2024-03-10 08:00:00")]),
    )])
    .await;
    let (db, user) = setup_db().await;
    add_feed(&db, &user, "Blog", &server.url("/feed.xml")).await;

    let scheduler = scheduler(&db, &AggregatorConfig::default());
    let cancel = CancellationToken::new();
    let canceller = cancel.clone();

    let run = tokio::time::timeout(std::time::Duration::from_secs(5), async {
        tokio::join!(scheduler.run(cancel), async move {
            tokio::time::sleep(std::time::Duration::from_millis(300)).await;
            canceller.cancel();
        })
    });
    run.await.expect("scheduler did not stop after cancellation");

    assert_eq!(PostRepository::new(db.pool()).count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_out_of_range_year_is_skipped_and_browse_still_works() {
    let server = FixtureServer::start(vec![Fixture::rss(
        "/feed.xml",
        rss_document(
            "Blog",
            &[
                ("Late", "https://blog.example/late", "9999-12-31T23:00:00-05:00"),
                ("Signed", "https://blog.example/signed", "+12345-01-02 15:04:05"),
                ("Edge", "https://blog.example/edge", "9999-12-31T23:59:59Z"),
            ],
        ),
    )])
    .await;
    let (db, user) = setup_db().await;
    let feed = add_feed(&db, &user, "Blog", &server.url("/feed.xml")).await;

    let scheduler = scheduler(&db, &AggregatorConfig::default());
    match scheduler.run_cycle(&CancellationToken::new()).await {
        CycleOutcome::Ingested { report, .. } => {
            assert_eq!(report.created, 1);
            assert_eq!(report.invalid_dates, 2);
            assert_eq!(report.failed, 0);
        }
        other => panic!("unexpected outcome {other:?}"),
    }

    gator::db::FeedFollowRepository::new(db.pool())
        .create(user.id, feed.id)
        .await
        .unwrap();
    let posts = PostRepository::new(db.pool());
    assert_eq!(posts.count().await.unwrap(), 1);
    let listed = posts.list_for_user(user.id, 10).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].post.url, "https://blog.example/edge");
    assert_eq!(
        listed[0].post.published_at.to_rfc3339(),
        "9999-12-31T23:59:59+00:00"
    );
}
