//! End-to-end engine tests against wiremock upstreams.

use mdxconfig::{ProviderConfig, ProviderSettings, RateQuota};
use mdxmodel::ProviderId;
use mdxsearch::{PodcastQuery, SearchEngine, StationQuery};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn rb_station(uuid: &str, name: &str, url: &str, votes: u64) -> serde_json::Value {
    json!({
        "stationuuid": uuid,
        "name": name,
        "url": url,
        "url_resolved": url,
        "tags": "news",
        "country": "United Kingdom",
        "countrycode": "GB",
        "votes": votes,
        "clickcount": 0,
        "codec": "MP3",
        "bitrate": 128,
        "ssl_error": 2
    })
}

fn sc_station(id: u64, name: &str, stream_url: Option<&str>, listeners: u64) -> serde_json::Value {
    json!({
        "ID": id,
        "Name": name,
        "Bitrate": 64,
        "Genre": "news",
        "Listeners": listeners,
        "Format": "audio/mpeg",
        "StreamUrl": stream_url
    })
}

/// Engine over two mocked station directories; radiobox disabled.
fn station_settings(rb: &MockServer, sc: &MockServer) -> ProviderSettings {
    let mut settings = ProviderSettings::builtin();

    let mut rb_cfg = ProviderConfig::defaults(ProviderId::RadioBrowser);
    rb_cfg.base_url = Some(rb.uri());
    settings.insert(rb_cfg);

    let mut sc_cfg = ProviderConfig::defaults(ProviderId::Shoutcast);
    sc_cfg.base_url = Some(sc.uri());
    settings.insert(sc_cfg);

    let mut rbx_cfg = ProviderConfig::defaults(ProviderId::Radiobox);
    rbx_cfg.enabled = false;
    settings.insert(rbx_cfg);

    settings
}

/// Engine over mocked itunes + podcast-index; taddy stays credential-less.
fn podcast_settings(
    itunes: &MockServer,
    pi: &MockServer,
    pi_quota: Option<RateQuota>,
) -> ProviderSettings {
    let mut settings = ProviderSettings::builtin();

    let mut it_cfg = ProviderConfig::defaults(ProviderId::Itunes);
    it_cfg.base_url = Some(itunes.uri());
    settings.insert(it_cfg);

    let mut pi_cfg = ProviderConfig::defaults(ProviderId::PodcastIndex);
    pi_cfg.base_url = Some(pi.uri());
    pi_cfg.credentials.api_key = Some("test-key".to_string());
    pi_cfg.credentials.api_secret = Some("test-secret".to_string());
    pi_cfg.rate_quota = pi_quota;
    settings.insert(pi_cfg);

    settings
}

// ============================================================================
// Scenario: two providers, one duplicate
// ============================================================================

#[tokio::test]
async fn test_duplicate_station_across_providers_merges() {
    let rb = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/json/stations/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            rb_station("a1", "BBC World", "http://x.example/stream", 10)
        ])))
        .mount(&rb)
        .await;

    let sc = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Search/UpdateSearch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            sc_station(77, "BBC WORLD SERVICE", Some("http://x.example/stream/"), 5)
        ])))
        .mount(&sc)
        .await;

    let engine = SearchEngine::new(&station_settings(&rb, &sc)).unwrap();
    let page = engine.search_stations(&StationQuery::term("bbc")).await;

    assert_eq!(page.items.len(), 1);
    let station = &page.items[0];
    // Priority-1 provider wins the atomic fields; popularity is summed.
    assert_eq!(station.name, "BBC World");
    assert_eq!(station.votes, 10);
    assert_eq!(station.click_count, 5);
    assert_eq!(station.popularity(), 15);
    assert_eq!(station.source, ProviderId::RadioBrowser);
    assert!(station.source_providers.contains(&ProviderId::RadioBrowser));
    assert!(station.source_providers.contains(&ProviderId::Shoutcast));
}

// ============================================================================
// Scenario: provider failure isolation
// ============================================================================

#[tokio::test]
async fn test_failing_provider_does_not_poison_the_aggregate() {
    let rb = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&rb)
        .await;

    let sc = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Search/UpdateSearch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            sc_station(1, "One", Some("http://a.example/1"), 10),
            sc_station(2, "Two", Some("http://a.example/2"), 20),
            sc_station(3, "Three", Some("http://a.example/3"), 30),
        ])))
        .mount(&sc)
        .await;

    let engine = SearchEngine::new(&station_settings(&rb, &sc)).unwrap();
    let page = engine.search_stations(&StationQuery::term("news")).await;

    assert_eq!(page.items.len(), 3);
    assert!(page
        .items
        .iter()
        .all(|s| s.source == ProviderId::Shoutcast));
}

#[tokio::test]
async fn test_all_providers_failing_is_an_empty_success() {
    let rb = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&rb)
        .await;
    let sc = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&sc)
        .await;

    let engine = SearchEngine::new(&station_settings(&rb, &sc)).unwrap();
    let page = engine.search_stations(&StationQuery::term("x")).await;
    assert!(page.items.is_empty());
    assert_eq!(page.total, 0);
}

// ============================================================================
// Scenario: rate-limit cutoff
// ============================================================================

#[tokio::test]
async fn test_metered_provider_stops_being_called_at_quota() {
    let itunes = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "resultCount": 1,
            "results": [{"trackId": 1, "collectionName": "From Apple"}]
        })))
        .expect(3)
        .mount(&itunes)
        .await;

    let pi = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/byterm"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "feeds": [{"id": 9, "title": "From The Index", "url": "https://i.example/rss"}]
        })))
        .expect(2)
        .mount(&pi)
        .await;

    let settings = podcast_settings(
        &itunes,
        &pi,
        Some(RateQuota {
            limit: 2,
            period: Duration::from_secs(60),
        }),
    );
    let engine = SearchEngine::new(&settings).unwrap();

    let query = PodcastQuery {
        text: "news".to_string(),
        bypass_cache: true,
        ..PodcastQuery::default()
    };

    let first = engine.search_podcasts(&query).await;
    assert_eq!(first.len(), 2);
    let second = engine.search_podcasts(&query).await;
    assert_eq!(second.len(), 2);

    // Quota exhausted: the metered provider is not called, others are
    // unaffected.
    let third = engine.search_podcasts(&query).await;
    assert_eq!(third.len(), 1);
    assert_eq!(third[0].source, ProviderId::Itunes);
}

// ============================================================================
// Scenario: cache hit
// ============================================================================

#[tokio::test]
async fn test_identical_query_is_served_from_cache() {
    let rb = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/json/stations/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            rb_station("c1", "Cached FM", "http://c.example/s", 3)
        ])))
        .expect(1)
        .mount(&rb)
        .await;

    let sc = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Search/UpdateSearch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&sc)
        .await;

    let engine = SearchEngine::new(&station_settings(&rb, &sc)).unwrap();
    let query = StationQuery::term("cached");

    let first = engine.search_stations(&query).await;
    // Same parameters: zero upstream calls, identical payload.
    let second = engine.search_stations(&query).await;
    assert_eq!(first, second);
    assert_eq!(second.items[0].name, "Cached FM");
}

#[tokio::test]
async fn test_bypass_cache_always_goes_upstream() {
    let rb = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/json/stations/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(2)
        .mount(&rb)
        .await;
    let sc = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&sc)
        .await;

    let engine = SearchEngine::new(&station_settings(&rb, &sc)).unwrap();
    let query = StationQuery {
        text: "live".to_string(),
        bypass_cache: true,
        ..StationQuery::default()
    };
    engine.search_stations(&query).await;
    engine.search_stations(&query).await;
}

// ============================================================================
// Scenario: atomic-field precedence across podcast directories
// ============================================================================

#[tokio::test]
async fn test_atomic_fields_fall_to_the_higher_priority_provider() {
    let itunes = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "resultCount": 1,
            "results": [{
                "trackId": 42,
                "collectionName": "Daily News",
                "artistName": "ACME"
            }]
        })))
        .mount(&itunes)
        .await;

    let pi = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/byterm"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "feeds": [{
                "id": 7,
                "title": "daily news show",
                "itunesId": 42,
                "url": "https://f.example/rss",
                "description": "long detailed description with more content"
            }]
        })))
        .mount(&pi)
        .await;

    let engine = SearchEngine::new(&podcast_settings(&itunes, &pi, None)).unwrap();
    let results = engine
        .search_podcasts(&PodcastQuery::term("daily news"))
        .await;

    assert_eq!(results.len(), 1);
    let podcast = &results[0];
    // itunes (priority 1) wins the title; the longer description and the
    // fields only the index knows are taken from it.
    assert_eq!(podcast.title, "Daily News");
    assert_eq!(
        podcast.description.as_deref(),
        Some("long detailed description with more content")
    );
    assert_eq!(podcast.feed_url.as_deref(), Some("https://f.example/rss"));
    assert_eq!(podcast.itunes_id.as_deref(), Some("42"));
    assert!(podcast.source_providers.contains(&ProviderId::Itunes));
    assert!(podcast.source_providers.contains(&ProviderId::PodcastIndex));
}

// ============================================================================
// Invariants and boundaries
// ============================================================================

#[tokio::test]
async fn test_provider_filter_restricts_fan_out() {
    let rb = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&rb)
        .await;

    let sc = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Search/UpdateSearch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            sc_station(5, "Filtered", Some("http://f.example/s"), 1)
        ])))
        .expect(1)
        .mount(&sc)
        .await;

    let engine = SearchEngine::new(&station_settings(&rb, &sc)).unwrap();
    let query = StationQuery {
        text: "x".to_string(),
        providers: Some(vec![ProviderId::Shoutcast]),
        ..StationQuery::default()
    };
    let page = engine.search_stations(&query).await;

    assert_eq!(page.items.len(), 1);
    assert!(page.items.iter().all(|s| s
        .source_providers
        .contains(&ProviderId::Shoutcast)));
}

#[tokio::test]
async fn test_limit_is_clamped_and_truncates() {
    let stations: Vec<serde_json::Value> = (0..10)
        .map(|i| {
            rb_station(
                &format!("u{i}"),
                &format!("Station {i}"),
                &format!("http://s.example/{i}"),
                100 - i,
            )
        })
        .collect();

    let rb = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/json/stations/search"))
        // The oversized request is clamped before it reaches the wire.
        .and(query_param("limit", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(stations)))
        .mount(&rb)
        .await;
    let sc = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&sc)
        .await;

    let engine = SearchEngine::new(&station_settings(&rb, &sc)).unwrap();
    let query = StationQuery {
        text: "s".to_string(),
        limit: Some(10_000),
        ..StationQuery::default()
    };
    let page = engine.search_stations(&query).await;
    assert_eq!(page.items.len(), 10);

    // And a small limit truncates the merged set.
    let query = StationQuery {
        text: "s".to_string(),
        limit: Some(3),
        bypass_cache: true,
        ..StationQuery::default()
    };
    let rb2 = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/json/stations/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(stations)))
        .mount(&rb2)
        .await;
    let engine = SearchEngine::new(&station_settings(&rb2, &sc)).unwrap();
    let page = engine.search_stations(&query).await;
    assert_eq!(page.items.len(), 3);
}

#[tokio::test]
async fn test_output_is_sorted_by_popularity_within_a_provider() {
    let rb = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/json/stations/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            rb_station("l", "Low", "http://s.example/low", 1),
            rb_station("h", "High", "http://s.example/high", 500),
            rb_station("m", "Mid", "http://s.example/mid", 50),
        ])))
        .mount(&rb)
        .await;
    let sc = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&sc)
        .await;

    let engine = SearchEngine::new(&station_settings(&rb, &sc)).unwrap();
    let page = engine.search_stations(&StationQuery::term("s")).await;
    let names: Vec<&str> = page.items.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["High", "Mid", "Low"]);
}

#[tokio::test]
async fn test_every_item_carries_its_source_in_providers() {
    let rb = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/json/stations/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            rb_station("p", "Prov", "http://p.example/s", 1)
        ])))
        .mount(&rb)
        .await;
    let sc = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&sc)
        .await;

    let engine = SearchEngine::new(&station_settings(&rb, &sc)).unwrap();
    let page = engine.search_stations(&StationQuery::term("p")).await;
    for item in &page.items {
        assert!(item.source_providers.contains(&item.source));
    }
}

#[tokio::test]
async fn test_no_enabled_providers_is_an_empty_success() {
    let mut settings = ProviderSettings::builtin();
    for provider in ProviderId::ALL {
        let mut config = ProviderConfig::defaults(provider);
        config.enabled = false;
        settings.insert(config);
    }
    let engine = SearchEngine::new(&settings).unwrap();
    let page = engine.search_stations(&StationQuery::term("x")).await;
    assert!(page.items.is_empty());
    let podcasts = engine.search_podcasts(&PodcastQuery::term("x")).await;
    assert!(podcasts.is_empty());
}

// ============================================================================
// Statuses and feeds
// ============================================================================

#[tokio::test]
async fn test_provider_statuses_report_quota() {
    let itunes = MockServer::start().await;
    let pi = MockServer::start().await;
    let settings = podcast_settings(
        &itunes,
        &pi,
        Some(RateQuota {
            limit: 500,
            period: Duration::from_secs(60),
        }),
    );
    let engine = SearchEngine::new(&settings).unwrap();

    let statuses = engine.provider_statuses().await;
    assert_eq!(statuses.len(), ProviderId::ALL.len());
    let pi_status = statuses
        .iter()
        .find(|s| s.name == ProviderId::PodcastIndex)
        .unwrap();
    assert_eq!(pi_status.rate_limit_quota, Some(500));
    assert_eq!(pi_status.remaining, Some(500));
}

#[tokio::test]
async fn test_parse_feed_url_round_trip() {
    let feed = r#"<?xml version="1.0"?>
<rss version="2.0" xmlns:itunes="http://www.itunes.com/dtds/podcast-1.0.dtd">
  <channel>
    <title>Wire Stories</title>
    <description>Weekly features.</description>
    <item>
      <title>Pilot</title>
      <guid>ws-1</guid>
      <pubDate>Fri, 05 Jan 2024 12:00:00 GMT</pubDate>
      <enclosure url="https://ws.example/pilot.mp3" type="audio/mpeg"/>
      <itunes:duration>30:00</itunes:duration>
    </item>
  </channel>
</rss>"#;

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(feed.as_bytes().to_vec(), "application/rss+xml"),
        )
        .mount(&server)
        .await;

    let engine = SearchEngine::new(&ProviderSettings::builtin()).unwrap();
    let url = format!("{}/feed.xml", server.uri());
    let parsed = engine.parse_feed_url(&url).await.unwrap();

    assert_eq!(parsed.podcast.title, "Wire Stories");
    assert_eq!(parsed.podcast.feed_url.as_deref(), Some(url.as_str()));
    assert_eq!(parsed.episodes.len(), 1);
    assert_eq!(parsed.episodes[0].duration_secs, Some(1800));
}

#[tokio::test]
async fn test_parse_feed_rejects_non_feed() {
    let engine = SearchEngine::new(&ProviderSettings::builtin()).unwrap();
    let err = engine.parse_feed(b"<html><body>hi</body></html>", None);
    assert!(err.is_err());
}
