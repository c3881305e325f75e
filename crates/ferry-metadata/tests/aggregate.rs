use std::time::Duration;

use ferry_metadata::{Aggregator, FilenameParser, MetadataSource};
use httpmock::MockServer;
use httpmock::prelude::*;
use serde_json::json;

fn sources(server: &MockServer, paths: &[(&str, &str)]) -> Vec<MetadataSource> {
    MetadataSource::ranked(
        paths
            .iter()
            .map(|(name, path)| (*name, format!("{}{path}", server.base_url()))),
    )
}

#[tokio::test]
async fn higher_priority_source_wins_shared_keys() {
    let server = MockServer::start_async().await;
    let primary = server.mock(|when, then| {
        when.method(GET).path("/primary.json");
        then.status(200).json_body(json!([
            {"id": "0100000000010000", "name": "Super Mario Odyssey"}
        ]));
    });
    let secondary = server.mock(|when, then| {
        when.method(GET).path("/secondary.json");
        then.status(200).json_body(json!({
            "a": {"id": "0100FFFFFFFF0000", "name": "Super Mario Odyssey"},
            "b": {"id": "0100AAAAAAAA0000", "name": "Metroid Dread"}
        }));
    });

    let aggregator = Aggregator::new(
        sources(
            &server,
            &[("primary", "/primary.json"), ("secondary", "/secondary.json")],
        ),
        Duration::from_secs(5),
    )
    .expect("client");
    let (index, report) = aggregator.aggregate().await;

    primary.assert();
    secondary.assert();
    assert_eq!(index.lookup("super mario odyssey"), Some("0100000000010000"));
    assert_eq!(index.lookup("Metroid Dread"), Some("0100AAAAAAAA0000"));
    assert_eq!(report.sources.len(), 2);
    assert_eq!(report.sources[0].name, "primary");
    assert_eq!(report.sources[1].records, 2);
    assert!(report.failed.is_empty());
    assert_eq!(report.keys, index.len());
}

#[tokio::test]
async fn failed_sources_are_excluded() {
    let server = MockServer::start_async().await;
    let broken = server.mock(|when, then| {
        when.method(GET).path("/broken.json");
        then.status(503);
    });
    let garbled = server.mock(|when, then| {
        when.method(GET).path("/garbled.json");
        then.status(200).body("not json");
    });
    let healthy = server.mock(|when, then| {
        when.method(GET).path("/healthy.json");
        then.status(200)
            .json_body(json!([{"id": 7, "name": "Celeste"}]));
    });

    let aggregator = Aggregator::new(
        sources(
            &server,
            &[
                ("broken", "/broken.json"),
                ("garbled", "/garbled.json"),
                ("healthy", "/healthy.json"),
            ],
        ),
        Duration::from_secs(5),
    )
    .expect("client");
    let (index, report) = aggregator.aggregate().await;

    broken.assert();
    garbled.assert();
    healthy.assert();
    assert_eq!(report.failed, vec!["broken", "garbled"]);
    assert_eq!(report.sources.len(), 1);
    assert_eq!(index.lookup("Celeste"), Some("7"));
}

#[tokio::test]
async fn aggregated_index_feeds_filename_parsing() {
    let server = MockServer::start_async().await;
    let titles = server.mock(|when, then| {
        when.method(GET).path("/titles.json");
        then.status(200).json_body(json!([
            {"id": "01006A800016E000", "name": "Super Smash Bros.™ Ultimate"}
        ]));
    });

    let aggregator = Aggregator::new(
        sources(&server, &[("titles", "/titles.json")]),
        Duration::from_secs(5),
    )
    .expect("client");
    let (index, _) = aggregator.aggregate().await;
    titles.assert();

    let parser = FilenameParser::new().expect("patterns compile");
    let parsed = parser.parse("Super Smash Bros Ultimate (EU) [v393216].nsp", &index);
    assert_eq!(parsed.clean_name, "Super Smash Bros Ultimate");
    assert_eq!(parsed.title_id.as_deref(), Some("01006A800016E000"));
    assert_eq!(parsed.version, Some(393_216));
}
