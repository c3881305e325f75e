use ferry_config::FerryConfig;
use ferry_metadata::{AggregationReport, Aggregator, FilenameParser, FuzzyIndex, MetadataSource};

use crate::cli::{LookupArgs, ParseArgs};
use crate::context::{CliContext, CliError, CliResult};
use crate::output::{ParsedRow, render_aggregation, render_lookup, render_parsed};

/// Fetch every configured source into a fresh index.
pub(crate) async fn build_index(config: &FerryConfig) -> CliResult<(FuzzyIndex, AggregationReport)> {
    let sources = MetadataSource::ranked(
        config
            .metadata
            .sources
            .iter()
            .map(|source| (source.name.clone(), source.url.clone())),
    );
    let aggregator = Aggregator::new(sources, config.metadata.request_timeout)
        .map_err(CliError::failure)?;
    Ok(aggregator.aggregate().await)
}

pub(crate) async fn handle_metadata_build(ctx: &CliContext) -> CliResult<()> {
    let (_, report) = build_index(&ctx.config).await?;
    render_aggregation(&report, ctx.output)
}

pub(crate) async fn handle_lookup(ctx: &CliContext, args: LookupArgs) -> CliResult<()> {
    let name = args.name.trim();
    if name.is_empty() {
        return Err(CliError::validation("lookup name must not be empty"));
    }
    let (index, _) = build_index(&ctx.config).await?;
    render_lookup(name, index.lookup(name), ctx.output)
}

pub(crate) async fn handle_parse(ctx: &CliContext, args: ParseArgs) -> CliResult<()> {
    let index = if args.offline {
        FuzzyIndex::new()
    } else {
        build_index(&ctx.config).await?.0
    };
    let rows = parse_all(&args.filenames, &index)?;
    render_parsed(&rows, ctx.output)
}

fn parse_all(filenames: &[String], index: &FuzzyIndex) -> CliResult<Vec<ParsedRow>> {
    let parser = FilenameParser::new().map_err(CliError::failure)?;
    Ok(filenames
        .iter()
        .map(|filename| ParsedRow {
            filename: filename.clone(),
            parsed: parser.parse(filename, index),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_config::MetadataEndpoint;
    use httpmock::prelude::*;
    use serde_json::json;

    #[tokio::test]
    async fn index_is_built_from_configured_sources() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        let titles = server.mock(|when, then| {
            when.method(GET).path("/titles.json");
            then.status(200)
                .json_body(json!([{"id": "0100000000010000", "name": "Super Mario Odyssey"}]));
        });
        let mut config = FerryConfig::default();
        config.metadata.sources = vec![MetadataEndpoint {
            name: "titles".to_string(),
            url: server.url("/titles.json"),
        }];

        let Ok((index, report)) = build_index(&config).await else {
            anyhow::bail!("index build failed");
        };
        titles.assert();
        assert_eq!(report.sources.len(), 1);
        assert_eq!(index.lookup("super mario odyssey"), Some("0100000000010000"));

        let rows = parse_all(&["Super Mario Odyssey [v65536].nsp".to_string()], &index)
            .map_err(|err| anyhow::anyhow!(err.display_message()))?;
        assert_eq!(rows[0].parsed.title_id.as_deref(), Some("0100000000010000"));
        assert_eq!(rows[0].parsed.version, Some(65_536));
        Ok(())
    }

    #[test]
    fn offline_parsing_uses_explicit_annotations_only() {
        let rows = parse_all(
            &[
                "Super Mario Odyssey [0100000000010000][v65536].nsp".to_string(),
                "Unknown Game.xci".to_string(),
            ],
            &FuzzyIndex::new(),
        )
        .expect("parser builds");
        assert_eq!(rows[0].parsed.clean_name, "Super Mario Odyssey");
        assert_eq!(rows[0].parsed.title_id.as_deref(), Some("0100000000010000"));
        assert_eq!(rows[1].parsed.title_id, None);
    }
}
