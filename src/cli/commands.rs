//! CLI command implementations
//!
//! `replay` composes replay source -> aggregate -> offset -> limit over a
//! recorded fixture and prints every output batch. `order` runs the
//! order-by merge over recorded partition cursors.

use std::cmp::Ordering;
use std::path::Path;

use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::aggregate::AggregateOperator;
use crate::config::PipelineConfig;
use crate::errors::QueryResult;
use crate::merge::{OrderByComparator, PartitionCursor, RecordedCursor, SortOrder};
use crate::observability::{Logger, ObservationScope};
use crate::pipeline::{
    AggregateComponent, AggregateProjection, BoxedComponent, CancellationToken, LimitFlavor,
    ReplaySource, ResultBatch, SkipComponent, TakeComponent,
};

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{read_fixture, write_error, write_response};

/// Recorded pages plus the plan to run over them
#[derive(Debug, Clone, Deserialize)]
pub struct ReplayFixture {
    pub pages: Vec<ResultBatch>,
    #[serde(default)]
    pub plan: ReplayPlan,
}

/// Which components to stack over the replayed pages
#[derive(Debug, Clone, Deserialize)]
pub struct ReplayPlan {
    /// Aggregate operator names; empty means no aggregate stage
    #[serde(default)]
    pub aggregates: Vec<String>,

    /// `SELECT VALUE` projection (default) or a `$1` row
    #[serde(default = "default_select_value")]
    pub select_value: bool,

    #[serde(default)]
    pub offset: Option<u64>,

    #[serde(default)]
    pub limit: Option<u64>,

    /// "limit" or "top"
    #[serde(default = "default_limit_flavor")]
    pub limit_flavor: String,
}

fn default_select_value() -> bool {
    true
}

fn default_limit_flavor() -> String {
    "limit".to_string()
}

impl Default for ReplayPlan {
    fn default() -> Self {
        Self {
            aggregates: Vec::new(),
            select_value: default_select_value(),
            offset: None,
            limit: None,
            limit_flavor: default_limit_flavor(),
        }
    }
}

/// Sort directions plus one recorded cursor per partition
#[derive(Debug, Clone, Deserialize)]
pub struct OrderFixture {
    pub sort_orders: Vec<SortOrder>,
    pub cursors: Vec<RecordedCursor>,
}

/// Run CLI with parsed arguments
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run a specific command
pub fn run_command(cmd: Command) -> CliResult<()> {
    // stdout carries one JSON result per line; logs must not interleave.
    Logger::set_stderr_only(true);
    match cmd {
        Command::Replay {
            input,
            config,
            page_size,
            continuation,
        } => replay(&input, config.as_deref(), page_size, continuation),
        Command::Order { input, config } => order(&input, config.as_deref()),
    }
}

fn load_config(path: Option<&Path>) -> CliResult<PipelineConfig> {
    let config = match path {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    config.apply_logging()?;
    Ok(config)
}

/// Replay a recorded fixture and print each output batch
pub fn replay(
    input: &Path,
    config_path: Option<&Path>,
    page_size: usize,
    continuation: Option<String>,
) -> CliResult<()> {
    let config = load_config(config_path)?;
    let fixture: ReplayFixture = read_fixture(input)?;

    match replay_fixture(fixture, &config, page_size, continuation) {
        Ok(batches) => {
            for batch in batches {
                write_response(serde_json::to_value(&batch)?)?;
            }
            Ok(())
        }
        Err(e) => {
            write_error(e.code_str(), e.message())?;
            Err(e)
        }
    }
}

/// Merge recorded cursors and print one line per emitted result
pub fn order(input: &Path, config_path: Option<&Path>) -> CliResult<()> {
    let config = load_config(config_path)?;
    let fixture: OrderFixture = read_fixture(input)?;

    match merge_cursors(fixture, &config) {
        Ok(rows) => {
            for row in rows {
                write_response(row)?;
            }
            Ok(())
        }
        Err(e) => {
            let e = CliError::from(e);
            write_error(e.code_str(), e.message())?;
            Err(e)
        }
    }
}

/// Run the fixture's plan to completion on a single-threaded runtime
pub fn replay_fixture(
    fixture: ReplayFixture,
    config: &PipelineConfig,
    page_size: usize,
    continuation: Option<String>,
) -> CliResult<Vec<ResultBatch>> {
    if page_size == 0 {
        return Err(CliError::invalid_input("page size must be > 0"));
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let cancellation = CancellationToken::new();

    let activity_id = Uuid::new_v4().to_string();
    let scope = ObservationScope::with_fields("REPLAY", vec![("activity_id", activity_id)]);

    let result: QueryResult<Vec<ResultBatch>> = runtime.block_on(async {
        let mut pipeline = build_pipeline(fixture, config, continuation).await?;
        drain_pipeline(&mut pipeline, page_size, &cancellation).await
    });

    match result {
        Ok(batches) => {
            let count = batches.len().to_string();
            scope.complete(&[("batches", count.as_str())]);
            Ok(batches)
        }
        Err(e) => {
            scope.fail(e.message());
            Err(e.into())
        }
    }
}

/// Replay pages, optionally folded by an aggregate stage
struct SourceStage {
    pages: Vec<ResultBatch>,
    aggregates: Vec<AggregateOperator>,
    projection: AggregateProjection,
    page_size: usize,
}

impl SourceStage {
    fn build(self, continuation: Option<String>) -> QueryResult<BoxedComponent> {
        let replay = ReplaySource::resume(self.pages, continuation.as_deref())?;
        if self.aggregates.is_empty() {
            let component: BoxedComponent = Box::new(replay);
            return Ok(component);
        }

        let aggregate =
            AggregateComponent::new(self.aggregates, self.projection, Box::new(replay))?
                .with_page_size(self.page_size);
        let component: BoxedComponent = Box::new(aggregate);
        Ok(component)
    }
}

async fn offset_stage(
    source: SourceStage,
    offset: Option<u64>,
    continuation: Option<String>,
) -> QueryResult<BoxedComponent> {
    let count = match offset {
        Some(count) => count,
        None => return source.build(continuation),
    };

    let skip = SkipComponent::create(count, continuation.as_deref(), |inner| async move {
        source.build(inner)
    })
    .await?;
    let component: BoxedComponent = Box::new(skip);
    Ok(component)
}

/// Stack the plan's components. Limit wraps offset, which wraps the source.
pub async fn build_pipeline(
    fixture: ReplayFixture,
    config: &PipelineConfig,
    continuation: Option<String>,
) -> QueryResult<BoxedComponent> {
    let plan = fixture.plan;
    let aggregates = plan
        .aggregates
        .iter()
        .map(|name| name.parse::<AggregateOperator>())
        .collect::<QueryResult<Vec<_>>>()?;
    let projection = if plan.select_value {
        AggregateProjection::Value
    } else {
        AggregateProjection::Row
    };

    let source = SourceStage {
        pages: fixture.pages,
        aggregates,
        projection,
        page_size: config.aggregate_page_size,
    };
    let offset = plan.offset;

    let count = match plan.limit {
        Some(count) => count,
        None => return offset_stage(source, offset, continuation).await,
    };

    let flavor: LimitFlavor = plan.limit_flavor.parse()?;
    let take = TakeComponent::create(flavor, count, continuation.as_deref(), |inner| {
        offset_stage(source, offset, inner)
    })
    .await?;
    let component: BoxedComponent = Box::new(take);
    Ok(component)
}

/// Drain until the pipeline reports done, then release it
pub async fn drain_pipeline(
    pipeline: &mut BoxedComponent,
    page_size: usize,
    cancellation: &CancellationToken,
) -> QueryResult<Vec<ResultBatch>> {
    let mut batches = Vec::new();
    while !pipeline.is_done() {
        batches.push(pipeline.drain(page_size, cancellation).await?);
    }
    pipeline.dispose();
    Ok(batches)
}

/// k-way merge: repeatedly emit the smallest cursor's current result
pub fn merge_cursors(fixture: OrderFixture, config: &PipelineConfig) -> QueryResult<Vec<Value>> {
    let comparator = OrderByComparator::from_config(fixture.sort_orders, config)?;
    let mut cursors = fixture.cursors;
    let mut merged = Vec::new();

    loop {
        let mut smallest: Option<usize> = None;
        for (index, cursor) in cursors.iter().enumerate() {
            let replace = match smallest {
                None => true,
                Some(best) => comparator.compare(cursor, &cursors[best])? == Ordering::Less,
            };
            if replace {
                smallest = Some(index);
            }
        }

        // Exhausted cursors sort last, so an exhausted minimum ends the merge.
        let index = match smallest {
            Some(index) if cursors[index].has_more_results() => index,
            _ => break,
        };

        let cursor = &mut cursors[index];
        if let Some(current) = cursor.current() {
            merged.push(json!({
                "partition": cursor.partition_range().id,
                "order_by_items": current.order_by_items,
                "payload": current.payload,
            }));
        }
        cursor.advance();
    }

    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::super::errors::CliErrorCode;
    use super::*;

    fn fixture(value: Value) -> ReplayFixture {
        serde_json::from_value(value).unwrap()
    }

    fn numbered_pages(sizes: &[usize]) -> Value {
        let mut next = 0;
        let pages: Vec<Value> = sizes
            .iter()
            .map(|size| {
                let items: Vec<Value> = (next..next + size).map(|i| json!(i)).collect();
                next += size;
                json!({"items": items, "request_charge": 1.5})
            })
            .collect();
        Value::Array(pages)
    }

    fn items(batches: &[ResultBatch]) -> Vec<Value> {
        batches.iter().flat_map(|b| b.items.clone()).collect()
    }

    #[test]
    fn test_replay_offset_then_limit() {
        let recorded = fixture(json!({
            "pages": numbered_pages(&[4, 4, 4]),
            "plan": {"offset": 2, "limit": 5, "limit_flavor": "top"}
        }));

        let batches =
            replay_fixture(recorded, &PipelineConfig::default(), 10, None).unwrap();
        assert_eq!(
            items(&batches),
            vec![json!(2), json!(3), json!(4), json!(5), json!(6)]
        );
        assert_eq!(batches.last().unwrap().continuation, None);
    }

    #[test]
    fn test_replay_resumes_from_continuation() {
        let plan = json!({"offset": 2, "limit": 5});
        let first = fixture(json!({"pages": numbered_pages(&[4, 4, 4]), "plan": plan}));
        let mut pipeline_batches =
            replay_fixture(first, &PipelineConfig::default(), 10, None).unwrap();
        let token = pipeline_batches.remove(0).continuation.unwrap();
        assert_eq!(
            token,
            r#"{"limit":3,"sourceToken":"{\"offset\":0,\"sourceToken\":\"page:1\"}"}"#
        );

        let second = fixture(json!({"pages": numbered_pages(&[4, 4, 4]), "plan": plan}));
        let resumed =
            replay_fixture(second, &PipelineConfig::default(), 10, Some(token)).unwrap();
        assert_eq!(items(&resumed), vec![json!(4), json!(5), json!(6)]);
    }

    #[test]
    fn test_replay_aggregate_count() {
        let recorded = fixture(json!({
            "pages": [
                {"items": [[{"item": 3}]], "request_charge": 1.0},
                {"items": [[{"item": 4}], [{}]], "request_charge": 2.0}
            ],
            "plan": {"aggregates": ["count"], "select_value": false}
        }));

        let batches = replay_fixture(recorded, &PipelineConfig::default(), 10, None).unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].items, vec![json!({"$1": 7})]);
        assert_eq!(batches[0].request_charge, 3.0);
    }

    #[test]
    fn test_replay_rejects_tampered_token() {
        let recorded = fixture(json!({
            "pages": numbered_pages(&[2]),
            "plan": {"limit": 2}
        }));
        let err = replay_fixture(
            recorded,
            &PipelineConfig::default(),
            10,
            Some(r#"{"limit":9,"sourceToken":null}"#.to_string()),
        )
        .unwrap_err();
        assert_eq!(err.code(), &CliErrorCode::QueryFailed);
        assert!(err.message().contains("AERO_QUERY_BAD_REQUEST"));
    }

    #[test]
    fn test_replay_unknown_aggregate_fails() {
        let recorded = fixture(json!({
            "pages": [],
            "plan": {"aggregates": ["median"]}
        }));
        let err = replay_fixture(recorded, &PipelineConfig::default(), 10, None).unwrap_err();
        assert_eq!(err.code(), &CliErrorCode::QueryFailed);
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let recorded = fixture(json!({"pages": []}));
        let err = replay_fixture(recorded, &PipelineConfig::default(), 0, None).unwrap_err();
        assert_eq!(err.code(), &CliErrorCode::InvalidInput);
    }

    fn order_fixture(sort_orders: Value) -> OrderFixture {
        serde_json::from_value(json!({
            "sort_orders": sort_orders,
            "cursors": [
                {
                    "range": {"id": "p1", "min_inclusive": "80", "max_exclusive": "FF"},
                    "results": [
                        {"order_by_items": [1], "payload": "p1-a"},
                        {"order_by_items": [3], "payload": "p1-b"}
                    ]
                },
                {
                    "range": {"id": "p0", "min_inclusive": "00", "max_exclusive": "80"},
                    "results": [
                        {"order_by_items": [1], "payload": "p0-a"},
                        {"order_by_items": [2], "payload": "p0-b"}
                    ]
                }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_merge_orders_across_partitions() {
        let rows = merge_cursors(order_fixture(json!(["asc"])), &PipelineConfig::default())
            .unwrap();
        let payloads: Vec<&Value> = rows.iter().map(|row| &row["payload"]).collect();
        // Equal keys resolve to the leftmost partition first.
        assert_eq!(payloads, vec!["p0-a", "p1-a", "p0-b", "p1-b"]);
    }

    #[test]
    fn test_merge_rejects_empty_sort_orders() {
        let err = merge_cursors(order_fixture(json!([])), &PipelineConfig::default())
            .unwrap_err();
        assert_eq!(err.code(), crate::errors::QueryErrorCode::BadRequest);
    }
}
