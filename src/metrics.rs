use std::sync::LazyLock;
use std::time::Duration;

use prometheus::*;

use crate::db::QueryKind;

static METRIC_SEARCH_COUNT: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "semsearch_search_count",
        "count of the search requests sent to the database",
        &["kind", "status"]
    )
    .unwrap()
});

static METRIC_SEARCH_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    register_histogram_vec!(
        "semsearch_search_duration",
        "duration of the ranking query in seconds",
        &["kind"]
    )
    .unwrap()
});

static METRIC_SEARCH_RESULTS: LazyLock<HistogramVec> = LazyLock::new(|| {
    register_histogram_vec!(
        "semsearch_search_results",
        "number of ids returned by the ranking query",
        &["kind"],
        vec![0., 1., 5., 10., 20., 50., 100.]
    )
    .unwrap()
});

/// 记录一次排序查询，`result` 为返回的 ID 数量，查询失败时为 `None`
pub fn observe_search(kind: QueryKind, elapsed: Duration, result: Option<usize>) {
    let status = if result.is_some() { "ok" } else { "error" };
    METRIC_SEARCH_COUNT.with_label_values(&[kind.as_str(), status]).inc();
    METRIC_SEARCH_DURATION
        .with_label_values(&[kind.as_str()])
        .observe(elapsed.as_secs_f64());

    if let Some(count) = result {
        METRIC_SEARCH_RESULTS.with_label_values(&[kind.as_str()]).observe(count as f64);
    }
}
