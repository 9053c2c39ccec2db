use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, HistogramVec,
    IntCounter, IntCounterVec,
};

lazy_static::lazy_static! {
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "mosaic_http_requests_total", "Total HTTP requests", &["method", "path", "status"]
    ).unwrap();
    pub static ref DOCUMENTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "mosaic_documents_total", "Documents submitted for indexing", &["status"]
    ).unwrap();
    pub static ref QUERIES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "mosaic_queries_total", "Similarity queries", &["kind"]
    ).unwrap();
    pub static ref QUERY_DURATION: HistogramVec = register_histogram_vec!(
        "mosaic_query_duration_seconds", "Query duration", &["kind"],
        vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    ).unwrap();
    pub static ref PREFILTER_CANDIDATES: HistogramVec = register_histogram_vec!(
        "mosaic_prefilter_candidates", "Candidates surfaced by the posting-list prefilter", &["kind"],
        vec![1.0, 10.0, 100.0, 1_000.0, 10_000.0, 100_000.0]
    ).unwrap();
    pub static ref TRAINING_RUNS_TOTAL: IntCounter = register_int_counter!(
        "mosaic_training_runs_total", "Vocabulary training runs"
    ).unwrap();
}

pub fn init() {
    lazy_static::initialize(&HTTP_REQUESTS_TOTAL);
    lazy_static::initialize(&DOCUMENTS_TOTAL);
    lazy_static::initialize(&QUERIES_TOTAL);
    lazy_static::initialize(&QUERY_DURATION);
    lazy_static::initialize(&PREFILTER_CANDIDATES);
    lazy_static::initialize(&TRAINING_RUNS_TOTAL);
}
