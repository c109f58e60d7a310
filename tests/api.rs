//! Integration tests for the HTTP API
//!
//! Drives the router with an in-memory record source, one request at a time.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use mgnrega_dash::data::{DistrictSummary, RawRecord, RecordSource, SourceError};
use mgnrega_dash::logging;
use mgnrega_dash::server::{ApiServer, DistrictsResponse, ErrorResponse};

/// In-memory source that counts fetches and can be made to fail
struct FakeSource {
    records: Vec<RawRecord>,
    fail: AtomicBool,
    fetches: AtomicUsize,
}

#[async_trait]
impl RecordSource for FakeSource {
    async fn fetch_records(&self) -> Result<Vec<RawRecord>, SourceError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(SourceError::Status(503));
        }
        Ok(self.records.clone())
    }
}

fn records(values: Vec<Value>) -> Vec<RawRecord> {
    values
        .into_iter()
        .map(|v| v.as_object().cloned().expect("test record must be an object"))
        .collect()
}

fn create_test_server(values: Vec<Value>) -> (ApiServer, Arc<FakeSource>) {
    logging::init_test();
    let source = Arc::new(FakeSource {
        records: records(values),
        fail: AtomicBool::new(false),
        fetches: AtomicUsize::new(0),
    });
    let dyn_source: Arc<dyn RecordSource> = source.clone();
    (
        ApiServer::new(dyn_source, Duration::from_secs(600)),
        source,
    )
}

fn sample_records() -> Vec<Value> {
    vec![
        json!({
            "district_name": "Pune",
            "fin_year": "2024-2025",
            "month": "Jan",
            "Average_Wage_rate_per_day_per_person": "300",
            "Average_days_of_employment_provided_per_Household": "40",
            "Total_Exp": "1000",
            "Women_Persondays": "20"
        }),
        json!({
            "district_name": "Akola",
            "fin_year": "2024-2025",
            "month": "Jan",
            "Average_Wage_rate_per_day_per_person": "250",
            "Average_days_of_employment_provided_per_Household": "50",
            "Total_Exp": "3000",
            "Women_Persondays": "10"
        }),
        json!({
            "district_name": "PUNE",
            "fin_year": "2024-2025",
            "month": "Feb",
            "Average_Wage_rate_per_day_per_person": "100",
            "Average_days_of_employment_provided_per_Household": "60",
            "Total_Exp": "500",
            "Women_Persondays": "30"
        }),
        json!({
            "district_name": "",
            "Total_Exp": "99999"
        }),
        json!({
            "district_name": "Thane",
            "Average_Wage_rate_per_day_per_person": "400",
            "Total_Exp": "10"
        }),
    ]
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn test_health_endpoint() {
    let (server, _) = create_test_server(vec![]);
    let (status, body) = get(server.router(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_districts_are_distinct_sorted_and_case_preserving() {
    let (server, _) = create_test_server(sample_records());

    let (status, body) = get(server.router(), "/districts").await;

    assert_eq!(status, StatusCode::OK);
    let response: DistrictsResponse = serde_json::from_value(body).unwrap();
    assert_eq!(response.districts, vec!["Akola", "PUNE", "Pune", "Thane"]);
}

#[tokio::test]
async fn test_districts_always_refetch() {
    let (server, source) = create_test_server(sample_records());

    get(server.router(), "/districts").await;
    get(server.router(), "/api/districts").await;

    assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_districts_source_failure_is_500() {
    let (server, source) = create_test_server(sample_records());
    source.fail.store(true, Ordering::SeqCst);

    let (status, body) = get(server.router(), "/districts").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let error: ErrorResponse = serde_json::from_value(body).unwrap();
    assert_eq!(error.message, "Failed to load districts");
}

#[tokio::test]
async fn test_district_matches_case_insensitively() {
    let (server, _) = create_test_server(sample_records());

    let (status, body) = get(server.router(), "/district/pune").await;

    assert_eq!(status, StatusCode::OK);
    let list = body.as_array().unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["district_name"], "Pune");
    assert_eq!(list[1]["district_name"], "PUNE");
    // Raw records come back untouched
    assert_eq!(list[0]["Total_Exp"], "1000");
}

#[tokio::test]
async fn test_district_with_encoded_name() {
    let (server, _) = create_test_server(vec![json!({ "district_name": "North Goa" })]);

    let (status, body) = get(server.router(), "/api/district/NORTH%20GOA").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_district_nonexistent_is_404() {
    let (server, _) = create_test_server(sample_records());

    let (status, body) = get(server.router(), "/district/nonexistent").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "message": "No data found for this district." }));
}

#[tokio::test]
async fn test_district_source_failure_is_500() {
    let (server, source) = create_test_server(sample_records());
    source.fail.store(true, Ordering::SeqCst);

    let (status, body) = get(server.router(), "/district/pune").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Error fetching data");
}

#[tokio::test]
async fn test_compare_returns_summary_in_first_seen_order() {
    let (server, _) = create_test_server(sample_records());

    let (status, body) = get(server.router(), "/compare").await;

    assert_eq!(status, StatusCode::OK);
    let summary: Vec<DistrictSummary> = serde_json::from_value(body).unwrap();
    let names: Vec<&str> = summary.iter().map(|s| s.district.as_str()).collect();
    assert_eq!(names, vec!["PUNE", "AKOLA", "THANE"]);

    let pune = &summary[0];
    assert_eq!(pune.samples, 2);
    assert_eq!(pune.avg_wage, 200.0);
    assert_eq!(pune.total_exp, 1500.0);
    assert_eq!(pune.total_emp_days, 100.0);
    assert_eq!(pune.women_persondays, 50.0);
    assert_eq!(pune.women_percent, 50.0);

    let total_samples: u64 = summary.iter().map(|s| s.samples).sum();
    assert_eq!(total_samples, 4);
}

#[tokio::test]
async fn test_compare_sort_and_top() {
    let (server, _) = create_test_server(sample_records());

    let (_, body) = get(server.router(), "/compare?sortby=total_exp&top=2").await;

    let summary: Vec<DistrictSummary> = serde_json::from_value(body).unwrap();
    let names: Vec<&str> = summary.iter().map(|s| s.district.as_str()).collect();
    assert_eq!(names, vec!["AKOLA", "PUNE"]);
}

#[tokio::test]
async fn test_compare_top_five_of_twenty() {
    let values: Vec<Value> = (0..20)
        .map(|i| {
            json!({
                "district_name": format!("District {:02}", i),
                "Average_Wage_rate_per_day_per_person": (100 + (i * 7) % 20 * 10).to_string()
            })
        })
        .collect();
    let (server, _) = create_test_server(values);

    let (status, body) = get(server.router(), "/api/compare?sortby=avg_wage&top=5").await;

    assert_eq!(status, StatusCode::OK);
    let summary: Vec<DistrictSummary> = serde_json::from_value(body).unwrap();
    assert_eq!(summary.len(), 5);
    for pair in summary.windows(2) {
        assert!(pair[0].avg_wage >= pair[1].avg_wage);
    }
    assert_eq!(summary[0].avg_wage, 290.0);
}

#[tokio::test]
async fn test_compare_repeated_params_use_first_value() {
    let (server, _) = create_test_server(sample_records());

    let (status, body) = get(
        server.router(),
        "/compare?sortby=total_exp&top=1&top=5&sortby=avg_wage",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let summary: Vec<DistrictSummary> = serde_json::from_value(body).unwrap();
    assert_eq!(summary.len(), 1);
    assert_eq!(summary[0].district, "AKOLA");
}

#[tokio::test]
async fn test_compare_invalid_sortby_keeps_order() {
    let (server, _) = create_test_server(sample_records());

    let (_, body) = get(server.router(), "/compare?sortby=district").await;

    let summary: Vec<DistrictSummary> = serde_json::from_value(body).unwrap();
    let names: Vec<&str> = summary.iter().map(|s| s.district.as_str()).collect();
    assert_eq!(names, vec!["PUNE", "AKOLA", "THANE"]);
}

#[tokio::test]
async fn test_compare_uses_cache_and_sorting_does_not_leak() {
    let (server, source) = create_test_server(sample_records());

    get(server.router(), "/compare?sortby=avg_wage").await;
    let (_, body) = get(server.router(), "/compare").await;

    assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
    let summary: Vec<DistrictSummary> = serde_json::from_value(body).unwrap();
    assert_eq!(summary[0].district, "PUNE");
}

#[tokio::test]
async fn test_compare_source_failure_is_500() {
    let (server, source) = create_test_server(sample_records());
    source.fail.store(true, Ordering::SeqCst);

    let (status, body) = get(server.router(), "/compare").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Failed to compute comparison");
}

#[tokio::test]
async fn test_stats_reflect_cache() {
    let (server, _) = create_test_server(sample_records());

    let (_, before) = get(server.router(), "/stats").await;
    assert_eq!(before["cached"], false);
    assert_eq!(before["ttl_secs"], 600);

    get(server.router(), "/compare").await;
    let (status, after) = get(server.router(), "/api/stats").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(after["cached"], true);
    assert_eq!(after["districts"], 3);
    assert_eq!(after["refreshes"], 1);
    assert_eq!(after["parse_failures"]["avg_wage"], 0);
}
