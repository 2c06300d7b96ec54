/// Integration tests with a mocked data API
/// Exercises probing, batch execution and seeding without a live database
use schema_bootstrap::config::Config;
use schema_bootstrap::ddl::DdlRegistry;
use schema_bootstrap::errors::{AppError, ErrorKind};
use schema_bootstrap::models::{ProbeStatus, SampleRecord, SeedOutcome, TableSpec};
use schema_bootstrap::probe::Prober;
use schema_bootstrap::reconcile::{ReconcileOptions, Reconciler};
use schema_bootstrap::rest_client::RestClient;
use schema_bootstrap::seed::Seeder;
use schema_bootstrap::sql::BatchExecutor;
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Mutex;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

const MISSING_BODY: &str = r#"{"code":"42P01","details":null,"hint":null,"message":"relation \"public.payments\" does not exist"}"#;

/// Helper function to create a client pointing at the mock server
fn create_test_client(server: &MockServer) -> RestClient {
    let config = Config::for_base_url(server.uri(), "test_key");
    RestClient::new(&config).unwrap()
}

fn spec(name: &str, deps: &[&str]) -> TableSpec {
    TableSpec::new(
        name,
        &format!("CREATE TABLE public.{} (id TEXT PRIMARY KEY);", name),
        deps,
    )
}

fn sample(table: &str, id: &str) -> SampleRecord {
    SampleRecord::new(table, json!({ "id": id, "title": format!("{} sample", table) }))
}

fn set(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|n| n.to_string()).collect()
}

async fn mount_probe(server: &MockServer, table: &str, status: u16, body: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/rest/v1/{}", table)))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_probe_present_sends_bounded_query_with_credentials() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/lectures"))
        .and(query_param("select", "id"))
        .and(query_param("limit", "1"))
        .and(header("apikey", "test_key"))
        .and(header("authorization", "Bearer test_key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let result = Prober::new(&client).probe("lectures", "id").await;

    assert_eq!(result.table, "lectures");
    assert_eq!(result.status, ProbeStatus::Present);
}

#[tokio::test]
async fn test_probe_missing_relation() {
    let mock_server = MockServer::start().await;
    mount_probe(&mock_server, "payments", 404, MISSING_BODY).await;

    let client = create_test_client(&mock_server);
    let result = Prober::new(&client).probe("payments", "id").await;

    assert_eq!(result.status, ProbeStatus::Missing);
    assert!(result.raw_detail.contains("404"));
}

#[tokio::test]
async fn test_probe_server_error_is_transient() {
    let mock_server = MockServer::start().await;
    mount_probe(&mock_server, "profiles", 500, "Internal Server Error").await;

    let client = create_test_client(&mock_server);
    let result = Prober::new(&client).probe("profiles", "id").await;

    assert_eq!(result.status, ProbeStatus::TransientError);
}

#[tokio::test]
async fn test_probe_access_denied_is_not_missing() {
    let mock_server = MockServer::start().await;
    mount_probe(&mock_server, "payments", 401, MISSING_BODY).await;

    let client = create_test_client(&mock_server);
    let result = Prober::new(&client).probe("payments", "id").await;

    assert_eq!(result.status, ProbeStatus::TransientError);
}

#[tokio::test]
async fn test_probe_transport_failure_is_transient() {
    // Nothing listens on port 1
    let config = Config::for_base_url("http://127.0.0.1:1", "test_key");
    let client = RestClient::new(&config).unwrap();

    let result = Prober::new(&client).probe("lectures", "id").await;

    assert_eq!(result.status, ProbeStatus::TransientError);
    assert!(result.raw_detail.contains("Transport error"));
}

#[tokio::test]
async fn test_probe_timeout_is_transient() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(std::time::Duration::from_secs(3)),
        )
        .mount(&mock_server)
        .await;

    let mut config = Config::for_base_url(mock_server.uri(), "test_key");
    config.timeout_secs = 1;
    let client = RestClient::new(&config).unwrap();

    let result = Prober::new(&client).probe("lectures", "id").await;

    assert_eq!(result.status, ProbeStatus::TransientError);
}

#[tokio::test]
async fn test_probe_all_partitions_every_table() {
    let mock_server = MockServer::start().await;
    mount_probe(&mock_server, "lectures", 200, "[]").await;
    mount_probe(&mock_server, "showcase_sites", 200, r#"[{"id":"x"}]"#).await;
    mount_probe(&mock_server, "payments", 404, MISSING_BODY).await;
    mount_probe(&mock_server, "profiles", 503, "").await;

    let registry = DdlRegistry::new(vec![
        spec("profiles", &[]),
        spec("lectures", &[]),
        spec("showcase_sites", &[]),
        spec("payments", &["lectures"]),
    ])
    .unwrap();

    let client = create_test_client(&mock_server);
    let report = Prober::new(&client).probe_all(registry.specs()).await;

    assert_eq!(report.existing, set(&["lectures", "showcase_sites"]));
    assert_eq!(report.missing, set(&["payments"]));
    assert_eq!(report.errored, set(&["profiles"]));
    assert_eq!(report.results.len(), 4);
}

#[tokio::test]
async fn test_run_continues_past_failed_statement() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/exec_sql"))
        .and(body_json(json!({ "sql": "CREATE TABLE c (id int)" })))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "code": "42601",
            "message": "syntax error at or near \"TABLE\""
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    for sql in ["CREATE TABLE d (id int)", "CREATE TABLE e (id int)"] {
        Mock::given(method("POST"))
            .and(path("/rest/v1/rpc/exec_sql"))
            .and(body_json(json!({ "sql": sql })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;
    }

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/exec_sql"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&mock_server)
        .await;

    let script = "CREATE TABLE a (id int);\n\
                  CREATE TABLE b (id int);\n\
                  -- this one is rejected\n\
                  CREATE TABLE c (id int);\n\
                  CREATE TABLE d (id int);\n\
                  CREATE TABLE e (id int);\n";

    let client = create_test_client(&mock_server);
    let summary = BatchExecutor::new(&client).run(script).await;

    assert_eq!(summary.success_count, 4);
    assert_eq!(summary.error_count, 1);
    // Mock expectations verify statements 4 and 5 were still sent
}

#[tokio::test]
async fn test_execute_reports_status_code() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/exec_sql"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let outcome = BatchExecutor::new(&client).execute(0, "SELECT 1").await;

    assert_eq!(outcome.statement_index, 0);
    assert_eq!(outcome.status_code, Some(500));
    assert!(!outcome.succeeded);
}

#[tokio::test]
async fn test_preflight_reports_missing_exec_function() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/exec_sql"))
        .and(body_json(json!({ "sql": "SELECT 1;" })))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "code": "PGRST202",
            "details": "Searched for the function public.exec_sql with parameter sql",
            "hint": null,
            "message": "Could not find the function public.exec_sql(sql) in the schema cache"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let result = BatchExecutor::new(&client).preflight().await;

    match result {
        Err(AppError::NotFound(msg)) => {
            assert!(msg.contains("exec_sql"));
            assert!(msg.contains("HTTP 404"));
            assert!(msg.contains("PGRST202"));
        }
        other => panic!("expected NotFound, got {:?}", other),
    }
}

#[tokio::test]
async fn test_preflight_accepts_working_exec_function() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/exec_sql"))
        .and(body_json(json!({ "sql": "SELECT 1;" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    assert!(BatchExecutor::new(&client).preflight().await.is_ok());
}

/// Stands in for a table with a primary key: the first insert of an id
/// succeeds, any later insert of the same id is a unique violation.
struct UniqueKeyStore {
    rows: Mutex<HashSet<(String, String)>>,
}

impl Respond for UniqueKeyStore {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let table = request.url.path().trim_start_matches("/rest/v1/").to_string();
        let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap_or_default();
        let id = body["id"].as_str().unwrap_or_default().to_string();

        let mut rows = self.rows.lock().unwrap();
        if rows.insert((table.clone(), id.clone())) {
            ResponseTemplate::new(201)
        } else {
            ResponseTemplate::new(409).set_body_json(json!({
                "code": "23505",
                "details": format!("Key (id)=({}) already exists.", id),
                "hint": null,
                "message": format!("duplicate key value violates unique constraint \"{}_pkey\"", table)
            }))
        }
    }
}

#[tokio::test]
async fn test_seed_twice_is_idempotent() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(UniqueKeyStore {
            rows: Mutex::new(HashSet::new()),
        })
        .mount(&mock_server)
        .await;

    let registry = DdlRegistry::new(vec![
        spec("lectures", &[]),
        spec("lecture_chapters", &["lectures"]),
        spec("saas_products", &[]),
    ])
    .unwrap();
    let samples: BTreeMap<String, SampleRecord> = [
        ("lectures", "ai-agent-master"),
        ("lecture_chapters", "chapter-1"),
        ("saas_products", "product-1"),
    ]
    .into_iter()
    .map(|(t, id)| (t.to_string(), sample(t, id)))
    .collect();
    let existing = set(&["lectures", "lecture_chapters", "saas_products"]);

    let client = create_test_client(&mock_server);
    let seeder = Seeder::new(&client);
    let first = seeder.seed(registry.specs(), &samples, &existing).await;
    let second = seeder.seed(registry.specs(), &samples, &existing).await;

    assert_eq!(first.success_map(), second.success_map());
    assert!(second.success_map().values().all(|ok| *ok));
    assert_eq!(first.outcomes["lectures"], SeedOutcome::Inserted);
    assert_eq!(second.outcomes["lectures"], SeedOutcome::AlreadyPresent);
    assert_eq!(second.outcomes["lecture_chapters"], SeedOutcome::AlreadyPresent);
}

#[tokio::test]
async fn test_seed_skips_table_with_absent_dependency() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/lecture_chapters"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/saas_products"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&mock_server)
        .await;

    let registry = DdlRegistry::new(vec![
        spec("lectures", &[]),
        spec("lecture_chapters", &["lectures"]),
        spec("saas_products", &[]),
    ])
    .unwrap();
    let mut samples = BTreeMap::new();
    samples.insert("lecture_chapters".to_string(), sample("lecture_chapters", "chapter-1"));
    samples.insert("saas_products".to_string(), sample("saas_products", "product-1"));

    // lectures was probed missing
    let existing = set(&["lecture_chapters", "saas_products"]);

    let client = create_test_client(&mock_server);
    let report = Seeder::new(&client)
        .seed(registry.specs(), &samples, &existing)
        .await;

    assert!(matches!(
        report.outcomes["lecture_chapters"],
        SeedOutcome::Skipped(_)
    ));
    assert_eq!(report.outcomes["saas_products"], SeedOutcome::Inserted);
    assert!(!report.success_map()["lecture_chapters"]);
}

#[tokio::test]
async fn test_seed_failure_blocks_dependents_only() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/lectures"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "code": "23502",
            "message": "null value in column \"title\" violates not-null constraint"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/lecture_chapters"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/showcase_sites"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&mock_server)
        .await;

    let registry = DdlRegistry::new(vec![
        spec("lectures", &[]),
        spec("lecture_chapters", &["lectures"]),
        spec("showcase_sites", &[]),
    ])
    .unwrap();
    let samples: BTreeMap<String, SampleRecord> = [
        ("lectures", "ai-agent-master"),
        ("lecture_chapters", "chapter-1"),
        ("showcase_sites", "sample-site-1"),
    ]
    .into_iter()
    .map(|(t, id)| (t.to_string(), sample(t, id)))
    .collect();
    let existing = set(&["lectures", "lecture_chapters", "showcase_sites"]);

    let client = create_test_client(&mock_server);
    let report = Seeder::new(&client)
        .seed(registry.specs(), &samples, &existing)
        .await;

    assert!(matches!(
        report.outcomes["lectures"],
        SeedOutcome::Failed {
            kind: ErrorKind::Transient,
            ..
        }
    ));
    assert!(matches!(
        report.outcomes["lecture_chapters"],
        SeedOutcome::Skipped(_)
    ));
    assert_eq!(report.outcomes["showcase_sites"], SeedOutcome::Inserted);
}

#[tokio::test]
async fn test_seed_foreign_key_rejection_is_a_failure() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/lecture_chapters"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "23503",
            "details": "Key (lecture_id)=(ai-agent-master) is not present in table \"lectures\".",
            "hint": null,
            "message": "insert or update on table \"lecture_chapters\" violates foreign key constraint \"lecture_chapters_lecture_id_fkey\""
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    // lectures is present but has no sample, so nothing seeds the parent row
    let registry = DdlRegistry::new(vec![
        spec("lectures", &[]),
        spec("lecture_chapters", &["lectures"]),
    ])
    .unwrap();
    let samples: BTreeMap<String, SampleRecord> =
        [("lecture_chapters".to_string(), sample("lecture_chapters", "chapter-1"))].into();
    let existing = set(&["lectures", "lecture_chapters"]);

    let client = create_test_client(&mock_server);
    let report = Seeder::new(&client)
        .seed(registry.specs(), &samples, &existing)
        .await;

    assert!(matches!(
        report.outcomes["lecture_chapters"],
        SeedOutcome::Failed {
            kind: ErrorKind::Transient,
            ..
        }
    ));
    assert!(!report.success_map()["lecture_chapters"]);
}

#[tokio::test]
async fn test_seed_dependency_without_sample_counts_when_present() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/community_posts"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&mock_server)
        .await;

    let registry = DdlRegistry::new(vec![
        spec("profiles", &[]),
        spec("community_posts", &["profiles"]),
    ])
    .unwrap();
    let mut samples = BTreeMap::new();
    samples.insert("community_posts".to_string(), sample("community_posts", "sample-post-1"));
    let existing = set(&["profiles", "community_posts"]);

    let client = create_test_client(&mock_server);
    let report = Seeder::new(&client)
        .seed(registry.specs(), &samples, &existing)
        .await;

    assert_eq!(report.outcomes.len(), 1);
    assert_eq!(report.outcomes["community_posts"], SeedOutcome::Inserted);
}

#[tokio::test]
async fn test_reconcile_renders_only_missing_tables() {
    let mock_server = MockServer::start().await;
    mount_probe(&mock_server, "lectures", 200, "[]").await;
    mount_probe(&mock_server, "payments", 404, MISSING_BODY).await;
    mount_probe(&mock_server, "profiles", 500, "").await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/lectures"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&mock_server)
        .await;

    let registry = DdlRegistry::new(vec![
        spec("profiles", &[]),
        spec("lectures", &[]),
        spec("payments", &["lectures"]),
    ])
    .unwrap();
    let mut samples = BTreeMap::new();
    samples.insert("lectures".to_string(), sample("lectures", "ai-agent-master"));
    samples.insert("payments".to_string(), sample("payments", "pay-1"));

    let client = create_test_client(&mock_server);
    let report = Reconciler::new(&client, &registry, &samples)
        .run(ReconcileOptions::default())
        .await;

    assert_eq!(report.missing_ddl.keys().collect::<Vec<_>>(), vec!["payments"]);
    assert!(report.ddl_script.contains("CREATE TABLE public.payments"));
    assert!(!report.ddl_script.contains("public.profiles"));

    let seed = report.seed.as_ref().unwrap();
    assert_eq!(seed.outcomes["lectures"], SeedOutcome::Inserted);
    assert!(matches!(seed.outcomes["payments"], SeedOutcome::Skipped(_)));

    let printed = report.to_string();
    assert!(printed.contains("Missing tables:  payments"));
}

#[tokio::test]
async fn test_reconcile_summary_prints_when_everything_fails() {
    let config = Config::for_base_url("http://127.0.0.1:1", "test_key");
    let client = RestClient::new(&config).unwrap();
    let (registry, samples) = schema_bootstrap::manifest::Manifest::builtin()
        .into_parts()
        .unwrap();

    let report = Reconciler::new(&client, &registry, &samples)
        .run(ReconcileOptions::default())
        .await;

    assert_eq!(report.probe.errored.len(), registry.specs().len());
    assert!(report.probe.existing.is_empty());
    assert!(report.probe.missing.is_empty());
    assert!(report.ddl_script.is_empty());
    assert!(report.to_string().contains("Unknown (probe failed)"));
}
