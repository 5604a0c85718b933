use serde_json::json;
use tempfile::TempDir;
use ideascore_lib::analysis::contrast::{Region, TextTone};
use ideascore_lib::commands::db::{record_lead, record_page_event, test_run_crud};
use ideascore_lib::commands::scoring::{
    get_metrics, get_score_report, get_validation_score, suggest_text_tone,
};
use ideascore_lib::commands::settings::{get_settings, save_settings};
use ideascore_lib::models::ad_spend::TestRun;
use ideascore_lib::models::score::Verdict;

// 2024-05-01T12:00:00Z
const MAY_1: i64 = 1_714_564_800;
const DAY: i64 = 86_400;

fn create_workspace() -> (TempDir, String) {
    let temp_dir = tempfile::tempdir().expect("create temp dir");
    let workspace_path = temp_dir.path().to_string_lossy().to_string();
    (temp_dir, workspace_path)
}

async fn seed_funnel(workspace_path: &str, project_id: &str, visitors: usize, clicks: usize, leads: usize) {
    for i in 0..visitors {
        record_page_event(
            workspace_path.to_string(),
            project_id.to_string(),
            "visit".to_string(),
            format!("visitor-{i}"),
            Some(MAY_1),
        )
        .await
        .expect("record visit");
    }
    for i in 0..clicks {
        record_page_event(
            workspace_path.to_string(),
            project_id.to_string(),
            "pricing_click".to_string(),
            format!("visitor-{i}"),
            Some(MAY_1),
        )
        .await
        .expect("record pricing click");
    }
    for i in 0..leads {
        record_lead(
            workspace_path.to_string(),
            project_id.to_string(),
            format!("lead{i}@example.com"),
            None,
        )
        .await
        .expect("record lead");
    }
}

fn test_run(project_id: &str, spend: Option<i64>, impressions: Option<i64>, clicks: Option<i64>) -> TestRun {
    TestRun {
        id: String::new(),
        project_id: project_id.to_string(),
        ad_spend_cents: spend,
        impressions,
        clicks,
        notes: None,
        created_at: 0,
        updated_at: 0,
    }
}

#[tokio::test]
async fn empty_project_scores_zero() {
    let (_tmp, workspace_path) = create_workspace();

    let score = get_validation_score(workspace_path, "proj-empty".to_string(), None, None)
        .await
        .expect("score empty project");

    assert_eq!(score.total, 0);
    assert_eq!(score.breakdown.traffic, 0.0);
    assert_eq!(score.breakdown.engagement, 0.0);
    assert_eq!(score.breakdown.intent, 0.0);
}

#[tokio::test]
async fn full_funnel_scores_one_hundred_and_serializes_contract() {
    let (_tmp, workspace_path) = create_workspace();
    seed_funnel(&workspace_path, "proj-1", 100, 8, 2).await;

    let metrics = get_metrics(workspace_path.clone(), "proj-1".to_string(), None, None)
        .await
        .expect("metrics");
    assert_eq!(metrics.visitors, 100);
    assert_eq!(metrics.pricing_clicks_total, 8);
    assert_eq!(metrics.leads, 2);

    let score = get_validation_score(workspace_path, "proj-1".to_string(), None, None)
        .await
        .expect("score");
    assert_eq!(score.total, 100);

    let value = serde_json::to_value(score).expect("serialize score");
    assert_eq!(value["total"], json!(100));
    assert_eq!(value["breakdown"]["traffic"], json!(30.0));
    assert_eq!(value["breakdown"]["engagement"], json!(40.0));
    assert_eq!(value["breakdown"]["intent"], json!(30.0));
}

#[tokio::test]
async fn date_range_limits_counted_events() {
    let (_tmp, workspace_path) = create_workspace();
    for (i, at) in [MAY_1 - DAY, MAY_1, MAY_1 + 6 * DAY, MAY_1 + 7 * DAY].iter().enumerate() {
        record_page_event(
            workspace_path.clone(),
            "proj-1".to_string(),
            "visit".to_string(),
            format!("v{i}"),
            Some(*at),
        )
        .await
        .expect("record visit");
    }

    let week = get_metrics(
        workspace_path.clone(),
        "proj-1".to_string(),
        Some("2024-05-01".to_string()),
        Some("2024-05-07".to_string()),
    )
    .await
    .expect("metrics for week");
    assert_eq!(week.visitors, 2);

    let inverted = get_metrics(
        workspace_path,
        "proj-1".to_string(),
        Some("2024-05-07".to_string()),
        Some("2024-05-01".to_string()),
    )
    .await
    .unwrap_err();
    assert!(inverted.starts_with("INVALID_RANGE"));
}

#[tokio::test]
async fn test_run_crud_contract_and_cpc_bonus() {
    let (_tmp, workspace_path) = create_workspace();
    seed_funnel(&workspace_path, "proj-ads", 100, 0, 0).await;

    let created = test_run_crud(
        workspace_path.clone(),
        "create".to_string(),
        Some(test_run("proj-ads", Some(50_000), Some(20_000), Some(50))),
        None,
        None,
    )
    .await
    .expect("create test run");
    assert_eq!(created["status"], json!("created"));
    let run_id = created["id"].as_str().expect("run id").to_string();

    let report = get_score_report(workspace_path.clone(), "proj-ads".to_string(), None, None)
        .await
        .expect("report with expensive clicks");
    assert_eq!(report.cost_per_click, Some(10.0));
    assert!((report.cpc_bonus - 1.0).abs() < 1e-9);
    assert_eq!(report.score.total, 31);

    let read = test_run_crud(workspace_path.clone(), "read".to_string(), None, Some(run_id.clone()), None)
        .await
        .expect("read test run");
    let mut stored: TestRun = serde_json::from_value(read).expect("test run json");
    assert_eq!(stored.clicks, Some(50));

    stored.ad_spend_cents = Some(1700);
    stored.clicks = Some(120);
    let updated = test_run_crud(workspace_path.clone(), "update".to_string(), Some(stored), None, None)
        .await
        .expect("update test run");
    assert_eq!(updated["status"], json!("updated"));

    let score = get_validation_score(workspace_path.clone(), "proj-ads".to_string(), None, None)
        .await
        .expect("score with cheap clicks");
    assert_eq!(score.total, 35);

    let listed = test_run_crud(
        workspace_path.clone(),
        "list".to_string(),
        None,
        None,
        Some("proj-ads".to_string()),
    )
    .await
    .expect("list test runs");
    assert_eq!(listed.as_array().expect("list array").len(), 1);

    let deleted = test_run_crud(workspace_path.clone(), "delete".to_string(), None, Some(run_id.clone()), None)
        .await
        .expect("delete test run");
    assert_eq!(deleted["status"], json!("deleted"));

    let again = test_run_crud(workspace_path.clone(), "delete".to_string(), None, Some(run_id), None)
        .await
        .unwrap_err();
    assert!(again.starts_with("NOT_FOUND"));

    let score = get_validation_score(workspace_path, "proj-ads".to_string(), None, None)
        .await
        .expect("score without ad spend");
    assert_eq!(score.total, 30);
}

#[tokio::test]
async fn test_run_entry_validation_rejects_bad_numbers() {
    let (_tmp, workspace_path) = create_workspace();

    let negative = test_run_crud(
        workspace_path.clone(),
        "create".to_string(),
        Some(test_run("proj-1", Some(-100), None, None)),
        None,
        None,
    )
    .await
    .unwrap_err();
    assert!(negative.starts_with("INVALID_INPUT"));

    let missing = test_run_crud(
        workspace_path.clone(),
        "update".to_string(),
        Some(TestRun {
            id: "nope".to_string(),
            ..test_run("proj-1", Some(100), None, None)
        }),
        None,
        None,
    )
    .await
    .unwrap_err();
    assert!(missing.starts_with("NOT_FOUND"));

    let unknown = test_run_crud(workspace_path, "archive".to_string(), None, None, None)
        .await
        .unwrap_err();
    assert!(unknown.contains("Unknown operation"));
}

#[tokio::test]
async fn latest_test_run_wins() {
    let (_tmp, workspace_path) = create_workspace();

    for spend in [50_000, 100] {
        test_run_crud(
            workspace_path.clone(),
            "create".to_string(),
            Some(test_run("proj-1", Some(spend), None, Some(50))),
            None,
            None,
        )
        .await
        .expect("create run");
    }

    let latest = test_run_crud(
        workspace_path,
        "latest".to_string(),
        None,
        None,
        Some("proj-1".to_string()),
    )
    .await
    .expect("latest run");
    assert_eq!(latest["ad_spend_cents"], json!(100));
}

#[tokio::test]
async fn leads_are_deduplicated_and_validated() {
    let (_tmp, workspace_path) = create_workspace();

    let first = record_lead(
        workspace_path.clone(),
        "proj-1".to_string(),
        "Founder@Example.com ".to_string(),
        Some("Ada".to_string()),
    )
    .await
    .expect("first lead");
    assert_eq!(first["status"], json!("created"));

    let repeat = record_lead(
        workspace_path.clone(),
        "proj-1".to_string(),
        "founder@example.com".to_string(),
        None,
    )
    .await
    .expect("repeat lead");
    assert_eq!(repeat["status"], json!("duplicate"));

    let invalid = record_lead(workspace_path.clone(), "proj-1".to_string(), "not-an-email".to_string(), None)
        .await
        .unwrap_err();
    assert!(invalid.starts_with("INVALID_INPUT"));

    let metrics = get_metrics(workspace_path, "proj-1".to_string(), None, None)
        .await
        .expect("metrics");
    assert_eq!(metrics.leads, 1);
}

#[tokio::test]
async fn unknown_event_kind_is_rejected() {
    let (_tmp, workspace_path) = create_workspace();

    let err = record_page_event(
        workspace_path,
        "proj-1".to_string(),
        "signup".to_string(),
        "v1".to_string(),
        None,
    )
    .await
    .unwrap_err();
    assert!(err.starts_with("INVALID_INPUT"));
}

#[tokio::test]
async fn settings_tune_scoring_and_verdict() {
    let (_tmp, workspace_path) = create_workspace();
    seed_funnel(&workspace_path, "proj-1", 50, 0, 0).await;

    let initial = get_settings(workspace_path.clone()).await.expect("load settings");
    assert_eq!(initial["scoring"]["trafficTargetVisitors"], json!(100.0));

    let before = get_validation_score(workspace_path.clone(), "proj-1".to_string(), None, None)
        .await
        .expect("score before");
    assert_eq!(before.total, 15);

    let saved = save_settings(
        workspace_path.clone(),
        json!({
            "scoring": { "trafficTargetVisitors": 50 },
            "weakThreshold": 20,
            "strongThreshold": 25
        }),
    )
    .await
    .expect("save settings");
    assert_eq!(saved["scoring"]["intentTargetRate"], initial["scoring"]["intentTargetRate"]);

    let report = get_score_report(workspace_path, "proj-1".to_string(), None, None)
        .await
        .expect("report after");
    assert_eq!(report.score.total, 30);
    assert_eq!(report.verdict, Verdict::Promising);
}

#[tokio::test]
async fn text_tone_follows_image_brightness() {
    let (_tmp, workspace_path) = create_workspace();

    let white = vec![255u8; 16 * 16 * 4];
    let suggestion = suggest_text_tone(workspace_path.clone(), white, 16, 16, None)
        .await
        .expect("tone for white image");
    assert_eq!(suggestion.tone, TextTone::Dark);

    let mut half = Vec::new();
    for _y in 0..16 {
        for x in 0..16 {
            let v = if x < 8 { 255 } else { 0 };
            half.extend_from_slice(&[v, v, v, 255]);
        }
    }
    let right = Region {
        x: 8,
        y: 0,
        width: 8,
        height: 16,
    };
    let suggestion = suggest_text_tone(workspace_path.clone(), half, 16, 16, Some(right))
        .await
        .expect("tone for dark half");
    assert_eq!(suggestion.tone, TextTone::Light);

    let short = suggest_text_tone(workspace_path, vec![0u8; 10], 16, 16, None)
        .await
        .unwrap_err();
    assert!(short.starts_with("INVALID_INPUT"));
}

#[tokio::test]
async fn oversized_image_dimensions_are_rejected() {
    let (_tmp, workspace_path) = create_workspace();

    let err = suggest_text_tone(workspace_path, vec![0u8; 16], u32::MAX, u32::MAX, None)
        .await
        .unwrap_err();
    assert!(err.starts_with("INVALID_INPUT"));
}

#[tokio::test]
async fn oversized_weights_keep_breakdown_in_range() {
    let (_tmp, workspace_path) = create_workspace();
    seed_funnel(&workspace_path, "proj-heavy", 100, 0, 0).await;

    let saved = save_settings(
        workspace_path.clone(),
        json!({ "scoring": { "weights": { "traffic": 100, "engagement": 100 } } }),
    )
    .await
    .expect("save oversized weights");
    assert_eq!(saved["scoring"]["weights"]["traffic"], json!(30.0));
    assert_eq!(saved["scoring"]["weights"]["engagement"], json!(40.0));

    let score = get_validation_score(workspace_path, "proj-heavy".to_string(), None, None)
        .await
        .expect("score with capped weights");
    assert!((score.breakdown.traffic - 30.0).abs() < 1e-9);
    assert_eq!(score.breakdown.engagement, 0.0);
    assert_eq!(score.total, 30);
}

#[tokio::test]
async fn corrupt_settings_file_is_backed_up_before_reset() {
    let (_tmp, workspace_path) = create_workspace();
    let dir = std::path::Path::new(&workspace_path).join(".ideascore");
    std::fs::create_dir_all(&dir).expect("create settings dir");
    std::fs::write(dir.join("settings.json"), "{ not json").expect("write corrupt settings");

    let settings = get_settings(workspace_path.clone()).await.expect("settings");
    assert_eq!(settings["scoring"]["weights"]["intent"], json!(30.0));

    let backup = std::fs::read_to_string(dir.join("settings.json.bak")).expect("backup exists");
    assert_eq!(backup, "{ not json");
    let rewritten = std::fs::read_to_string(dir.join("settings.json")).expect("settings rewritten");
    assert!(serde_json::from_str::<serde_json::Value>(&rewritten).is_ok());
}
