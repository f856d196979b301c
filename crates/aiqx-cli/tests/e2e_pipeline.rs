//! End-to-end pipeline tests over the library crates.
//!
//! These drive the full flow (pack → prompt → response → scores → history →
//! recommendations) against a file-backed workspace and a mock catalog.

use chrono::{TimeZone, Utc};
use serde_json::json;

use aiqx_catalog::import::{apply_imports, fetch_packs, FetchOptions, ImportStatus, NoProgress};
use aiqx_catalog::mock::MockSource;
use aiqx_catalog::FetchError;
use aiqx_core::builtin::builtin_packs;
use aiqx_core::bundle::{export_bundle, merge_import, parse_bundle};
use aiqx_core::compare::cross_model_matrix;
use aiqx_core::recommend::recommend;
use aiqx_core::store::FileStore;
use aiqx_core::workspace::OnConflict;
use aiqx_core::{analyze, AiqError, Session, TierName, Workspace};

fn seeded() -> (Workspace, Session) {
    let mut ws = Workspace::new();
    for pack in builtin_packs().unwrap() {
        ws.install_pack(pack);
    }
    ws.add_model("alpha").unwrap();
    let session = Session {
        model: Some("alpha".into()),
        pack: Some("aiqx-core".into()),
        tier: TierName::Basic,
    };
    (ws, session)
}

/// Answer every marker of the selected prompt with `answer`, echoing the
/// prompt first the way chat models often do.
fn respond(ws: &Workspace, session: &Session, answer: &str) -> String {
    let prompt = session.prompt(ws).unwrap();
    let (_, tier) = session.resolve(ws).unwrap();
    let body: String = tier
        .expected_domains
        .iter()
        .map(|d| format!("[[{d}]] {answer}\n"))
        .collect();
    format!("{prompt}\n\nSure.\nBEGIN AIQ-X RESPONSES\n{body}END AIQ-X RESPONSES\n")
}

#[test]
fn e2e_analyze_persist_reload() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path().join("data"));
    let (mut ws, session) = seeded();

    let response = respond(&ws, &session, "It depends, because 2 + 2 = 4; for example, sometimes.");
    let now = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
    let record = analyze(&mut ws, &session, &response, now).unwrap();
    assert_eq!(record.scores.len(), 5);
    assert!(record.scores.values().all(|&s| s == record.scores.get("logic").copied().unwrap()));
    assert!(record.overall() > 30);

    ws.save(&store).unwrap();
    session.save(&store).unwrap();

    let reloaded = Workspace::load(&store).unwrap();
    assert_eq!(reloaded, ws);
    let restored = Session::load(&store, &reloaded).unwrap();
    assert_eq!(restored, session);
}

#[test]
fn e2e_failed_analysis_leaves_history_untouched() {
    let (mut ws, session) = seeded();
    let before = ws.clone();

    let err = analyze(&mut ws, &session, "no envelope at all", Utc::now()).unwrap_err();
    assert!(matches!(err, AiqError::MarkerNotFound(_)));
    assert_eq!(ws, before);

    let no_tier = Session {
        tier: TierName::Expert,
        pack: Some("missing".into()),
        ..session.clone()
    };
    let err = analyze(&mut ws, &no_tier, "BEGIN AIQ-X RESPONSES\nEND AIQ-X RESPONSES", Utc::now())
        .unwrap_err();
    assert!(matches!(err, AiqError::NoValidSelection(_)));
    assert_eq!(ws, before);
}

#[test]
fn e2e_rank_and_merge() {
    let (mut ws, mut session) = seeded();
    let strong = respond(
        &ws,
        &session,
        "First, it might depend on assumptions; therefore 3 * 4 = 12. For example, consider limits.",
    );
    analyze(&mut ws, &session, &strong, Utc::now()).unwrap();

    ws.add_model("beta").unwrap();
    session.model = Some("beta".into());
    let weak = respond(&ws, &session, "Obviously yes, always.");
    analyze(&mut ws, &session, &weak, Utc::now()).unwrap();

    let ranking = recommend(&ws);
    let order: Vec<_> = ranking.iter().map(|r| r.model.as_str()).collect();
    assert_eq!(order, vec!["alpha", "beta"]);
    assert!(ranking[0].avg_score > ranking[1].avg_score);
    assert!(!ranking[0].use_cases.is_empty());

    let matrix = cross_model_matrix(&ws);
    assert_eq!(matrix.columns, vec!["alpha", "beta"]);
    assert_eq!(matrix.rows.len(), 5);

    // Export, then merge into an empty workspace.
    let exported = serde_json::to_string(&export_bundle(&ws, Utc::now())).unwrap();
    let bundle = parse_bundle(&exported).unwrap();
    let (merged, stats) = merge_import(&Workspace::new(), bundle);
    assert_eq!(stats.models_added, 2);
    assert_eq!(stats.records_added, 2);
    assert_eq!(stats.packs_added, 1);
    assert_eq!(recommend(&merged), ranking);
}

#[tokio::test(start_paused = true)]
async fn e2e_catalog_import_then_analyze() {
    let source = MockSource::new()
        .with_document(
            "Test-Packs/Community-Packs/poetry.json",
            json!({
                "id": "poetry",
                "version": "1.0",
                "name": "Poetry",
                "domains": [{"id": "meter", "name": "Meter"}],
                "tiers": {"basic": {"prompt": "[[meter]] Write a haiku.", "questionCount": 1}}
            }),
        )
        .with_document("Test-Packs/broken.json", json!({"name": "no id or tiers"}))
        .with_failure(
            "Test-Packs/Community-Packs/poetry.json",
            FetchError::RateLimited { retry_after_ms: 1000 },
        );

    let paths = vec![
        "Test-Packs/Community-Packs/poetry.json".to_string(),
        "Test-Packs/broken.json".to_string(),
    ];
    let fetched = fetch_packs(&source, &paths, &FetchOptions::default(), &NoProgress).await;

    let (mut ws, mut session) = seeded();
    let reports = apply_imports(&mut ws, fetched, OnConflict::Keep);
    assert!(reports[0].is_success());
    assert!(matches!(
        reports[1].status,
        ImportStatus::Failed { permanent: true, .. }
    ));
    assert_eq!(ws.custom_packs.len(), 1);

    session.pack = Some("poetry".into());
    let record = analyze(
        &mut ws,
        &session,
        "BEGIN AIQ-X RESPONSES\n[[meter]] Five, seven, five.\nEND AIQ-X RESPONSES",
        Utc::now(),
    )
    .unwrap();
    assert_eq!(record.pack_id, "poetry");
    assert_eq!(ws.display_name("meter", None), "Meter");
}
