use major_reclassify::infrastructure::{FaultPlan, Tamper};
use major_reclassify::workflow::GroupStatus;
use major_reclassify::{
    AdmissionRecord, AliasRule, CategoryRule, ConsistencyNormalizer, InMemoryStore,
    ReclassificationEngine, RuleSet, RunCtx, RunStatus, Selection,
};
use std::time::Duration;

fn rules() -> RuleSet {
    RuleSet::new(vec![
        CategoryRule::new("文学", ["汉语言", "英语"]),
        CategoryRule::new("工学", ["计算机", "工程"]),
        CategoryRule::new("医学", ["临床", "护理"]),
    ])
    .unwrap()
}

/// 三个门类组 + 一条未分类 + 两条不在选择范围内的记录
fn store() -> InMemoryStore {
    InMemoryStore::from_records([
        AdmissionRecord::new(1, 2025, "汉语言文学", "综合"),
        AdmissionRecord::new(2, 2025, "计算机科学与技术", "综合"),
        AdmissionRecord::new(3, 2025, "土木工程", "综合"),
        AdmissionRecord::new(4, 2025, "临床医学", "综合"),
        AdmissionRecord::new(5, 2025, "考古学", "综合"),
        AdmissionRecord::new(6, 2025, "美术学", "艺术类"),
        AdmissionRecord::new(7, 2024, "英语", "历史类"),
    ])
}

fn categories(store: &InMemoryStore) -> Vec<Option<String>> {
    store.records().into_iter().map(|r| r.category).collect()
}

#[tokio::test]
async fn test_run_commits_all_groups() {
    let rules = rules();
    let store = store();
    let engine = ReclassificationEngine::new(&rules, Selection::placeholder("综合"));

    let report = engine.run(&store, &RunCtx::new(false)).await;

    assert_eq!(report.status, RunStatus::Committed);
    assert_eq!(report.eligible, 5);
    assert_eq!(report.unclassified, 1);
    assert_eq!(report.unclassified_samples, ["考古学"]);
    assert_eq!(report.updated_total(), 4);
    assert_eq!(report.group("工学").unwrap().updated, 2);

    assert_eq!(store.category_of(1).as_deref(), Some("文学"));
    assert_eq!(store.category_of(2).as_deref(), Some("工学"));
    assert_eq!(store.category_of(3).as_deref(), Some("工学"));
    assert_eq!(store.category_of(4).as_deref(), Some("医学"));
    // 未分类保持原科类，范围外的记录不动
    assert_eq!(store.category_of(5).as_deref(), Some("综合"));
    assert_eq!(store.category_of(6).as_deref(), Some("艺术类"));
    assert_eq!(store.category_of(7).as_deref(), Some("历史类"));
}

#[tokio::test]
async fn test_failure_on_second_group_rolls_back_everything() {
    let rules = rules();
    let store = store();
    let before = categories(&store);
    let engine = ReclassificationEngine::new(&rules, Selection::placeholder("综合"));

    store.inject(FaultPlan {
        fail_on_update: Some(2),
        ..Default::default()
    });
    let report = engine.run(&store, &RunCtx::new(false)).await;

    assert!(matches!(
        report.status,
        RunStatus::RolledBack {
            retryable: true,
            ..
        }
    ));
    assert_eq!(categories(&store), before);
    assert_eq!(report.updated_total(), 0);
    // 报告仍然反映计算出的分组
    assert_eq!(report.groups.len(), 3);
    assert_eq!(report.groups[0].status, GroupStatus::RolledBack);
    assert_eq!(report.groups[1].status, GroupStatus::Failed);
    assert_eq!(report.groups[2].status, GroupStatus::NotAttempted);
    assert_eq!(report.groups[1].planned, 2);
    assert_eq!(report.unclassified, 1);

    // 原样重试即可全部提交
    let retry = engine.run(&store, &RunCtx::new(false)).await;
    assert_eq!(retry.status, RunStatus::Committed);
    assert_eq!(retry.updated_total(), 4);
    assert!(retry
        .groups
        .iter()
        .all(|g| g.status == GroupStatus::Applied));
}

#[tokio::test]
async fn test_commit_failure_leaves_store_untouched() {
    let rules = rules();
    let store = store();
    let before = categories(&store);
    store.inject(FaultPlan {
        fail_commit: true,
        ..Default::default()
    });

    let report = ReclassificationEngine::new(&rules, Selection::placeholder("综合"))
        .run(&store, &RunCtx::new(false))
        .await;

    assert!(report.status.is_rolled_back());
    assert_eq!(categories(&store), before);
    assert!(report
        .groups
        .iter()
        .all(|g| g.status == GroupStatus::RolledBack && g.updated == 0));
}

#[tokio::test]
async fn test_select_failure_reported() {
    let rules = rules();
    let store = store();
    store.inject(FaultPlan {
        fail_select: true,
        ..Default::default()
    });

    let report = ReclassificationEngine::new(&rules, Selection::placeholder("综合"))
        .run(&store, &RunCtx::new(false))
        .await;

    assert!(report.status.is_rolled_back());
    assert_eq!(report.eligible, 0);
    assert!(report.groups.is_empty());
}

#[tokio::test]
async fn test_timeout_is_transient() {
    let rules = rules();
    let store = store();
    store.inject(FaultPlan {
        select_delay: Some(Duration::from_millis(200)),
        ..Default::default()
    });

    let report = ReclassificationEngine::new(&rules, Selection::placeholder("综合"))
        .with_timeout(Some(Duration::from_millis(20)))
        .run(&store, &RunCtx::new(false))
        .await;

    match report.status {
        RunStatus::RolledBack { reason, retryable } => {
            assert!(retryable);
            assert!(reason.contains("超时"));
        }
        other => panic!("应当回滚: {:?}", other),
    }
    assert_eq!(store.category_of(1).as_deref(), Some("综合"));
}

#[tokio::test]
async fn test_tampered_group_is_skipped_not_aborted() {
    let rules = rules();
    let store = store();
    // 读取之后，工学组的一条记录被外部改走
    store.inject(FaultPlan {
        tamper_after_select: vec![Tamper::SetCategory(3, "工学".into())],
        ..Default::default()
    });

    let report = ReclassificationEngine::new(&rules, Selection::placeholder("综合"))
        .run(&store, &RunCtx::new(false))
        .await;

    assert_eq!(report.status, RunStatus::Committed);
    let discrepancies: Vec<_> = report.discrepancies().collect();
    assert_eq!(discrepancies.len(), 1);
    assert_eq!(discrepancies[0].discipline, "工学");
    assert_eq!(discrepancies[0].expected, 2);
    assert_eq!(discrepancies[0].matched, 1);

    assert_eq!(store.category_of(1).as_deref(), Some("文学"));
    assert_eq!(store.category_of(4).as_deref(), Some("医学"));
    // 被跳过的组整组未改
    assert_eq!(store.category_of(2).as_deref(), Some("综合"));
}

#[tokio::test]
async fn test_deleted_record_is_discrepancy() {
    let rules = rules();
    let store = store();
    store.inject(FaultPlan {
        tamper_after_select: vec![Tamper::Delete(4)],
        ..Default::default()
    });

    let report = ReclassificationEngine::new(&rules, Selection::placeholder("综合"))
        .run(&store, &RunCtx::new(false))
        .await;

    assert_eq!(report.status, RunStatus::Committed);
    assert!(matches!(
        report.group("医学").unwrap().status,
        GroupStatus::Discrepancy(_)
    ));
    assert_eq!(report.updated_total(), 3);
}

#[tokio::test]
async fn test_year_filter() {
    let rules = rules();
    let store = InMemoryStore::from_records([
        AdmissionRecord::new(1, 2024, "英语", "综合"),
        AdmissionRecord::new(2, 2025, "英语", "综合"),
    ]);

    let report = ReclassificationEngine::new(&rules, Selection::placeholder("综合").with_year(2025))
        .run(&store, &RunCtx::new(false))
        .await;

    assert_eq!(report.eligible, 1);
    assert_eq!(store.category_of(1).as_deref(), Some("综合"));
    assert_eq!(store.category_of(2).as_deref(), Some("文学"));
}

#[tokio::test]
async fn test_only_category_column_written() {
    let rules = rules();
    let mut record = AdmissionRecord::new(1, 2025, "护理学", "综合");
    record.university_name = Some("某医科大学".into());
    record.extra.insert("min_score".into(), 587.into());
    let store = InMemoryStore::from_records([record.clone()]);

    ReclassificationEngine::new(&rules, Selection::placeholder("综合"))
        .run(&store, &RunCtx::new(false))
        .await;

    let after = &store.records()[0];
    assert_eq!(after.category.as_deref(), Some("医学"));
    assert_eq!(
        AdmissionRecord {
            category: record.category.clone(),
            ..after.clone()
        },
        record
    );
}

#[tokio::test]
async fn test_preview_writes_nothing() {
    let rules = rules();
    let store = store();
    let before = categories(&store);

    let report = ReclassificationEngine::new(&rules, Selection::placeholder("综合"))
        .preview(&store, &RunCtx::new(true))
        .await;

    assert_eq!(report.status, RunStatus::Preview);
    assert_eq!(report.group("工学").unwrap().planned, 2);
    assert_eq!(report.updated_total(), 0);
    assert_eq!(categories(&store), before);
}

#[tokio::test]
async fn test_rerun_is_deterministic() {
    let rules = rules();
    let a = store();
    let b = store();
    let engine = ReclassificationEngine::new(&rules, Selection::placeholder("综合"));

    engine.run(&a, &RunCtx::new(false)).await;
    engine.run(&b, &RunCtx::new(false)).await;

    assert_eq!(categories(&a), categories(&b));
}

#[tokio::test]
async fn test_concurrent_runs_serialize() {
    let rules = rules();
    let store = store();
    let engine = ReclassificationEngine::new(&rules, Selection::placeholder("综合"));
    let ctx = RunCtx::new(false);

    let (first, second) = tokio::join!(engine.run(&store, &ctx), engine.run(&store, &ctx));

    // 一轮做完所有修改，另一轮在其提交后看不到待分类记录（只剩未分类的一条）
    assert_eq!(first.updated_total() + second.updated_total(), 4);
    assert_eq!(store.category_of(5).as_deref(), Some("综合"));
    assert_eq!(store.category_of(3).as_deref(), Some("工学"));
}

#[tokio::test]
async fn test_normalizer_is_idempotent() {
    let store = store();
    let aliases = vec![AliasRule::new(["艺术类"], "艺术学").unwrap()];
    let normalizer = ConsistencyNormalizer::new(&aliases);

    let first = normalizer.run(&store, &RunCtx::new(false)).await;
    assert_eq!(first.status, RunStatus::Committed);
    assert_eq!(first.updated_total(), 1);
    assert_eq!(store.category_of(6).as_deref(), Some("艺术学"));

    let second = normalizer.run(&store, &RunCtx::new(false)).await;
    assert_eq!(second.status, RunStatus::Committed);
    assert_eq!(second.updated_total(), 0);
}

#[tokio::test]
async fn test_normalizer_failure_rolls_back_all_rules() {
    let store = store();
    let before = categories(&store);
    let aliases = vec![
        AliasRule::new(["艺术类"], "艺术学").unwrap(),
        AliasRule::new(["历史类"], "文学").unwrap(),
    ];
    store.inject(FaultPlan {
        fail_on_update: Some(2),
        ..Default::default()
    });

    let report = ConsistencyNormalizer::new(&aliases)
        .run(&store, &RunCtx::new(false))
        .await;

    assert!(report.status.is_rolled_back());
    assert_eq!(report.updated_total(), 0);
    assert_eq!(categories(&store), before);
}
