use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use fitassess::database::SqliteStore;
use fitassess::leaderboard::{Leaderboard, LeaderboardQuery};
use fitassess::{
    EmgSample, EmgSession, EmgSessionData, MetricExtractor, MetricSet, PlanSynthesizer, TestAttempt, TestType, Tier,
    TierClassifier, UserProfile,
};
use fitassess::store::AttemptStore;
use rust_decimal::Decimal;
use serde_json::json;

/// Performance benchmarks for the assessment core
///
/// Classification and extraction run once per submitted attempt; synthesis
/// and leaderboards scale with history size.

fn bench_tier_classification(c: &mut Criterion) {
    let classifier = TierClassifier::default();
    let mut group = c.benchmark_group("Tier Classification");

    for test_type in [TestType::PushUps, TestType::AgilityLadder, TestType::HeightWeight] {
        group.bench_with_input(
            BenchmarkId::new("classify", test_type.as_str()),
            &test_type,
            |b, &test_type| {
                b.iter(|| {
                    for value in 0..100 {
                        let _ = classifier.classify(test_type, black_box(Decimal::from(value)));
                    }
                });
            },
        );
    }

    group.finish();
}

fn bench_metric_extraction(c: &mut Criterion) {
    let mut group = c.benchmark_group("Metric Extraction");

    let payloads = vec![
        ("vertical_jump", TestType::VerticalJump, json!({"jumpHeight": 48.5})),
        ("shuttle_run_strings", TestType::ShuttleRun, json!({"laps": "14", "time": "92.4"})),
        ("height_weight_derived", TestType::HeightWeight, json!({"height": 172, "weight": 64.2})),
    ];

    for (name, test_type, payload) in payloads {
        group.bench_with_input(BenchmarkId::new("extract", name), &payload, |b, payload| {
            b.iter(|| MetricExtractor::extract_for(test_type, black_box(payload)));
        });
    }

    group.finish();
}

fn bench_plan_synthesis(c: &mut Criterion) {
    let synthesizer = PlanSynthesizer::default();
    let mut group = c.benchmark_group("Plan Synthesis");

    for &size in &[10, 100, 1000] {
        let attempts = create_attempt_history("bench_user", size);
        let sessions = create_session_history(size / 10 + 1);

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(
            BenchmarkId::new("synthesize", size),
            &(attempts, sessions),
            |b, (attempts, sessions)| {
                b.iter(|| synthesizer.synthesize(black_box(attempts), black_box(sessions), None));
            },
        );
    }

    group.finish();
}

fn bench_emg_aggregation(c: &mut Criterion) {
    let mut group = c.benchmark_group("EMG Aggregation");

    for &points in &[100, 1000, 10000] {
        let samples: Vec<EmgSample> = (0..points)
            .map(|i| EmgSample {
                emg: 400.0 + (i % 200) as f64,
                muscle_activity: ((i as f64) * 0.1).sin().abs() * 100.0,
                fatigue: (i % 100) as f64,
                activated: i % 3 != 0,
                timestamp: i as i64 * 10,
            })
            .collect();

        group.throughput(Throughput::Elements(points as u64));
        group.bench_with_input(BenchmarkId::new("from_samples", points), &samples, |b, samples| {
            b.iter(|| EmgSessionData::from_samples(black_box(samples), 600.0));
        });
    }

    group.finish();
}

fn bench_leaderboard(c: &mut Criterion) {
    let mut group = c.benchmark_group("Leaderboard");

    for &users in &[10, 100, 1000] {
        let profiles: Vec<UserProfile> = (0..users)
            .map(|i| UserProfile {
                id: format!("user_{}", i),
                name: Some(format!("Athlete {}", i)),
                state: Some(if i % 2 == 0 { "Kerala" } else { "Punjab" }.to_string()),
                ..Default::default()
            })
            .collect();
        let attempts: Vec<TestAttempt> = (0..users)
            .flat_map(|i| create_attempt_history(&format!("user_{}", i), 5))
            .collect();

        group.throughput(Throughput::Elements(attempts.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("build", users),
            &(profiles, attempts),
            |b, (profiles, attempts)| {
                b.iter(|| Leaderboard::build(&LeaderboardQuery::default(), black_box(profiles), black_box(attempts)));
            },
        );
    }

    group.finish();
}

fn bench_database_operations(c: &mut Criterion) {
    use tempfile::TempDir;

    let mut group = c.benchmark_group("Database Operations");

    for &batch_size in &[10, 100, 1000] {
        let attempts = create_attempt_history("bench_user", batch_size);

        group.throughput(Throughput::Elements(batch_size as u64));
        group.bench_with_input(
            BenchmarkId::new("insert_attempts", batch_size),
            &attempts,
            |b, attempts| {
                b.iter_batched(
                    || {
                        let temp_dir = TempDir::new().unwrap();
                        let store = SqliteStore::open(temp_dir.path().join("bench.db")).unwrap();
                        (store, temp_dir)
                    },
                    |(store, _temp_dir)| {
                        for attempt in attempts {
                            let _ = store.save_attempt(attempt);
                        }
                    },
                    criterion::BatchSize::SmallInput,
                );
            },
        );
    }

    for &count in &[100, 1000] {
        group.bench_with_input(BenchmarkId::new("list_recent", count), &count, |b, &count| {
            b.iter_batched(
                || {
                    let temp_dir = TempDir::new().unwrap();
                    let store = SqliteStore::open(temp_dir.path().join("bench.db")).unwrap();
                    for attempt in create_attempt_history("bench_user", count) {
                        let _ = store.save_attempt(&attempt);
                    }
                    (store, temp_dir)
                },
                |(store, _temp_dir)| {
                    let _ = black_box(store.list_recent_attempts("bench_user", 20));
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

// Helper functions for benchmarks

fn create_attempt_history(user_id: &str, size: usize) -> Vec<TestAttempt> {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();

    (0..size)
        .map(|i| {
            let test_type = TestType::ALL[i % TestType::ALL.len()];
            let variation = ((i as f64) * 0.37).sin();
            let form_score = Decimal::from(60 + (variation * 35.0) as i64);

            TestAttempt {
                id: format!("{}_attempt_{}", user_id, i),
                user_id: user_id.to_string(),
                test_type,
                metrics: MetricSet::new(),
                form_score,
                badge: Tier::RANKED[i % Tier::RANKED.len()],
                recommendations: Vec::new(),
                created_at: start + Duration::minutes(i as i64),
            }
        })
        .collect()
}

fn create_session_history(size: usize) -> Vec<EmgSession> {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();

    (0..size)
        .map(|i| EmgSession {
            user_id: "bench_user".to_string(),
            timestamp: start + Duration::hours(i as i64),
            session_data: EmgSessionData {
                avg_muscle_activity: 25.0 + (i % 50) as f64,
                avg_fatigue: 40.0 + (i % 50) as f64,
                ..Default::default()
            },
            emg_history: Vec::new(),
        })
        .collect()
}

// Define benchmark groups
criterion_group!(
    benches,
    bench_tier_classification,
    bench_metric_extraction,
    bench_plan_synthesis,
    bench_emg_aggregation,
    bench_leaderboard,
    bench_database_operations
);

criterion_main!(benches);
