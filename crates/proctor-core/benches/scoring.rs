use criterion::{Criterion, black_box, criterion_group, criterion_main};
use proctor_core::{PENALTY_TABLE, score_labels};

fn bench_score(c: &mut Criterion) {
    let labels: Vec<String> = (0..10_000)
        .map(|i| {
            let (marker, _) = PENALTY_TABLE[i % PENALTY_TABLE.len()];
            if i % 3 == 0 {
                format!("{marker} (5s)")
            } else if i % 7 == 0 {
                "TAB_SWITCH".to_string()
            } else {
                marker.to_string()
            }
        })
        .collect();

    c.bench_function("score_10k_events", |b| {
        b.iter(|| score_labels(black_box(&labels).iter().map(String::as_str)))
    });
}

criterion_group!(benches, bench_score);
criterion_main!(benches);
