//! Benchmarks for statement validation.
//!
//! Validation sits on the request path of every data-backed turn, so a
//! single check should stay well under a millisecond.

use std::sync::Arc;
use std::time::Duration;

use criterion::{criterion_group, criterion_main, Criterion};
use querygate_access::{AccessValidator, PolicyStore};

fn statements() -> Vec<&'static str> {
    vec![
        "SELECT id, name, email FROM users",
        "SELECT id, amount, date FROM orders ORDER BY date DESC LIMIT 20",
        "SELECT u.name, o.amount FROM users u JOIN orders o ON u.id = o.id WHERE o.amount > 100",
        "SELECT strftime('%Y-%m', date) AS month, SUM(amount) AS total FROM orders GROUP BY strftime('%Y-%m', date) ORDER BY month",
        "SELECT * FROM users",
        "SELECT id FROM users UNION SELECT id FROM orders",
        "SELECT month, amount FROM sales",
    ]
}

fn bench_validate(c: &mut Criterion) {
    let validator = AccessValidator::new(Arc::new(PolicyStore::builtin()));
    let stmts = statements();

    let mut group = c.benchmark_group("access_validation");
    group.sample_size(200);
    group.measurement_time(Duration::from_secs(5));

    for role in ["viewer", "analyst", "admin"] {
        group.bench_function(format!("{}_mixed_statements", role), |b| {
            let mut idx = 0usize;
            b.iter(|| {
                let decision = validator.validate(role, stmts[idx % stmts.len()]);
                idx += 1;
                decision
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_validate);
criterion_main!(benches);
