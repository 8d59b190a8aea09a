use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use tablekit::{
    ColumnInfo, FilterMap, InsertStatement, RowMap, SchemaCache, SelectStatement, TableInfo,
    UpdateStatement,
};

/// One table `t` with columns `col0..col{n}` (all bigint) plus `other` joined on `t_id`.
fn schema(n: usize) -> SchemaCache {
    let columns = (0..n)
        .map(|i| ColumnInfo::new(format!("col{i}"), "bigint"))
        .chain(std::iter::once(ColumnInfo::new("id", "bigint").primary_key()))
        .collect();
    SchemaCache::from_tables(
        vec!["public".to_string()],
        vec![
            TableInfo::new("public", "t", columns),
            TableInfo::new(
                "public",
                "other",
                vec![
                    ColumnInfo::new("t_id", "bigint"),
                    ColumnInfo::new("label", "text"),
                ],
            ),
        ],
    )
}

fn row(n: usize) -> RowMap {
    (0..n).map(|i| (format!("col{i}"), i as i64)).collect()
}

fn filters(n: usize) -> FilterMap {
    (0..n).fold(FilterMap::new(), |f, i| f.eq(format!("col{i}"), i as i64))
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("statement_builder/insert");

    for n in [1, 5, 10, 50] {
        let schema = schema(n);
        let stmt = InsertStatement::new("t", row(n));
        group.bench_with_input(BenchmarkId::from_parameter(n), &stmt, |b, stmt| {
            b.iter(|| black_box(stmt.build(&schema)));
        });
    }

    group.finish();
}

fn bench_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("statement_builder/update");

    for n in [1, 5, 10, 50] {
        let schema = schema(n);
        let stmt = UpdateStatement::new("t", row(n)).filters(filters(n));
        group.bench_with_input(BenchmarkId::from_parameter(n), &stmt, |b, stmt| {
            b.iter(|| black_box(stmt.build(&schema)));
        });
    }

    group.finish();
}

fn bench_select_join(c: &mut Criterion) {
    let mut group = c.benchmark_group("statement_builder/select_join");

    for n in [1, 5, 10, 50] {
        let schema = schema(n);
        let stmt = SelectStatement::new("t")
            .columns((0..n).map(|i| format!("t.col{i}")))
            .column("other.label")
            .join("other", "t.id", "other.t_id")
            .filters(filters(n))
            .limit(100);
        group.bench_with_input(BenchmarkId::from_parameter(n), &stmt, |b, stmt| {
            b.iter(|| black_box(stmt.build(&schema)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_insert, bench_update, bench_select_join);
criterion_main!(benches);
