use std::fmt::Write as _;

use criterion::{Criterion, criterion_group, criterion_main};
use tabular_intake::{
    ImportPipeline,
    schema::{ColumnDefinition, ColumnRole, ColumnType},
};

fn generate_upload(rows: usize) -> Vec<u8> {
    let mut csv = String::from("Stock export,,,,\n,,,,\nItem Name,Qty,Unit Price,Received,Category\n");
    for i in 0..rows {
        let qty = match i % 4 {
            0 => format!("{i}"),
            1 => format!(" {i} "),
            2 => format!("about {i}"),
            _ => String::new(),
        };
        let price = match i % 3 {
            0 => format!("${}.{:02}", i % 500, i % 100),
            1 => format!("\"{},{:02} EUR\"", i % 500, i % 100),
            _ => format!("({}.50)", i % 90),
        };
        let day = (i % 28) + 1;
        let received = if i % 5 == 0 {
            format!("{day} March 2024")
        } else {
            format!("01/{day:02}/2024")
        };
        let category = if i % 2 == 0 { "Hardware" } else { "Tools" };
        let _ = writeln!(csv, "Item {i},{qty},{price},{received},{category}");
    }
    csv.into_bytes()
}

fn schema() -> Vec<ColumnDefinition> {
    vec![
        ColumnDefinition::new("c1", "Name", ColumnType::Text)
            .with_role(ColumnRole::Name)
            .required(),
        ColumnDefinition::new("c2", "Quantity", ColumnType::Number).with_role(ColumnRole::Quantity),
        ColumnDefinition::new("c3", "Price", ColumnType::Currency).with_role(ColumnRole::Price),
        ColumnDefinition::new("c4", "Date Received", ColumnType::Date),
        ColumnDefinition::new("c5", "Category", ColumnType::Select).with_options(["Hardware", "Tools"]),
    ]
}

fn bench_import(c: &mut Criterion) {
    let upload = generate_upload(20_000);
    let columns = schema();
    let pipeline = ImportPipeline::default();

    let mut group = c.benchmark_group("import");

    group.bench_function("parse_csv", |b| {
        b.iter(|| pipeline.parse_file("stock.csv", &upload).expect("parse upload"));
    });

    let parsed = pipeline.parse_file("stock.csv", &upload).expect("parse upload");
    let headers = parsed.headers(parsed.suggested_header_row);
    let mappings = pipeline.auto_match(&headers, &columns);

    let rows = parsed.data_rows(parsed.suggested_header_row);
    group.bench_function("sanitize_rows", |b| {
        b.iter(|| {
            pipeline
                .sanitize(rows, &mappings, &columns)
                .expect("mappings are valid")
        });
    });

    group.finish();
}

criterion_group!(benches, bench_import);
criterion_main!(benches);
