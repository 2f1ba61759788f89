use criterion::{Criterion, criterion_group, criterion_main};
use records_rag::document::{Document, build_document};
use records_rag::query::{ContextSchema, format_context};
use records_rag::source::ScalarValue;
use records_rag::store::ScoredDocument;
use std::hint::black_box;

fn movie_columns() -> Vec<String> {
    [
        "Series_Title",
        "Released_Year",
        "Genre",
        "IMDB_Rating",
        "Director",
        "Star1",
        "Star2",
        "Overview",
    ]
    .iter()
    .map(|column| (*column).to_string())
    .collect()
}

fn movie_row(index: usize) -> Vec<ScalarValue> {
    vec![
        ScalarValue::Text(format!("Movie {index}")),
        ScalarValue::Integer(1950 + (index % 70) as i64),
        ScalarValue::from("Crime, Drama"),
        ScalarValue::Real(8.1),
        ScalarValue::from("Some Director"),
        ScalarValue::from("Lead Actor"),
        ScalarValue::Null,
        ScalarValue::from("A long overview describing the plot of the movie in a sentence or two."),
    ]
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let columns = movie_columns();
    let rows: Vec<Vec<ScalarValue>> = (0..1000).map(movie_row).collect();

    c.bench_function("build_documents", |b| {
        b.iter(|| {
            rows.iter()
                .enumerate()
                .map(|(index, row)| build_document("doc_", index, black_box(&columns), row))
                .collect::<Vec<Document>>()
        })
    });

    let results: Vec<ScoredDocument> = rows
        .iter()
        .take(5)
        .enumerate()
        .map(|(index, row)| ScoredDocument {
            document: build_document("doc_", index, &columns, row),
            distance: index as f32,
        })
        .collect();
    let schema = ContextSchema::default();
    c.bench_function("format_context", |b| {
        b.iter(|| format_context(black_box(&schema), black_box(&results)))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
