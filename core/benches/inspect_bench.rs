use codspeed_criterion_compat::{Criterion, black_box, criterion_group, criterion_main};
use lexp::image::DEFAULT_CELLS;
use lexp::{HeapImage, InspectConfig, Lexp, Tag, classify, print, read, render, walk};
use std::time::Duration;

// ============================================================================
// Decoding Benchmarks
// ============================================================================

fn bench_classify(c: &mut Criterion) {
    let words: Vec<Lexp> = (0..1024u32)
        .map(|i| match i % 3 {
            0 => Lexp::boxed(Tag::Cons, i),
            1 => Lexp::from_f64(f64::from(i) * 0.5),
            _ => Lexp::from_bits(0x7ffe_0000_0000_0000 | u64::from(i)),
        })
        .collect();
    c.bench_function("classify 1024 mixed words", |b| {
        b.iter(|| {
            for w in &words {
                black_box(classify(*w));
            }
        })
    });
}

fn bench_render_atom(c: &mut Criterion) {
    let image = HeapImage::boot(DEFAULT_CELLS).unwrap();
    let snap = image.snapshot();
    let config = InspectConfig::default();
    let word = image.tru();
    c.bench_function("render atom", |b| {
        b.iter(|| black_box(render(word, &snap, &config).unwrap()))
    });
}

// ============================================================================
// Traversal Benchmarks
// ============================================================================

fn bench_walk_environment(c: &mut Criterion) {
    let image = HeapImage::boot(DEFAULT_CELLS).unwrap();
    let snap = image.snapshot();
    let config = InspectConfig::default();
    c.bench_function("walk boot environment", |b| {
        b.iter(|| black_box(walk(image.env(), 0, &snap, &config).unwrap()))
    });
}

fn bench_walk_long_list(c: &mut Criterion) {
    let mut image = HeapImage::new(8192);
    let items: Vec<Lexp> = (0..2000).map(|i| Lexp::from_f64(f64::from(i))).collect();
    let list = image.list(&items).unwrap();
    let snap = image.snapshot();
    let config = InspectConfig::default();
    c.bench_function("walk list (2000 elements)", |b| {
        b.iter(|| black_box(walk(list, 0, &snap, &config).unwrap()))
    });
}

fn bench_print_nested(c: &mut Criterion) {
    let mut image = HeapImage::new(4096);
    let mut src = String::from("x");
    for _ in 0..100 {
        src = format!("(f {src} 1)");
    }
    let word = read(&mut image, &src).unwrap();
    let snap = image.snapshot();
    let config = InspectConfig::default();
    c.bench_function("print deep nesting (100 levels)", |b| {
        b.iter(|| black_box(print(word, &snap, &config).unwrap()))
    });
}

criterion_group! {
    name = decode_benches;
    config = Criterion::default()
        .sample_size(100)
        .measurement_time(Duration::from_secs(5));
    targets =
        bench_classify,
        bench_render_atom
}

criterion_group! {
    name = traversal_benches;
    config = Criterion::default()
        .sample_size(100)
        .measurement_time(Duration::from_secs(5));
    targets =
        bench_walk_environment,
        bench_walk_long_list,
        bench_print_nested
}

criterion_main!(decode_benches, traversal_benches);
