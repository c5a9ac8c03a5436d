// Criterion benchmarks for g2p-fst.
//
// Run:
//   cargo bench -p g2p-fst

use criterion::{Criterion, criterion_group, criterion_main};
use g2p_core::{DecoderOptions, Word};
use g2p_fst::{ArpaModel, LmCompiler};

const MODEL: &str = "\
\\data\\
ngram 1=8
ngram 2=6

\\1-grams:
-99 <s> 0
-1.0 </s>
-0.6 C}K -0.2
-0.7 A}AE -0.3
-0.8 T}T -0.2
-0.9 A}EY -0.1
-1.1 P|H}F -0.2
-1.2 H}<eps> -0.1

\\2-grams:
-0.2 <s> C}K
-0.3 C}K A}AE
-0.3 A}AE T}T
-0.2 T}T </s>
-0.4 <s> P|H}F
-0.5 P|H}F A}EY

\\end\\
";

fn bench_compile(c: &mut Criterion) {
    let model = ArpaModel::parse(MODEL).expect("model");
    let compiler = LmCompiler::new(DecoderOptions::default());
    c.bench_function("compile", |b| {
        b.iter(|| std::hint::black_box(compiler.compile(&model).expect("compile")))
    });
}

fn bench_translate(c: &mut Criterion) {
    let model = ArpaModel::parse(MODEL).expect("model");
    let transducer = LmCompiler::new(DecoderOptions::default())
        .compile(&model)
        .expect("compile");
    let words: Vec<Word> = ["CAT", "PHAT", "TACT", "HAT"]
        .iter()
        .map(|w| Word::from_chars(w).expect("word"))
        .collect();

    c.bench_function("translate_top1", |b| {
        b.iter(|| {
            for w in &words {
                std::hint::black_box(transducer.translate(w, 1).expect("translate"));
            }
        })
    });

    c.bench_function("translate_top5", |b| {
        b.iter(|| {
            for w in &words {
                std::hint::black_box(transducer.translate(w, 5).expect("translate"));
            }
        })
    });
}

criterion_group!(benches, bench_compile, bench_translate);
criterion_main!(benches);
