use divan::AllocProfiler;

#[global_allocator]
static ALLOC: AllocProfiler = AllocProfiler::system();

fn main() {
    divan::main();
}

fn get_input() -> Vec<u8> {
    std::fs::read(format!(
        "{}/resources/cue_sheet.utf",
        env!("CARGO_MANIFEST_DIR")
    ))
    .unwrap()
}

pub mod read {
    use divan::Bencher;

    #[divan::bench]
    fn decode(bencher: Bencher) {
        bencher.with_inputs(super::get_input).bench_refs(|data| {
            divan::black_box(cri_utf::decode(data, 0).unwrap());
        });
    }

    #[divan::bench]
    fn decode_nested(bencher: Bencher) {
        bencher
            .with_inputs(|| cri_utf::decode(&super::get_input(), 0).unwrap())
            .bench_refs(|table| {
                for row in 0..table.row_count() {
                    if let Some(nested) = table.get(row, "CueTable").and_then(|v| v.nested_table()) {
                        divan::black_box(nested.unwrap());
                    }
                }
            });
    }
}

pub mod write {
    use divan::Bencher;
    use cri_utf::UtfWriterOptions;

    #[divan::bench]
    fn encode(bencher: Bencher) {
        bencher
            .with_inputs(|| cri_utf::decode(&super::get_input(), 0).unwrap())
            .bench_refs(|table| {
                divan::black_box(cri_utf::encode(table).unwrap());
            });
    }

    #[divan::bench]
    fn encode_aligned(bencher: Bencher) {
        let options = UtfWriterOptions::builder().data_alignment(0x20).build();
        bencher
            .with_inputs(|| cri_utf::decode(&super::get_input(), 0).unwrap())
            .bench_refs(|table| {
                divan::black_box(cri_utf::encode_with(table, options).unwrap());
            });
    }
}
