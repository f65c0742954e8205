//! Codec benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use midi_osc_bridge::codec::{decode_message, OscEncoder};
use midi_osc_bridge::translator::build_message;
use midi_osc_bridge::{MidiEvent, TagList};

fn note_on_message() -> midi_osc_bridge::OscMessage {
    let tags = TagList::from_lines("piano\nlead\nstrings");
    build_message(&MidiEvent::note_on(60, 100).at(1234.5), &tags).expect("tags are set")
}

fn encode_benchmark(c: &mut Criterion) {
    let msg = note_on_message();
    let mut encoder = OscEncoder::new();

    c.bench_function("encode_note_on", |b| {
        b.iter(|| black_box(encoder.encode(black_box(&msg))))
    });
}

fn decode_benchmark(c: &mut Criterion) {
    let encoded = OscEncoder::new().encode(&note_on_message());

    c.bench_function("decode_note_on", |b| {
        b.iter(|| black_box(decode_message(black_box(&encoded)).unwrap()))
    });
}

criterion_group!(benches, encode_benchmark, decode_benchmark);
criterion_main!(benches);
