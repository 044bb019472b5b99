//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Benchmarks for per-message compression cost

use bytes::BytesMut;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use linewise_compress::{Algorithm, Compressor};
use std::hint::black_box;

// ============================================================================
// Chat-sized Messages
// ============================================================================

fn bench_chat_messages(c: &mut Criterion) {
    let mut group = c.benchmark_group("chat_messages");
    let message = b"alice: \"the quick brown fox jumps over the lazy dog\"\r\n";
    group.throughput(Throughput::Bytes(message.len() as u64));

    for algorithm in [Algorithm::None, Algorithm::Deflate, Algorithm::Zlib] {
        group.bench_with_input(
            BenchmarkId::from_parameter(algorithm),
            &algorithm,
            |b, &algorithm| {
                let mut compressor = Compressor::new(algorithm);
                let mut out = BytesMut::with_capacity(1024);
                b.iter(|| {
                    out.clear();
                    compressor.compress(black_box(message), &mut out).unwrap();
                });
            },
        );
    }

    group.finish();
}

// ============================================================================
// Bulk Output
// ============================================================================

fn bench_bulk_output(c: &mut Criterion) {
    let mut group = c.benchmark_group("bulk_output");

    for size in [1024usize, 16 * 1024, 64 * 1024] {
        let input: Vec<u8> = (0..size).map(|i| b"abcdefgh ijklmnop\r\n"[i % 19]).collect();
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &input, |b, input| {
            let mut compressor = Compressor::new(Algorithm::Zlib);
            let mut out = BytesMut::with_capacity(size);
            b.iter(|| {
                out.clear();
                compressor.compress(black_box(input), &mut out).unwrap();
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_chat_messages, bench_bulk_output);
criterion_main!(benches);
