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

//! Property-based tests for line reassembly

use linewise_server::LineBuffer;
use proptest::prelude::*;

fn feed(buffer: &mut LineBuffer, input: &[u8]) -> Vec<(Vec<u8>, usize)> {
    let mut lines = Vec::new();
    for &byte in input {
        if let Some(line) = buffer.push(byte) {
            lines.push((line.bytes.to_vec(), line.overflow));
        }
    }
    lines
}

proptest! {
    #[test]
    fn prop_arbitrary_input_never_panics(
        capacity in 0usize..64,
        input in prop::collection::vec(any::<u8>(), 0..512)
    ) {
        let mut buffer = LineBuffer::new(capacity);
        for line in feed(&mut buffer, &input) {
            prop_assert!(line.0.len() < buffer.capacity());
        }
        prop_assert!(buffer.len() <= buffer.capacity());
    }

    #[test]
    fn prop_short_lines_round_trip(
        lines in prop::collection::vec("[a-zA-Z0-9 ,.!?]{0,40}", 0..16)
    ) {
        let mut buffer = LineBuffer::new(64);
        let mut input = Vec::new();
        for line in &lines {
            input.extend_from_slice(line.as_bytes());
            input.extend_from_slice(b"\r\n");
        }
        let received = feed(&mut buffer, &input);
        let expected: Vec<(Vec<u8>, usize)> =
            lines.iter().map(|line| (line.as_bytes().to_vec(), 0)).collect();
        prop_assert_eq!(received, expected);
        prop_assert!(buffer.is_empty());
    }

    #[test]
    fn prop_unterminated_input_splits_at_capacity(
        capacity in 2usize..32,
        input in prop::collection::vec(any::<u8>().prop_filter("no CR", |b| *b != b'\r'), 0..256)
    ) {
        let mut buffer = LineBuffer::new(capacity);
        let lines = feed(&mut buffer, &input);

        // Each overflow consumes a full buffer plus the byte that did not fit.
        prop_assert_eq!(lines.len(), input.len() / (capacity + 1));
        prop_assert_eq!(buffer.len(), input.len() % (capacity + 1));
        for (index, (bytes, overflow)) in lines.iter().enumerate() {
            let start = index * (capacity + 1);
            prop_assert_eq!(*overflow, 2);
            prop_assert_eq!(bytes.as_slice(), &input[start..start + capacity - 1]);
        }
    }
}
