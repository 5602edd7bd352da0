//! Property tests for the flow engine (spec §8): splitting a response at
//! arbitrary byte boundaries must not change the parsed outcome, and a
//! rejected buffer must not poison a pipeline that recovers afterwards.

use eci_core::consumer::{FutureConsumer, Sink};
use eci_core::flow::{Flow, FlowResult};
use eci_core::transformers::wait_line;
use proptest::prelude::*;

fn resolve_all_at_once(line: &str) -> Option<String> {
    let (consumer, mut rx) = FutureConsumer::new(wait_line("\n"));
    consumer.feed(line);
    rx.try_recv().ok().and_then(|r| r.ok())
}

fn resolve_in_chunks(line: &str, chunk_sizes: &[usize]) -> Option<String> {
    let (consumer, mut rx) = FutureConsumer::new(wait_line("\n"));
    let mut remaining = line;
    for &size in chunk_sizes {
        if remaining.is_empty() {
            break;
        }
        let at = size.min(remaining.len());
        let (chunk, rest) = remaining.split_at(at);
        consumer.feed(chunk);
        remaining = rest;
    }
    if !remaining.is_empty() {
        consumer.feed(remaining);
    }
    rx.try_recv().ok().and_then(|r| r.ok())
}

proptest! {
    #[test]
    fn byte_splitting_does_not_change_the_parsed_line(
        body in "[A-Za-z0-9 ]{1,24}",
        chunk_sizes in proptest::collection::vec(1usize..4, 0..12),
    ) {
        let line = format!("{body}\n");
        let whole = resolve_all_at_once(&line);
        let chunked = resolve_in_chunks(&line, &chunk_sizes);
        prop_assert_eq!(whole, chunked);
    }
}

#[test]
fn reject_clears_the_buffer_so_a_later_valid_sequence_still_resolves() {
    // Rejects anything containing 'X'; otherwise waits for a newline.
    let transformer: Flow<String> = Flow::new(|buf: &str| {
        if buf.contains('X') {
            FlowResult::Reject
        } else if let Some(line) = buf.strip_suffix('\n') {
            FlowResult::Go(line.to_string())
        } else {
            FlowResult::Wait
        }
    });

    let (consumer, rx) = FutureConsumer::new(transformer);
    consumer.feed("garbX"); // rejected, buffer resets to ""
    consumer.feed("ok\n"); // fresh start, resolves normally
    let value = rx.try_recv().unwrap().unwrap();
    assert_eq!(value, "ok");
}
