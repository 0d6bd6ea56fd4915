//! `findall` and `FindNSols` built on the bag primitives.

use std::num::NonZeroUsize;

use kestrel_bag::{findall, BagConfig, BagState, FindNSols, FindallContext};
use kestrel_core::BagError;
use kestrel_test_utils::{CodecCompiler, MockStack, RecordingMarker, Term};

fn context() -> FindallContext<CodecCompiler> {
    FindallContext::new(CodecCompiler, BagConfig::default()).unwrap()
}

fn ints(range: std::ops::RangeInclusive<i64>) -> Vec<Term> {
    range.map(Term::Int).collect()
}

fn chunk(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).unwrap()
}

#[test]
fn findall_collects_everything() {
    let mut ctx = context();
    let mut stack = MockStack::unbounded();
    let marker = RecordingMarker::new();
    let list = findall(&mut ctx, ints(1..=5), Term::Nil, &mut stack, &marker).unwrap();
    assert_eq!(list.to_vec(), ints(1..=5));
    assert_eq!(ctx.depth(), 0);
}

#[test]
fn findall_without_solutions_is_tail() {
    let mut ctx = context();
    let mut stack = MockStack::unbounded();
    let marker = RecordingMarker::new();
    let list = findall(&mut ctx, Vec::new(), Term::atom("t"), &mut stack, &marker).unwrap();
    assert_eq!(list, Term::atom("t"));
}

#[test]
fn findall_destroys_bag_on_error() {
    let mut ctx = context();
    let mut stack = MockStack::new(8);
    let marker = RecordingMarker::new();
    let err = findall(&mut ctx, ints(1..=10), Term::Nil, &mut stack, &marker).unwrap_err();
    assert!(matches!(err, BagError::StackOverflow(_)));
    assert_eq!(ctx.depth(), 0);
}

#[test]
fn nested_findall_inside_outer_bag() {
    let mut ctx = context();
    let mut stack = MockStack::unbounded();
    let marker = RecordingMarker::new();
    let outer = ctx.new_bag().unwrap();
    ctx.add_solution(&Term::atom("before"), &mut stack).unwrap();
    let inner = findall(&mut ctx, ints(1..=2), Term::Nil, &mut stack, &marker).unwrap();
    ctx.add_solution(&inner, &mut stack).unwrap();
    let list = ctx.collect(Term::Nil, &mut stack, &marker).unwrap();
    ctx.destroy(outer).unwrap();
    assert_eq!(
        list.to_vec(),
        vec![Term::atom("before"), Term::list(ints(1..=2))]
    );
}

#[test]
fn chunks_end_with_partial_remainder() {
    let mut ctx = context();
    let mut stack = MockStack::unbounded();
    let marker = RecordingMarker::new();
    let chunks: Vec<Vec<Term>> =
        FindNSols::new(&mut ctx, chunk(2), ints(1..=5), Term::Nil, &mut stack, &marker)
            .unwrap()
            .map(|list| list.unwrap().to_vec())
            .collect();
    assert_eq!(chunks, vec![ints(1..=2), ints(3..=4), ints(5..=5)]);
    assert_eq!(ctx.depth(), 0);
}

#[test]
fn exact_multiple_ends_with_empty_chunk() {
    let mut ctx = context();
    let mut stack = MockStack::unbounded();
    let marker = RecordingMarker::new();
    let chunks: Vec<Vec<Term>> =
        FindNSols::new(&mut ctx, chunk(2), ints(1..=4), Term::Nil, &mut stack, &marker)
            .unwrap()
            .map(|list| list.unwrap().to_vec())
            .collect();
    assert_eq!(chunks, vec![ints(1..=2), ints(3..=4), Vec::new()]);
}

#[test]
fn running_count_spans_chunks() {
    let mut ctx = context();
    let mut stack = MockStack::unbounded();
    let marker = RecordingMarker::new();
    let mut sols =
        FindNSols::new(&mut ctx, chunk(3), ints(1..=7), Term::Nil, &mut stack, &marker).unwrap();
    sols.next().unwrap().unwrap();
    sols.next().unwrap().unwrap();
    // Between chunks the bag sits suspended with the delivered count.
    let info = sols.info().unwrap();
    assert_eq!(info.id, sols.bag());
    assert_eq!(info.state, BagState::Suspended);
    assert_eq!(info.suspended_solutions, 6);
    assert_eq!(info.solutions, 0);
    assert_eq!(sols.next().unwrap().unwrap().to_vec(), ints(7..=7));
    assert!(sols.next().is_none());
}

#[test]
fn early_drop_commits_and_destroys() {
    let mut ctx = context();
    let mut stack = MockStack::unbounded();
    let marker = RecordingMarker::new();
    {
        let mut sols =
            FindNSols::new(&mut ctx, chunk(2), ints(1..=10), Term::Nil, &mut stack, &marker)
                .unwrap();
        assert_eq!(sols.next().unwrap().unwrap().to_vec(), ints(1..=2));
    }
    assert_eq!(ctx.depth(), 0);
    assert_eq!(ctx.current_bag(), None);
}

#[test]
fn error_ends_iteration() {
    let mut ctx = context();
    let mut stack = MockStack::new(20);
    let marker = RecordingMarker::new();
    let mut sols =
        FindNSols::new(&mut ctx, chunk(2), ints(1..=10), Term::Nil, &mut stack, &marker).unwrap();
    let mut errors = 0;
    for result in sols.by_ref() {
        if let Err(e) = result {
            assert!(matches!(e, BagError::StackOverflow(_)));
            errors += 1;
        }
    }
    assert_eq!(errors, 1);
    assert!(sols.next().is_none());
    drop(sols);
    assert_eq!(ctx.depth(), 0);
}
