//! The liveness scanner running against a busy context.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{bounded, TryRecvError};
use kestrel_bag::{BagConfig, FindallContext, Reentry, Suspension};
use kestrel_core::BagId;
use kestrel_test_utils::{atoms_of, CodecCompiler, MockStack, RecordingMarker, Term};

fn context() -> FindallContext<CodecCompiler> {
    FindallContext::new(CodecCompiler, BagConfig::default()).unwrap()
}

#[test]
fn scan_walks_through_suspended_frames() {
    let mut ctx = context();
    let mut stack = MockStack::unbounded();
    let marker = RecordingMarker::new();

    let a = ctx.new_bag().unwrap();
    ctx.add_solution(&Term::atom("a1"), &mut stack).unwrap();
    ctx.add_solution(&Term::atom("a2"), &mut stack).unwrap();
    let b = ctx.new_bag().unwrap();
    ctx.add_solution(&Term::atom("b1"), &mut stack).unwrap();
    ctx.collect(Term::Nil, &mut stack, &marker).unwrap();
    let Suspension::Yield(_) = ctx.suspend(Reentry::FirstCall).unwrap() else {
        panic!("first call must yield");
    };
    let c = ctx.new_bag().unwrap();
    ctx.add_solution(&Term::atom("c1"), &mut stack).unwrap();

    let handle = ctx.scan_handle();
    assert_eq!(handle.depth(), 3);
    let mut seen: Vec<(BagId, Vec<String>)> = Vec::new();
    handle.scan(|bag, bytes| seen.push((bag, atoms_of(bytes).unwrap())));
    assert_eq!(
        seen,
        vec![
            (c, vec!["c1".to_string()]),
            (a, vec!["a1".to_string()]),
            (a, vec!["a2".to_string()]),
        ]
    );
    assert!(seen.iter().all(|(bag, _)| *bag != b));

    handle.mark_atoms(&marker);
    let mut marked = marker.marked_atoms();
    marked.sort();
    assert_eq!(marked, vec!["a1", "a2", "c1"]);
}

#[test]
fn handle_outlives_context() {
    let handle = {
        let mut ctx = context();
        ctx.new_bag().unwrap();
        ctx.scan_handle()
    };
    assert_eq!(handle.depth(), 0);
    handle.scan(|_, _| panic!("no snapshots expected"));
}

enum Cmd {
    Scan,
    Stop,
}

#[test]
fn concurrent_scan_sees_only_intact_snapshots() {
    let mut ctx = context();
    let mut stack = MockStack::unbounded();
    let marker = RecordingMarker::new();
    let handle = ctx.scan_handle();
    let corrupt = Arc::new(AtomicUsize::new(0));

    let (cmd_tx, cmd_rx) = bounded::<Cmd>(0);
    let (ack_tx, ack_rx) = bounded::<usize>(0);
    let scanner = {
        let corrupt = Arc::clone(&corrupt);
        thread::spawn(move || {
            let check = |_: BagId, bytes: &[u8]| {
                if atoms_of(bytes).is_err() {
                    corrupt.fetch_add(1, Ordering::Relaxed);
                }
            };
            loop {
                match cmd_rx.try_recv() {
                    Ok(Cmd::Scan) => {
                        let mut visited = 0;
                        handle.scan(|bag, bytes| {
                            visited += 1;
                            check(bag, bytes);
                        });
                        ack_tx.send(visited).unwrap();
                    }
                    Ok(Cmd::Stop) | Err(TryRecvError::Disconnected) => break,
                    Err(TryRecvError::Empty) => handle.scan(check),
                }
            }
        })
    };

    for round in 0..50i64 {
        let outer = ctx.new_bag().unwrap();
        for i in 0..20 {
            let term = Term::compound("s", vec![Term::Int(round), Term::atom(&format!("k{i}"))]);
            ctx.add_solution(&term, &mut stack).unwrap();
        }
        let inner = ctx.new_bag().unwrap();
        ctx.add_solution(&Term::atom("inner"), &mut stack).unwrap();

        cmd_tx.send(Cmd::Scan).unwrap();
        assert_eq!(ack_rx.recv().unwrap(), 21);

        ctx.collect(Term::Nil, &mut stack, &marker).unwrap();
        ctx.destroy(inner).unwrap();
        let list = ctx.collect(Term::Nil, &mut stack, &marker).unwrap();
        assert_eq!(list.to_vec().len(), 20);
        if round % 2 == 0 {
            let Suspension::Yield(token) = ctx.suspend(Reentry::FirstCall).unwrap() else {
                panic!("first call must yield");
            };
            assert_eq!(ctx.suspend(Reentry::Cut(token)).unwrap(), Suspension::Succeed);
        }
        ctx.destroy(outer).unwrap();
    }

    cmd_tx.send(Cmd::Stop).unwrap();
    scanner.join().unwrap();
    assert_eq!(corrupt.load(Ordering::Relaxed), 0);
}
