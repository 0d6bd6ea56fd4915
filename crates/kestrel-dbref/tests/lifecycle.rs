//! Handle lifecycle against a database that erases targets underneath.

use std::collections::HashMap;

use kestrel_core::{HandleError, HandleKind, TargetAddr, TargetState};
use kestrel_dbref::{Deref, HandleRegistry};
use kestrel_test_utils::MockDatabase;
use proptest::prelude::*;

#[derive(Clone, Debug)]
enum Op {
    Make(bool, usize),
    Release(bool, usize),
    Erase(bool, usize),
}

fn kind(clause: bool) -> HandleKind {
    if clause {
        HandleKind::Clause
    } else {
        HandleKind::Record
    }
}

fn addr(i: usize) -> TargetAddr {
    TargetAddr(0x100 * (i + 1))
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (any::<bool>(), 0..4usize).prop_map(|(c, i)| Op::Make(c, i)),
        2 => (any::<bool>(), 0..4usize).prop_map(|(c, i)| Op::Release(c, i)),
        1 => (any::<bool>(), 0..4usize).prop_map(|(c, i)| Op::Erase(c, i)),
    ]
}

proptest! {
    #[test]
    fn refcounts_follow_model(ops in prop::collection::vec(op(), 0..200)) {
        let mut db = MockDatabase::new();
        for i in 0..4 {
            db.insert(HandleKind::Clause, addr(i));
            db.insert(HandleKind::Record, addr(i));
        }
        let mut reg = HandleRegistry::new();
        let mut tokens = HashMap::new();
        let mut refs: HashMap<(HandleKind, TargetAddr), usize> = HashMap::new();

        for op in ops {
            match op {
                Op::Make(c, i) => {
                    let key = (kind(c), addr(i));
                    let t = reg.make_handle(&mut db, key.0, key.1);
                    if let Some(prev) = tokens.get(&key) {
                        if refs.get(&key).copied().unwrap_or(0) > 0 {
                            prop_assert_eq!(*prev, t);
                        }
                    }
                    tokens.insert(key, t);
                    *refs.entry(key).or_default() += 1;
                }
                Op::Release(c, i) => {
                    let key = (kind(c), addr(i));
                    let Some(t) = tokens.get(&key).copied() else { continue };
                    let live = refs.get(&key).copied().unwrap_or(0);
                    let result = reg.release(&mut db, t);
                    if live == 0 {
                        let is_invalid = matches!(result, Err(HandleError::InvalidHandle { .. }));
                        prop_assert!(is_invalid);
                    } else {
                        prop_assert!(result.is_ok());
                        refs.insert(key, live - 1);
                    }
                }
                Op::Erase(c, i) => db.erase(kind(c), addr(i)),
            }

            for (key, t) in &tokens {
                let live = refs.get(key).copied().unwrap_or(0);
                prop_assert_eq!(reg.ref_count(*t), (live > 0).then_some(live));
                // Wrappers discarded after their storage went away are no
                // longer tracked by the database.
                if let Some(target) = db.target(key.0, key.1) {
                    prop_assert_eq!(target.referenced, live > 0);
                }
            }
        }
        let registered = refs.values().filter(|n| **n > 0).count();
        prop_assert_eq!(reg.len(), registered);
    }
}

#[test]
fn erased_clause_survives_until_last_handle() {
    let mut db = MockDatabase::new();
    let mut reg = HandleRegistry::new();
    let target = TargetAddr(0xbeef);
    db.insert(HandleKind::Clause, target);

    let a = reg.make_handle(&mut db, HandleKind::Clause, target);
    let b = reg.make_handle(&mut db, HandleKind::Clause, target);
    db.erase(HandleKind::Clause, target);
    assert_eq!(
        db.target(HandleKind::Clause, target).unwrap().state,
        TargetState::ErasedPending
    );

    reg.release(&mut db, a).unwrap();
    assert_eq!(reg.dereference(&db, b, HandleKind::Clause), Deref::Erased);
    assert!(db.reclaimed().is_empty());

    reg.release(&mut db, b).unwrap();
    assert_eq!(db.reclaimed(), &[(HandleKind::Clause, target)]);
    assert_eq!(reg.dereference(&db, b, HandleKind::Clause), Deref::Invalid);
    assert!(reg.is_empty());
}

#[test]
fn unerased_target_is_never_reclaimed_by_release() {
    let mut db = MockDatabase::new();
    let mut reg = HandleRegistry::new();
    let target = TargetAddr(0x40);
    db.insert(HandleKind::Record, target);

    let t = reg.make_handle(&mut db, HandleKind::Record, target);
    reg.release(&mut db, t).unwrap();
    assert!(db.reclaimed().is_empty());
    assert_eq!(
        db.target(HandleKind::Record, target).unwrap().state,
        TargetState::Live
    );

    db.erase(HandleKind::Record, target);
    assert_eq!(db.reclaimed(), &[(HandleKind::Record, target)]);
}
