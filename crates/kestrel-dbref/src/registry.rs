//! The interning table of external references.

use std::fmt;

use indexmap::IndexMap;
use kestrel_core::{Database, HandleError, HandleKind, TargetAddr, TargetState};
use tracing::{debug, trace, warn};

use crate::kind::{hooks, SavedRef};

/// Opaque token for a clause or record.
///
/// Only meaningful together with the [`HandleRegistry`] that issued it.
/// A token outlives its registration: once fully released it is reported
/// as invalid, even if a new handle is later made for the same target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DbRef {
    kind: HandleKind,
    target: TargetAddr,
    serial: u64,
}

impl DbRef {
    /// Kind of the wrapped target.
    pub fn kind(&self) -> HandleKind {
        self.kind
    }

    /// The wrapped target.
    pub fn target(&self) -> TargetAddr {
        self.target
    }
}

impl fmt::Display for DbRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        hooks(self.kind).write(f, self.target)
    }
}

/// Result of [`HandleRegistry::dereference`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Deref {
    /// The target is live.
    Valid(TargetAddr),
    /// The target has been erased. It must not be used.
    Erased,
    /// Not a registered handle of the expected kind.
    Invalid,
}

#[derive(Debug)]
struct Entry {
    serial: u64,
    refs: usize,
}

/// Interning table mapping targets to their unique tokens.
///
/// One registry serves one database. Every operation that can change a
/// target's lifecycle takes the database explicitly.
#[derive(Debug, Default)]
pub struct HandleRegistry {
    entries: IndexMap<(HandleKind, TargetAddr), Entry>,
    next_serial: u64,
}

impl HandleRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn fresh_serial(&mut self) -> u64 {
        self.next_serial += 1;
        self.next_serial
    }

    fn entry(&self, token: DbRef) -> Option<&Entry> {
        self.entries
            .get(&(token.kind, token.target))
            .filter(|entry| entry.serial == token.serial)
    }

    /// Look up or create the token for `target`.
    ///
    /// Creating a token marks the target as externally referenced; asking
    /// again for the same target returns the same token and adds a
    /// reference.
    pub fn make_handle<D>(&mut self, db: &mut D, kind: HandleKind, target: TargetAddr) -> DbRef
    where
        D: Database + ?Sized,
    {
        if let Some(entry) = self.entries.get_mut(&(kind, target)) {
            entry.refs += 1;
            trace!(%kind, %target, refs = entry.refs, "acquire handle");
            return DbRef {
                kind,
                target,
                serial: entry.serial,
            };
        }

        let serial = self.fresh_serial();
        self.entries.insert((kind, target), Entry { serial, refs: 1 });
        db.set_external_ref(kind, target, true);
        trace!(%kind, %target, "register handle");
        DbRef {
            kind,
            target,
            serial,
        }
    }

    /// Drop one reference.
    ///
    /// Releasing the last reference unregisters the token and clears the
    /// target's external-reference mark. An erased target is then
    /// deallocated; a target whose storage is already gone has its
    /// wrapper freed.
    pub fn release<D>(&mut self, db: &mut D, token: DbRef) -> Result<(), HandleError>
    where
        D: Database,
    {
        let key = (token.kind, token.target);
        let entry = match self.entries.get_mut(&key) {
            Some(entry) if entry.serial == token.serial => entry,
            _ => return Err(Self::invalid(token)),
        };
        entry.refs -= 1;
        if entry.refs > 0 {
            trace!(handle = %token, refs = entry.refs, "release handle");
            return Ok(());
        }

        self.entries.shift_remove(&key);
        db.set_external_ref(token.kind, token.target, false);
        let hooks = hooks(token.kind);
        match db.target_state(token.kind, token.target) {
            TargetState::Live => trace!(handle = %token, "unregister handle"),
            TargetState::ErasedPending => {
                hooks.release_erased(db, token.target);
                debug!(handle = %token, "reclaimed erased target");
            }
            TargetState::Gone => {
                hooks.release_gone(db, token.target);
                debug!(handle = %token, "freed dangling wrapper");
            }
        }
        Ok(())
    }

    /// Resolve a token the caller expects to be of kind `expected`.
    pub fn dereference<D>(&self, db: &D, token: DbRef, expected: HandleKind) -> Deref
    where
        D: Database + ?Sized,
    {
        if token.kind != expected || self.entry(token).is_none() {
            return Deref::Invalid;
        }
        match db.target_state(token.kind, token.target) {
            TargetState::Live => Deref::Valid(token.target),
            TargetState::ErasedPending | TargetState::Gone => Deref::Erased,
        }
    }

    /// Resolve a token to a live target, as an error-returning call.
    ///
    /// `Ok(None)` means the target has been erased.
    pub fn resolve<D>(
        &self,
        db: &D,
        token: DbRef,
        expected: HandleKind,
    ) -> Result<Option<TargetAddr>, HandleError>
    where
        D: Database + ?Sized,
    {
        if token.kind != expected {
            return Err(HandleError::WrongKind {
                expected,
                found: token.kind,
            });
        }
        match self.dereference(db, token, expected) {
            Deref::Valid(target) => Ok(Some(target)),
            Deref::Erased => Ok(None),
            Deref::Invalid => Err(Self::invalid(token)),
        }
    }

    /// Whether `token` is a registered handle of either kind.
    pub fn is_handle(&self, token: DbRef) -> bool {
        self.entry(token).is_some()
    }

    /// Current reference count of a registered token.
    pub fn ref_count(&self, token: DbRef) -> Option<usize> {
        self.entry(token).map(|entry| entry.refs)
    }

    /// Attempt to write a handle to a persistent image.
    ///
    /// Always refused: a handle names a memory address that has no meaning
    /// in another process.
    pub fn save(&self, token: DbRef) -> Result<Vec<u8>, HandleError> {
        if !self.is_handle(token) {
            return Err(Self::invalid(token));
        }
        warn!(handle = %token, "refusing to save database reference");
        Err(HandleError::NotPersistable {
            kind: token.kind,
            target: token.target,
        })
    }

    /// Load a saved handle: yields a fresh placeholder of the same kind.
    pub fn load(&mut self, kind: HandleKind) -> SavedRef {
        SavedRef {
            kind,
            serial: self.fresh_serial(),
        }
    }

    /// Visit every registered token, oldest registration first.
    pub fn scan(&self, mut visit: impl FnMut(DbRef)) {
        for (&(kind, target), entry) in &self.entries {
            visit(DbRef {
                kind,
                target,
                serial: entry.serial,
            });
        }
    }

    /// Number of registered tokens.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no token is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn invalid(token: DbRef) -> HandleError {
        HandleError::InvalidHandle {
            kind: token.kind,
            target: token.target,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_test_utils::MockDatabase;

    const A: TargetAddr = TargetAddr(0x1000);
    const B: TargetAddr = TargetAddr(0x2000);

    fn setup() -> (HandleRegistry, MockDatabase) {
        let mut db = MockDatabase::new();
        for kind in [HandleKind::Clause, HandleKind::Record] {
            db.insert(kind, A);
            db.insert(kind, B);
        }
        (HandleRegistry::new(), db)
    }

    #[test]
    fn same_target_same_token() {
        let (mut reg, mut db) = setup();
        let t1 = reg.make_handle(&mut db, HandleKind::Clause, A);
        let t2 = reg.make_handle(&mut db, HandleKind::Clause, A);
        let t3 = reg.make_handle(&mut db, HandleKind::Clause, B);
        assert_eq!(t1, t2);
        assert_ne!(t1, t3);
        assert_eq!(reg.ref_count(t1), Some(2));
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn kinds_are_interned_separately() {
        let (mut reg, mut db) = setup();
        let clause = reg.make_handle(&mut db, HandleKind::Clause, A);
        let record = reg.make_handle(&mut db, HandleKind::Record, A);
        assert_ne!(clause, record);
    }

    #[test]
    fn creation_marks_target_referenced() {
        let (mut reg, mut db) = setup();
        let t = reg.make_handle(&mut db, HandleKind::Record, A);
        assert!(db.target(HandleKind::Record, A).unwrap().referenced);
        reg.release(&mut db, t).unwrap();
        assert!(!db.target(HandleKind::Record, A).unwrap().referenced);
    }

    #[test]
    fn dereference_tracks_erasure() {
        let (mut reg, mut db) = setup();
        let t = reg.make_handle(&mut db, HandleKind::Clause, A);
        assert_eq!(reg.dereference(&db, t, HandleKind::Clause), Deref::Valid(A));
        db.erase(HandleKind::Clause, A);
        assert_eq!(reg.dereference(&db, t, HandleKind::Clause), Deref::Erased);
        assert_eq!(reg.resolve(&db, t, HandleKind::Clause), Ok(None));
    }

    #[test]
    fn wrong_kind_is_invalid() {
        let (mut reg, mut db) = setup();
        let t = reg.make_handle(&mut db, HandleKind::Record, A);
        assert_eq!(reg.dereference(&db, t, HandleKind::Clause), Deref::Invalid);
        assert_eq!(
            reg.resolve(&db, t, HandleKind::Clause),
            Err(HandleError::WrongKind {
                expected: HandleKind::Clause,
                found: HandleKind::Record,
            })
        );
    }

    #[test]
    fn last_release_of_erased_target_reclaims_it() {
        let (mut reg, mut db) = setup();
        let t = reg.make_handle(&mut db, HandleKind::Clause, A);
        reg.make_handle(&mut db, HandleKind::Clause, A);
        db.erase(HandleKind::Clause, A);
        assert_eq!(db.erased_refs(), 1);

        reg.release(&mut db, t).unwrap();
        assert!(db.reclaimed().is_empty());
        reg.release(&mut db, t).unwrap();
        assert_eq!(db.reclaimed(), &[(HandleKind::Clause, A)]);
        assert_eq!(db.target(HandleKind::Clause, A).unwrap().state, TargetState::Gone);
        assert_eq!(db.erased_refs(), 0);
    }

    #[test]
    fn release_after_storage_gone_frees_wrapper() {
        let (mut reg, mut db) = setup();
        let t = reg.make_handle(&mut db, HandleKind::Record, B);
        db.drop_storage(HandleKind::Record, B);
        reg.release(&mut db, t).unwrap();
        assert_eq!(db.discarded_wrappers(), &[(HandleKind::Record, B)]);
        assert!(db.reclaimed().is_empty());
    }

    #[test]
    fn double_release_is_invalid_handle() {
        let (mut reg, mut db) = setup();
        let t = reg.make_handle(&mut db, HandleKind::Clause, A);
        db.erase(HandleKind::Clause, A);
        reg.release(&mut db, t).unwrap();
        assert_eq!(
            reg.release(&mut db, t),
            Err(HandleError::InvalidHandle {
                kind: HandleKind::Clause,
                target: A,
            })
        );
        assert_eq!(db.reclaimed().len(), 1);
    }

    #[test]
    fn stale_token_stays_invalid_after_reregistration() {
        let (mut reg, mut db) = setup();
        let old = reg.make_handle(&mut db, HandleKind::Clause, A);
        reg.release(&mut db, old).unwrap();
        let new = reg.make_handle(&mut db, HandleKind::Clause, A);
        assert_ne!(old, new);
        assert!(!reg.is_handle(old));
        assert!(reg.is_handle(new));
        assert_eq!(reg.dereference(&db, old, HandleKind::Clause), Deref::Invalid);
    }

    #[test]
    fn prints_kind_and_target() {
        let (mut reg, mut db) = setup();
        let t = reg.make_handle(&mut db, HandleKind::Clause, A);
        assert_eq!(t.to_string(), "<clause>(0x1000)");
        let r = reg.make_handle(&mut db, HandleKind::Record, B);
        assert_eq!(r.to_string(), "<record>(0x2000)");
    }

    #[test]
    fn save_refuses_and_load_is_fresh() {
        let (mut reg, mut db) = setup();
        let t = reg.make_handle(&mut db, HandleKind::Record, A);
        assert_eq!(
            reg.save(t),
            Err(HandleError::NotPersistable {
                kind: HandleKind::Record,
                target: A,
            })
        );
        let a = reg.load(HandleKind::Record);
        let b = reg.load(HandleKind::Record);
        assert_ne!(a, b);
        assert_eq!(a.to_string(), "<saved-record-ref>");
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn scan_visits_registration_order() {
        let (mut reg, mut db) = setup();
        let t1 = reg.make_handle(&mut db, HandleKind::Record, B);
        let t2 = reg.make_handle(&mut db, HandleKind::Clause, A);
        let mut seen = Vec::new();
        reg.scan(|t| seen.push(t));
        assert_eq!(seen, vec![t1, t2]);
    }
}
