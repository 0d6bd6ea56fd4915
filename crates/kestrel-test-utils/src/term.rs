//! A small term model and a byte-level snapshot codec for it.
//!
//! Snapshot layout: `[body_len: u32 LE][body][checksum: u32 LE]`, where the
//! checksum is FNV-1a over the body. A snapshot that was torn or
//! overwritten while a scanner looked at it fails to decode.

use kestrel_core::{CompileError, CompiledTerm, SnapshotAllocator, TermCompiler};

const TAG_ATOM: u8 = 1;
const TAG_INT: u8 = 2;
const TAG_COMPOUND: u8 = 3;
const TAG_NIL: u8 = 4;
const TAG_CONS: u8 = 5;

const FRAME_BYTES: usize = 8;

/// Minimal Prolog-like term.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Term {
    Atom(String),
    Int(i64),
    Compound(String, Vec<Term>),
    Nil,
    Cons(Box<Term>, Box<Term>),
}

impl Term {
    pub fn atom(name: &str) -> Self {
        Term::Atom(name.to_string())
    }

    pub fn compound(name: &str, args: Vec<Term>) -> Self {
        Term::Compound(name.to_string(), args)
    }

    /// Proper list of `items`.
    pub fn list(items: Vec<Term>) -> Self {
        Self::list_with_tail(items, Term::Nil)
    }

    pub fn list_with_tail(items: Vec<Term>, tail: Term) -> Self {
        items
            .into_iter()
            .rev()
            .fold(tail, |acc, item| Term::Cons(Box::new(item), Box::new(acc)))
    }

    /// Elements of a list, and the tail it ends in.
    pub fn split_list(&self) -> (Vec<Term>, Term) {
        let mut items = Vec::new();
        let mut cur = self;
        while let Term::Cons(head, tail) = cur {
            items.push((**head).clone());
            cur = tail;
        }
        (items, cur.clone())
    }

    /// Elements of a proper list. Panics on anything else.
    pub fn to_vec(&self) -> Vec<Term> {
        let (items, tail) = self.split_list();
        assert_eq!(tail, Term::Nil, "not a proper list: {self:?}");
        items
    }

    /// Global-stack cells needed to build this term.
    pub fn cells(&self) -> usize {
        match self {
            Term::Atom(_) | Term::Int(_) | Term::Nil => 1,
            Term::Compound(_, args) => 1 + args.len() + args.iter().map(Term::cells).sum::<usize>(),
            Term::Cons(..) => {
                let mut cells = 0;
                let mut cur = self;
                while let Term::Cons(head, tail) = cur {
                    cells += 3 + head.cells();
                    cur = tail;
                }
                cells + cur.cells()
            }
        }
    }
}

fn fnv1a(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0x811c_9dc5u32, |hash, b| {
        (hash ^ u32::from(*b)).wrapping_mul(0x0100_0193)
    })
}

fn encode(term: &Term, out: &mut Vec<u8>) {
    match term {
        Term::Atom(name) => {
            out.push(TAG_ATOM);
            encode_str(name, out);
        }
        Term::Int(v) => {
            out.push(TAG_INT);
            out.extend_from_slice(&v.to_le_bytes());
        }
        Term::Compound(name, args) => {
            out.push(TAG_COMPOUND);
            encode_str(name, out);
            out.extend_from_slice(&(args.len() as u32).to_le_bytes());
            for arg in args {
                encode(arg, out);
            }
        }
        Term::Nil => out.push(TAG_NIL),
        Term::Cons(..) => {
            let mut cur = term;
            while let Term::Cons(head, tail) = cur {
                out.push(TAG_CONS);
                encode(head, out);
                cur = tail;
            }
            encode(cur, out);
        }
    }
}

fn encode_str(s: &str, out: &mut Vec<u8>) {
    out.extend_from_slice(&(s.len() as u32).to_le_bytes());
    out.extend_from_slice(s.as_bytes());
}

fn malformed(reason: &str) -> CompileError {
    CompileError::Malformed {
        reason: reason.to_string(),
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], CompileError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| malformed("truncated body"))?;
        let out = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    fn u32(&mut self) -> Result<u32, CompileError> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(buf))
    }

    fn string(&mut self) -> Result<String, CompileError> {
        let len = self.u32()? as usize;
        let raw = self.take(len)?;
        String::from_utf8(raw.to_vec()).map_err(|_| malformed("atom name is not utf-8"))
    }

    fn term(&mut self, atoms: &mut Vec<String>) -> Result<Term, CompileError> {
        let tag = self.take(1)?[0];
        match tag {
            TAG_ATOM => {
                let name = self.string()?;
                atoms.push(name.clone());
                Ok(Term::Atom(name))
            }
            TAG_INT => {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(self.take(8)?);
                Ok(Term::Int(i64::from_le_bytes(buf)))
            }
            TAG_COMPOUND => {
                let name = self.string()?;
                atoms.push(name.clone());
                let arity = self.u32()? as usize;
                let mut args = Vec::with_capacity(arity.min(64));
                for _ in 0..arity {
                    args.push(self.term(atoms)?);
                }
                Ok(Term::Compound(name, args))
            }
            TAG_NIL => Ok(Term::Nil),
            TAG_CONS => {
                // Walk the list spine in a loop; only heads recurse.
                let mut heads = vec![self.term(atoms)?];
                while self.bytes.get(self.pos) == Some(&TAG_CONS) {
                    self.pos += 1;
                    heads.push(self.term(atoms)?);
                }
                let tail = self.term(atoms)?;
                Ok(Term::list_with_tail(heads, tail))
            }
            other => Err(malformed(&format!("unknown tag {other}"))),
        }
    }
}

fn decode(snapshot: &[u8]) -> Result<(Term, Vec<String>), CompileError> {
    if snapshot.len() < FRAME_BYTES {
        return Err(malformed("snapshot shorter than its frame"));
    }
    let mut header = [0u8; 4];
    header.copy_from_slice(&snapshot[..4]);
    let body_len = u32::from_le_bytes(header) as usize;
    if snapshot.len() != body_len + FRAME_BYTES {
        return Err(malformed("length prefix does not match snapshot size"));
    }
    let body = &snapshot[4..4 + body_len];
    let mut trailer = [0u8; 4];
    trailer.copy_from_slice(&snapshot[4 + body_len..]);
    if u32::from_le_bytes(trailer) != fnv1a(body) {
        return Err(malformed("checksum mismatch"));
    }

    let mut reader = Reader { bytes: body, pos: 0 };
    let mut atoms = Vec::new();
    let term = reader.term(&mut atoms)?;
    if reader.pos != body.len() {
        return Err(malformed("trailing bytes after term"));
    }
    Ok((term, atoms))
}

/// Atom names referenced by a snapshot, in encoding order.
pub fn atoms_of(snapshot: &[u8]) -> Result<Vec<String>, CompileError> {
    decode(snapshot).map(|(_, atoms)| atoms)
}

/// [`TermCompiler`] for [`Term`] using the framed codec above.
#[derive(Clone, Copy, Debug, Default)]
pub struct CodecCompiler;

impl CodecCompiler {
    pub fn new() -> Self {
        Self
    }

    /// Encoded size of `term` in bytes, frame included.
    pub fn snapshot_len(term: &Term) -> usize {
        let mut body = Vec::new();
        encode(term, &mut body);
        body.len() + FRAME_BYTES
    }
}

impl TermCompiler for CodecCompiler {
    type Term = Term;

    fn compile(
        &self,
        term: &Term,
        alloc: &mut dyn SnapshotAllocator,
    ) -> Result<CompiledTerm, CompileError> {
        let mut body = Vec::new();
        encode(term, &mut body);
        let out = alloc.alloc(body.len() + FRAME_BYTES)?;
        out[..4].copy_from_slice(&(body.len() as u32).to_le_bytes());
        out[4..4 + body.len()].copy_from_slice(&body);
        out[4 + body.len()..].copy_from_slice(&fnv1a(&body).to_le_bytes());
        Ok(CompiledTerm { gsize: term.cells() })
    }

    fn materialize(&self, snapshot: &[u8]) -> Result<Term, CompileError> {
        decode(snapshot).map(|(term, _)| term)
    }
}
