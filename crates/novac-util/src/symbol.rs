//! String interning.
//!
//! A [`Symbol`] is a 4-byte handle to a string stored in a global table.
//! Interning the same string twice yields the same symbol, so comparisons and
//! hashing are integer operations. Strings are leaked into the table and live
//! for the duration of the process; the set of unique strings in a compile is
//! bounded, so this is the usual leak-on-purpose interner design.

use std::fmt;
use std::sync::{Mutex, OnceLock};

use rustc_hash::FxHashMap;

/// An interned string.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol(u32);

impl Symbol {
    /// Intern a string, returning its symbol. Thread-safe.
    pub fn intern(string: &str) -> Symbol {
        interner().lock().unwrap().intern(string)
    }

    /// The string this symbol names.
    pub fn as_str(self) -> &'static str {
        interner().lock().unwrap().get(self)
    }

    /// Raw index value, for debugging and serialization.
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({:?})", self.as_str())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for Symbol {
    fn default() -> Self {
        Symbol::intern("")
    }
}

struct Interner {
    names: FxHashMap<&'static str, u32>,
    strings: Vec<&'static str>,
}

impl Interner {
    fn intern(&mut self, string: &str) -> Symbol {
        if let Some(&index) = self.names.get(string) {
            return Symbol(index);
        }
        let interned: &'static str = Box::leak(string.to_owned().into_boxed_str());
        let index = self.strings.len() as u32;
        self.strings.push(interned);
        self.names.insert(interned, index);
        Symbol(index)
    }

    fn get(&self, symbol: Symbol) -> &'static str {
        self.strings[symbol.0 as usize]
    }
}

fn interner() -> &'static Mutex<Interner> {
    static INTERNER: OnceLock<Mutex<Interner>> = OnceLock::new();
    INTERNER.get_or_init(|| {
        Mutex::new(Interner {
            names: FxHashMap::default(),
            strings: Vec::new(),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_string_same_symbol() {
        let a = Symbol::intern("hello");
        let b = Symbol::intern("hello");
        let c = Symbol::intern("world");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn round_trips_text() {
        let s = Symbol::intern("while.cond#outer");
        assert_eq!(s.as_str(), "while.cond#outer");
        assert_eq!(s.to_string(), "while.cond#outer");
    }
}
