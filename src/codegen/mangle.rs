//! Linkage symbols.
//!
//! Every generated function has the same C signature; the bit layout of its
//! parameters and return value lives in the symbol name:
//!
//! ```text
//! _BP <object bits> C <len> <class> M <len> <method> P (<width> _)* [V] R <ret width>
//! ```
//!
//! For instance, `8 add(4 a, 4 b)` in a 128-bit `Counter` object is
//! `_BP128C7CounterM3addP4_4_R8`.

use std::fmt::{self, Write};

use crate::ast::{CompilationUnit, Method};

const PREFIX: &str = "_BP";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    pub object_bits: u64,
    pub class: String,
    pub method: String,
    pub params: Vec<u64>,
    pub var_args: bool,
    pub ret: u64,
}

impl Signature {
    /// Collects the signature of a method of `unit`.
    pub fn of(unit: &CompilationUnit, method: &Method) -> Signature {
        Signature {
            object_bits: unit.object_bits,
            class: unit.object_name.to_string(),
            method: method.name.to_string(),
            params: method.params.iter().map(|&p| unit.var(p).width).collect(),
            var_args: method.has_var_args,
            ret: unit.var(method.ret).width,
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}::{}(", self.ret, self.class, self.method)?;
        for (idx, width) in self.params.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{width}")?;
        }
        if self.var_args {
            f.write_str(if self.params.is_empty() { "..." } else { ", ..." })?;
        }
        write!(f, ") [{}-bit object]", self.object_bits)
    }
}

pub fn mangle(sig: &Signature) -> String {
    let mut out = String::with_capacity(32);
    let Signature {
        object_bits,
        class,
        method,
        params,
        var_args,
        ret,
    } = sig;
    _ = write!(out, "{PREFIX}{object_bits}");
    _ = write!(out, "C{}{class}", class.len());
    _ = write!(out, "M{}{method}", method.len());
    out.push('P');
    for width in params {
        _ = write!(out, "{width}_");
    }
    if *var_args {
        out.push('V');
    }
    _ = write!(out, "R{ret}");
    out
}

/// Parses a symbol produced by [`mangle`]. Returns `None` for anything else.
pub fn demangle(symbol: &str) -> Option<Signature> {
    let mut c = Cursor {
        rest: symbol.strip_prefix(PREFIX)?,
    };

    let object_bits = c.number()?;
    c.expect('C')?;
    let class = c.length_prefixed()?;
    c.expect('M')?;
    let method = c.length_prefixed()?;
    c.expect('P')?;

    let mut params = Vec::new();
    while c.rest.starts_with(|ch: char| ch.is_ascii_digit()) {
        params.push(c.number()?);
        c.expect('_')?;
    }
    let var_args = c.expect('V').is_some();
    c.expect('R')?;
    let ret = c.number()?;

    c.rest.is_empty().then(|| Signature {
        object_bits,
        class: class.to_string(),
        method: method.to_string(),
        params,
        var_args,
        ret,
    })
}

struct Cursor<'s> {
    rest: &'s str,
}

impl<'s> Cursor<'s> {
    fn expect(&mut self, ch: char) -> Option<()> {
        self.rest = self.rest.strip_prefix(ch)?;
        Some(())
    }

    fn number(&mut self) -> Option<u64> {
        let end = self
            .rest
            .find(|ch: char| !ch.is_ascii_digit())
            .unwrap_or(self.rest.len());
        let (digits, rest) = self.rest.split_at(end);
        let n = digits.parse().ok()?;
        self.rest = rest;
        Some(n)
    }

    fn length_prefixed(&mut self) -> Option<&'s str> {
        let len = usize::try_from(self.number()?).ok()?;
        let name = self.rest.get(..len)?;
        self.rest = &self.rest[len..];
        (!name.is_empty()).then_some(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn sig(params: &[u64], var_args: bool) -> Signature {
        Signature {
            object_bits: 128,
            class: "Counter".into(),
            method: "add".into(),
            params: params.to_vec(),
            var_args,
            ret: 8,
        }
    }

    #[test]
    fn test_mangle() {
        assert_eq!(mangle(&sig(&[4, 4], false)), "_BP128C7CounterM3addP4_4_R8");
        assert_eq!(mangle(&sig(&[], false)), "_BP128C7CounterM3addPR8");
        assert_eq!(mangle(&sig(&[16], true)), "_BP128C7CounterM3addP16_VR8");
    }

    #[test]
    fn test_demangle() {
        let demangled = demangle("_BP128C7CounterM3addP4_4_R8").unwrap();
        assert_eq!(demangled, sig(&[4, 4], false));
        assert_eq!(demangled.to_string(), "8 Counter::add(4, 4) [128-bit object]");

        let demangled = demangle("_BP128C7CounterM3addPVR8").unwrap();
        assert_eq!(demangled.to_string(), "8 Counter::add(...) [128-bit object]");
    }

    #[test]
    fn test_demangle_rejects_foreign_symbols() {
        assert_eq!(demangle("main"), None);
        assert_eq!(demangle("_BP128C7CounterM3addP4_4_R8x"), None);
        assert_eq!(demangle("_BP128C9CounterM3addPR8"), None);
        assert_eq!(demangle("_BP128C0M3addPR8"), None);
        assert_eq!(demangle("_BP8C1AM1fP4R8"), None);
    }

    #[test]
    fn test_names_with_digits() {
        let s = Signature {
            object_bits: 8,
            class: "A2".into(),
            method: "f_3".into(),
            params: vec![12],
            var_args: false,
            ret: 1,
        };
        let symbol = mangle(&s);
        assert_eq!(symbol, "_BP8C2A2M3f_3P12_R1");
        assert_eq!(demangle(&symbol), Some(s));
    }

    proptest! {
        #[test]
        fn demangle_inverts_mangle(
            object_bits in 1u64..4096,
            class in "[A-Za-z_][A-Za-z0-9_]{0,12}",
            method in "[A-Za-z_][A-Za-z0-9_]{0,12}",
            params in prop::collection::vec(1u64..=64, 0..6),
            var_args in any::<bool>(),
            ret in 1u64..=64,
        ) {
            let s = Signature { object_bits, class, method, params, var_args, ret };
            prop_assert_eq!(demangle(&mangle(&s)), Some(s));
        }
    }
}
