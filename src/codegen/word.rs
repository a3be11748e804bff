/// Storage word the generated C code packs variables into.
pub trait Word {
    const BITS: u32;

    /// Fixed-width unsigned C type behind `Bitpack_t`.
    const C_TYPE: &str;

    /// Suffix making an integer literal at least as wide as the word.
    const LITERAL_SUFFIX: &str;
}

impl Word for W32 {
    const BITS: u32 = 32;

    const C_TYPE: &str = "uint32_t";

    const LITERAL_SUFFIX: &str = "U";
}

impl Word for W64 {
    const BITS: u32 = 64;

    const C_TYPE: &str = "uint64_t";

    const LITERAL_SUFFIX: &str = "ULL";
}

pub struct W32;

pub struct W64;
