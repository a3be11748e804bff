/// Storage word size. Picks the bit-packing group width and the C type of
/// `Bitpack_t`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum WordSize {
    W32,
    #[default]
    W64,
}

impl WordSize {
    pub const fn bits(self) -> u32 {
        match self {
            WordSize::W32 => 32,
            WordSize::W64 => 64,
        }
    }
}

impl std::fmt::Display for WordSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.bits())
    }
}

#[derive(Copy, Clone, Debug, Default)]
pub struct Options {
    pub word: WordSize,
}
