use std::fmt;

/// Fast, order-sensitive digest of a file body.
///
/// A 32-bit polynomial rolling hash (`h * 31 + unit`, wrapping) over the
/// UTF-16 code units of the text. Only used to tell whether the body changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash(i32);

impl ContentHash {
    pub fn of(content: &str) -> Self {
        let hash = content
            .encode_utf16()
            .fold(0i32, |hash, unit| hash.wrapping_mul(31).wrapping_add(unit as i32));
        Self(hash)
    }

    pub fn value(self) -> i32 {
        self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
