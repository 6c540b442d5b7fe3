//! Character and string generators.

use super::Gen;
use crate::error::GenError;
use crate::range::Range;
use crate::tree::Tree;
use std::rc::Rc;

const SURROGATES: (u32, u32) = (0xD800, 0xDFFF);

/// Characters tried first when simplifying, simplest first.
const SIMPLEST: [char; 6] = ['a', 'b', 'c', 'A', '0', ' '];

/// Lower sorts simpler: lowercase, uppercase, digits, space, other ASCII,
/// everything else.
fn complexity(c: char) -> (u8, u32) {
    let class = match c {
        'a'..='z' => 0,
        'A'..='Z' => 1,
        '0'..='9' => 2,
        ' ' => 3,
        _ if c.is_ascii_graphic() => 4,
        _ if c.is_ascii() => 5,
        _ => 6,
    };
    (class, c as u32)
}

#[derive(Debug, Clone)]
struct Alphabet {
    ranges: Vec<(char, char)>,
}

impl Alphabet {
    fn new(ranges: &[(char, char)]) -> Self {
        let ranges = ranges
            .iter()
            .map(|&(lo, hi)| if hi < lo { (hi, lo) } else { (lo, hi) })
            .collect();
        Alphabet { ranges }
    }

    fn len(&self) -> u64 {
        self.ranges
            .iter()
            .map(|&(lo, hi)| u64::from(hi as u32 - lo as u32) + 1)
            .sum()
    }

    fn nth(&self, mut n: u64) -> char {
        for &(lo, hi) in &self.ranges {
            let width = u64::from(hi as u32 - lo as u32) + 1;
            if n < width {
                return char::from_u32(lo as u32 + n as u32).unwrap_or(lo);
            }
            n -= width;
        }
        self.ranges.first().map_or('a', |&(lo, _)| lo)
    }

    fn contains(&self, c: char) -> bool {
        self.ranges.iter().any(|&(lo, hi)| lo <= c && c <= hi)
    }

    /// Strictly simpler members of the alphabet, simplest first.
    fn simplify(&self, c: char) -> Vec<char> {
        let rank = complexity(c);
        let first = self.ranges.first().map(|&(lo, _)| lo);
        let mut candidates: Vec<char> = Vec::new();
        for candidate in SIMPLEST
            .into_iter()
            .chain([c.to_ascii_lowercase()])
            .chain(first)
        {
            if self.contains(candidate) && complexity(candidate) < rank && !candidates.contains(&candidate) {
                candidates.push(candidate);
            }
        }
        candidates
    }
}

impl Gen<char> {
    fn from_alphabet(alphabet: Alphabet) -> Self {
        let alphabet = Rc::new(alphabet);
        Gen::fallible(move |_size, seed| {
            let len = alphabet.len();
            if len == 0 {
                return Err(GenError::InvalidRange {
                    message: "empty character set".to_string(),
                });
            }
            let (n, _) = seed.next_bounded(len);
            let alphabet = Rc::clone(&alphabet);
            Ok(Tree::unfold(alphabet.nth(n), move |&c| alphabet.simplify(c)))
        })
    }

    /// Characters between `lo` and `hi` inclusive. Ranges that span the
    /// surrogate block skip it.
    pub fn char_range(lo: char, hi: char) -> Self {
        let (lo, hi) = if hi < lo { (hi, lo) } else { (lo, hi) };
        let mut ranges = Vec::new();
        if (lo as u32) < SURROGATES.0 && (hi as u32) > SURROGATES.1 {
            ranges.push((lo, '\u{D7FF}'));
            ranges.push(('\u{E000}', hi));
        } else {
            ranges.push((lo, hi));
        }
        Self::from_alphabet(Alphabet::new(&ranges))
    }

    pub fn ascii_alpha() -> Self {
        Self::from_alphabet(Alphabet::new(&[('a', 'z'), ('A', 'Z')]))
    }

    pub fn ascii_alphanumeric() -> Self {
        Self::from_alphabet(Alphabet::new(&[('a', 'z'), ('A', 'Z'), ('0', '9')]))
    }

    /// Printable ASCII, space through tilde.
    pub fn ascii_printable() -> Self {
        Self::from_alphabet(Alphabet::new(&[(' ', '~')]))
    }

    /// Any Unicode scalar value, with ASCII favoured three to one.
    pub fn unicode() -> Self {
        Gen::frequency(vec![
            (3, Self::ascii_printable()),
            (1, Self::char_range('\u{80}', char::MAX)),
        ])
    }
}

impl Gen<String> {
    /// Strings of characters drawn from `chars`.
    ///
    /// Shrinks by truncation and then by simplifying one character at a time
    /// towards `a`.
    pub fn string_of(chars: Gen<char>, length: Range<usize>) -> Self {
        Gen::<Vec<char>>::vec_with_range(chars, length).map(|chars| chars.into_iter().collect())
    }

    pub fn ascii_alpha() -> Self {
        Self::string_of(Gen::<char>::ascii_alpha(), Range::linear(0, 100))
    }

    pub fn ascii_alphanumeric() -> Self {
        Self::string_of(Gen::<char>::ascii_alphanumeric(), Range::linear(0, 100))
    }

    pub fn ascii_printable() -> Self {
        Self::string_of(Gen::<char>::ascii_printable(), Range::linear(0, 100))
    }

    pub fn unicode() -> Self {
        Self::string_of(Gen::<char>::unicode(), Range::linear(0, 100))
    }
}
