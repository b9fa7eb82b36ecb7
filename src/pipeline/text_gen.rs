/// Sampling of plaintext candidates for the synthesis pipeline.
///
/// `RegexTextGenerator` draws strings from the language of a regular
/// expression by walking its parsed HIR and resolving every choice point
/// (alternation branch, class member, repetition count) uniformly at random.
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use regex_syntax::hir::{Class, Hir, HirKind, Literal, RepetitionKind, RepetitionRange};

use crate::errors::{DepixError, DepixResult};

/// Residual repetitions sampled for `*`, `+` and `{n,}` beyond the
/// required minimum.
const UNBOUNDED_REPEAT_CAP: u32 = 10;

pub trait TextGenerator {
    fn generate(&mut self) -> DepixResult<String>;
}

pub struct RegexTextGenerator {
    hir: Hir,
    rng: StdRng,
}

impl RegexTextGenerator {
    pub fn new(pattern: &str) -> DepixResult<Self> {
        Self::with_rng(pattern, StdRng::from_entropy())
    }

    pub fn with_seed(pattern: &str, seed: u64) -> DepixResult<Self> {
        Self::with_rng(pattern, StdRng::seed_from_u64(seed))
    }

    fn with_rng(pattern: &str, rng: StdRng) -> DepixResult<Self> {
        let hir = regex_syntax::Parser::new()
            .parse(pattern)
            .map_err(|e| DepixError::Pattern(format!("{e}")))?;
        Ok(Self { hir, rng })
    }
}

impl TextGenerator for RegexTextGenerator {
    fn generate(&mut self) -> DepixResult<String> {
        let mut out = String::new();
        sample_hir(&self.hir, &mut self.rng, &mut out)?;
        Ok(out)
    }
}

fn sample_hir(hir: &Hir, rng: &mut StdRng, out: &mut String) -> DepixResult<()> {
    match hir.kind() {
        HirKind::Empty => Ok(()),
        HirKind::Literal(Literal::Unicode(c)) => {
            out.push(*c);
            Ok(())
        }
        HirKind::Literal(Literal::Byte(b)) => {
            out.push(*b as char);
            Ok(())
        }
        HirKind::Class(class) => {
            out.push(sample_class(class, rng)?);
            Ok(())
        }
        HirKind::Repetition(rep) => {
            let (min, max) = repetition_bounds(&rep.kind);
            let count = rng.gen_range(min..=max);
            for _ in 0..count {
                sample_hir(&rep.hir, rng, out)?;
            }
            Ok(())
        }
        HirKind::Group(group) => sample_hir(&group.hir, rng, out),
        HirKind::Concat(items) => {
            for item in items {
                sample_hir(item, rng, out)?;
            }
            Ok(())
        }
        HirKind::Alternation(items) => {
            let pick = rng.gen_range(0..items.len());
            sample_hir(&items[pick], rng, out)
        }
        // Anchors and word boundaries contribute no characters.
        HirKind::Anchor(_) | HirKind::WordBoundary(_) => Ok(()),
    }
}

fn repetition_bounds(kind: &RepetitionKind) -> (u32, u32) {
    match kind {
        RepetitionKind::ZeroOrOne => (0, 1),
        RepetitionKind::ZeroOrMore => (0, UNBOUNDED_REPEAT_CAP),
        RepetitionKind::OneOrMore => (1, 1 + UNBOUNDED_REPEAT_CAP),
        RepetitionKind::Range(RepetitionRange::Exactly(n)) => (*n, *n),
        RepetitionKind::Range(RepetitionRange::AtLeast(n)) => (*n, n + UNBOUNDED_REPEAT_CAP),
        RepetitionKind::Range(RepetitionRange::Bounded(m, n)) => (*m, *n),
    }
}

fn sample_class(class: &Class, rng: &mut StdRng) -> DepixResult<char> {
    match class {
        Class::Unicode(cls) => {
            let ranges: Vec<(u32, u32)> = cls
                .iter()
                .map(|r| (r.start() as u32, r.end() as u32))
                .collect();
            let total: u32 = ranges.iter().map(|(s, e)| e - s + 1).sum();
            if total == 0 {
                return Err(DepixError::Pattern("empty character class".into()));
            }
            let mut pick = rng.gen_range(0..total);
            for (start, end) in ranges {
                let span = end - start + 1;
                if pick < span {
                    return char::from_u32(start + pick)
                        .ok_or_else(|| DepixError::Pattern("invalid code point in class".into()));
                }
                pick -= span;
            }
            unreachable!("pick is bounded by the range total")
        }
        Class::Bytes(cls) => {
            let ranges: Vec<(u8, u8)> = cls.iter().map(|r| (r.start(), r.end())).collect();
            let total: u32 = ranges.iter().map(|(s, e)| (e - s) as u32 + 1).sum();
            if total == 0 {
                return Err(DepixError::Pattern("empty character class".into()));
            }
            let mut pick = rng.gen_range(0..total);
            for (start, end) in ranges {
                let span = (end - start) as u32 + 1;
                if pick < span {
                    return Ok((start + pick as u8) as char);
                }
                pick -= span;
            }
            unreachable!("pick is bounded by the range total")
        }
    }
}

/// Fixed-length random digit strings; a lighter sampler than going through
/// the regex machinery.
pub struct DigitTextGenerator {
    length: usize,
    rng: StdRng,
}

impl DigitTextGenerator {
    pub fn new(length: usize) -> Self {
        Self {
            length,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(length: usize, seed: u64) -> Self {
        Self {
            length,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl TextGenerator for DigitTextGenerator {
    fn generate(&mut self) -> DepixResult<String> {
        Ok((0..self.length)
            .map(|_| (b'0' + self.rng.gen_range(0..10u8)) as char)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    #[test]
    fn regex_outputs_match_the_pattern() {
        let pattern = r"\d{1,5}";
        let matcher = Regex::new(&format!("^{pattern}$")).unwrap();
        let mut generator = RegexTextGenerator::with_seed(pattern, 42).unwrap();

        for _ in 0..100 {
            let text = generator.generate().unwrap();
            assert!(matcher.is_match(&text), "{text:?} does not match {pattern}");
        }
    }

    #[test]
    fn regex_outputs_cover_alternation_and_classes() {
        let pattern = r"(abc|[0-9]{2}|[a-f])x";
        let matcher = Regex::new(&format!("^{pattern}$")).unwrap();
        let mut generator = RegexTextGenerator::with_seed(pattern, 7).unwrap();

        for _ in 0..50 {
            let text = generator.generate().unwrap();
            assert!(matcher.is_match(&text), "{text:?} does not match {pattern}");
        }
    }

    #[test]
    fn seeded_generation_is_reproducible() {
        let mut a = RegexTextGenerator::with_seed(r"\d{8,12}", 11).unwrap();
        let mut b = RegexTextGenerator::with_seed(r"\d{8,12}", 11).unwrap();
        for _ in 0..10 {
            assert_eq!(a.generate().unwrap(), b.generate().unwrap());
        }
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        assert!(matches!(
            RegexTextGenerator::new("(unclosed"),
            Err(DepixError::Pattern(_))
        ));
    }

    #[test]
    fn digit_generator_emits_requested_length() {
        let mut generator = DigitTextGenerator::with_seed(5, 3);
        let text = generator.generate().unwrap();
        assert_eq!(text.chars().count(), 5);
        assert!(text.chars().all(|c| c.is_ascii_digit()));
    }
}
