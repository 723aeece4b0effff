//! Konami code matcher: ↑ ↑ ↓ ↓ ← → ← → B A, compared on `KeyboardEvent.code`.

pub const KONAMI_SEQUENCE: [&str; 10] = [
    "ArrowUp",
    "ArrowUp",
    "ArrowDown",
    "ArrowDown",
    "ArrowLeft",
    "ArrowRight",
    "ArrowLeft",
    "ArrowRight",
    "KeyB",
    "KeyA",
];

/// One step of the matcher. Returns the new cursor and whether the full
/// sequence just completed (in which case the cursor is back at 0).
///
/// A mismatch always drops the cursor to 0, even if the wrong code happens
/// to be the first code of the sequence.
pub fn advance(sequence: &[&str], cursor: usize, code: &str) -> (usize, bool) {
    if sequence.get(cursor) != Some(&code) {
        return (0, false);
    }
    let next = cursor + 1;
    if next == sequence.len() { (0, true) } else { (next, false) }
}

#[derive(Clone, Debug)]
pub struct KonamiDetector {
    sequence: &'static [&'static str],
    cursor: usize,
}

impl Default for KonamiDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl KonamiDetector {
    pub fn new() -> Self {
        Self::with_sequence(&KONAMI_SEQUENCE)
    }

    pub fn with_sequence(sequence: &'static [&'static str]) -> Self {
        Self { sequence, cursor: 0 }
    }

    /// Feed one key code; true when the sequence completes.
    pub fn feed(&mut self, code: &str) -> bool {
        let (cursor, fired) = advance(self.sequence, self.cursor, code);
        self.cursor = cursor;
        fired
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn reset(&mut self) {
        self.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn feed_all(d: &mut KonamiDetector, codes: &[&str]) -> usize {
        codes.iter().filter(|c| d.feed(c)).count()
    }

    #[test]
    fn test_exact_sequence_fires_once_and_rewinds() {
        let mut d = KonamiDetector::new();
        assert_eq!(feed_all(&mut d, &KONAMI_SEQUENCE), 1);
        assert_eq!(d.cursor(), 0);
    }

    #[test]
    fn test_sequence_twice_fires_twice() {
        let mut d = KonamiDetector::new();
        let mut twice = KONAMI_SEQUENCE.to_vec();
        twice.extend_from_slice(&KONAMI_SEQUENCE);
        assert_eq!(feed_all(&mut d, &twice), 2);
    }

    #[test]
    fn test_wrong_code_resets_cursor() {
        let mut d = KonamiDetector::new();
        feed_all(&mut d, &KONAMI_SEQUENCE[..6]);
        assert_eq!(d.cursor(), 6);
        assert!(!d.feed("KeyX"));
        assert_eq!(d.cursor(), 0);
    }

    #[test]
    fn test_extra_leading_up_breaks_the_match() {
        let mut d = KonamiDetector::new();
        let mut codes = vec!["ArrowUp"];
        codes.extend_from_slice(&KONAMI_SEQUENCE);
        // third ArrowUp mismatches "ArrowDown" and drops to 0
        assert_eq!(feed_all(&mut d, &codes), 0);
    }

    proptest! {
        #[test]
        fn prop_one_wrong_code_never_fires(pos in 0usize..10, wrong in "[A-Z][a-z]{2,6}") {
            let mut codes = KONAMI_SEQUENCE.to_vec();
            prop_assume!(codes[pos] != wrong.as_str());
            codes[pos] = wrong.as_str();
            let mut d = KonamiDetector::new();
            prop_assert_eq!(feed_all(&mut d, &codes), 0);
            prop_assert!(d.cursor() < KONAMI_SEQUENCE.len());
        }
    }
}
