// Locale-aware string ordering for dashboard labels
//
// Multi-level comparison in the style of the Unicode Collation Algorithm:
//   1. primary   - base characters after NFD, case and combining marks folded;
//                  symbols < digits < letters
//   2. secondary - combining marks (unaccented first)
//   3. tertiary  - case (lowercase first)
// Strings equal at all three levels fall back to code point order, so the
// ordering is total and sorting is deterministic.

use std::cmp::Ordering;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum CharClass {
    Symbol,
    Digit,
    Letter,
}

#[derive(Debug, Clone)]
struct CollationElement {
    class: CharClass,
    base: char,
    marks: Vec<char>,
    upper: bool,
}

/// Compare two strings the way a person reading an alphabetised list expects.
pub fn locale_compare(a: &str, b: &str) -> Ordering {
    let left = collation_elements(a);
    let right = collation_elements(b);

    compare_level(&left, &right, |e| (e.class, e.base))
        .then_with(|| compare_level(&left, &right, |e| e.marks.clone()))
        .then_with(|| compare_level(&left, &right, |e| e.upper))
        .then_with(|| a.nfd().cmp(b.nfd()))
        .then_with(|| a.cmp(b))
}

/// Stable in-place sort of `items` by a borrowed label.
pub fn sort_by_locale<T, F>(items: &mut [T], mut label: F)
where
    F: FnMut(&T) -> &str,
{
    items.sort_by(|a, b| locale_compare(label(a), label(b)));
}

fn compare_level<K, F>(left: &[CollationElement], right: &[CollationElement], key: F) -> Ordering
where
    K: Ord,
    F: Fn(&CollationElement) -> K,
{
    left.iter().map(&key).cmp(right.iter().map(&key))
}

/// Canonically decompose `s` and fold each base character with the
/// combining marks that follow it. Marks with no base become symbols.
fn collation_elements(s: &str) -> Vec<CollationElement> {
    let mut elements: Vec<CollationElement> = Vec::new();

    for c in s.nfd() {
        if is_combining_mark(c) {
            if let Some(last) = elements.last_mut() {
                last.marks.push(c);
                continue;
            }
        }

        let upper = c.is_uppercase();
        // Lowercase forms can expand ("İ" -> "i̇"), so decompose them again.
        for lower in c.to_lowercase().nfd() {
            if is_combining_mark(lower) {
                if let Some(last) = elements.last_mut() {
                    last.marks.push(lower);
                    continue;
                }
            }
            elements.push(CollationElement {
                class: classify(lower),
                base: lower,
                marks: Vec::new(),
                upper,
            });
        }
    }

    elements
}

fn classify(c: char) -> CharClass {
    if c.is_alphabetic() {
        CharClass::Letter
    } else if c.is_numeric() {
        CharClass::Digit
    } else {
        CharClass::Symbol
    }
}
