//! Hierarchical mailbox name ordering.
//!
//! Siblings sort case-insensitively in natural order (digit runs compare
//! numerically), `INBOX` pins to the front in mail mode, and ancestors always
//! sort before their descendants so a flat sorted list reads as a pre-order
//! walk of the hierarchy.

use std::cmp::Ordering;

/// Compares full mailbox paths component-wise.
#[derive(Debug, Clone, Copy)]
pub struct NameComparator {
    delimiter: char,
}

impl NameComparator {
    #[inline]
    pub fn new(delimiter: char) -> Self {
        Self { delimiter }
    }

    /// Compares two full paths. With `pin_inbox`, `INBOX` (any case) sorts
    /// before everything else, both as a whole operand and as a first path
    /// component.
    pub fn compare(&self, a: &str, b: &str, pin_inbox: bool) -> Ordering {
        if pin_inbox {
            match (a.eq_ignore_ascii_case("INBOX"), b.eq_ignore_ascii_case("INBOX")) {
                (true, true) => return Ordering::Equal,
                (true, false) => return Ordering::Less,
                (false, true) => return Ordering::Greater,
                (false, false) => {}
            }
        }

        let pa: Vec<&str> = a.split(self.delimiter).collect();
        let pb: Vec<&str> = b.split(self.delimiter).collect();

        for (i, (ca, cb)) in pa.iter().zip(pb.iter()).enumerate() {
            if pin_inbox && i == 0 {
                let a_inbox = *ca == "INBOX";
                let b_inbox = *cb == "INBOX";
                if a_inbox != b_inbox {
                    return if a_inbox { Ordering::Less } else { Ordering::Greater };
                }
            }
            if ca != cb {
                return match natcasecmp(ca, cb) {
                    // Case-insensitively equal components ("a" vs "A") still
                    // need a deterministic order.
                    Ordering::Equal => ca.cmp(cb),
                    unequal => unequal,
                };
            }
        }

        // Shared prefix: the shallower path is the ancestor and comes first.
        pa.len().cmp(&pb.len())
    }

    /// Stable in-place sort of a list of full paths.
    pub fn sort(&self, list: &mut [String], pin_inbox: bool) {
        list.sort_by(|a, b| self.compare(a, b, pin_inbox));
    }
}

/// Case-insensitive natural-order comparison of a single path component.
///
/// Digit runs are compared by numeric value (leading zeros ignored), all other
/// bytes by their ASCII-lowercased value.
fn natcasecmp(a: &str, b: &str) -> Ordering {
    let a = a.as_bytes();
    let b = b.as_bytes();
    let mut i = 0;
    let mut j = 0;

    while i < a.len() && j < b.len() {
        let ca = a[i];
        let cb = b[j];
        if ca.is_ascii_digit() && cb.is_ascii_digit() {
            let (na, ni) = digit_run(a, i);
            let (nb, nj) = digit_run(b, j);
            match na.len().cmp(&nb.len()).then_with(|| na.cmp(nb)) {
                Ordering::Equal => {}
                unequal => return unequal,
            }
            i = ni;
            j = nj;
        } else {
            match ca.to_ascii_lowercase().cmp(&cb.to_ascii_lowercase()) {
                Ordering::Equal => {
                    i += 1;
                    j += 1;
                }
                unequal => return unequal,
            }
        }
    }

    (a.len() - i).cmp(&(b.len() - j))
}

/// Returns the digit run starting at `start` with leading zeros stripped,
/// and the index just past it.
fn digit_run(s: &[u8], start: usize) -> (&[u8], usize) {
    let mut end = start;
    while end < s.len() && s[end].is_ascii_digit() {
        end += 1;
    }
    let mut lead = start;
    while lead + 1 < end && s[lead] == b'0' {
        lead += 1;
    }
    (&s[lead..end], end)
}
