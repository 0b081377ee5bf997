// SPDX-License-Identifier: PMPL-1.0-or-later
//! Left outer join over in-memory sequences.

use std::collections::HashMap;
use std::hash::Hash;

/// Pair every outer item with each inner item sharing its key, or with
/// `None` when no inner item matches.
///
/// Output follows outer order; matches for one outer item follow inner order.
pub fn left_join<O, I, K, R>(
    outer: impl IntoIterator<Item = O>,
    inner: impl IntoIterator<Item = I>,
    outer_key: impl Fn(&O) -> K,
    inner_key: impl Fn(&I) -> K,
    result: impl Fn(&O, Option<&I>) -> R,
) -> Vec<R>
where
    K: Eq + Hash,
{
    let mut groups: HashMap<K, Vec<I>> = HashMap::new();
    for item in inner {
        groups.entry(inner_key(&item)).or_default().push(item);
    }

    let mut out = Vec::new();
    for item in outer {
        match groups.get(&outer_key(&item)) {
            Some(matches) => out.extend(matches.iter().map(|m| result(&item, Some(m)))),
            None => out.push(result(&item, None)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_left_join_keeps_unmatched_outer() {
        let customers = vec![(1, "ann"), (2, "bob"), (3, "cy")];
        let orders = vec![(10, 1), (11, 1), (12, 3)];
        let joined = left_join(
            customers,
            orders,
            |c| c.0,
            |o| o.1,
            |c, o| (c.1, o.map(|o| o.0)),
        );
        assert_eq!(
            joined,
            vec![
                ("ann", Some(10)),
                ("ann", Some(11)),
                ("bob", None),
                ("cy", Some(12)),
            ]
        );
    }

    #[test]
    fn test_left_join_empty_inner() {
        let joined = left_join(vec!["a", "b"], Vec::<&str>::new(), |s| *s, |s| *s, |o, i| {
            (*o, i.is_some())
        });
        assert_eq!(joined, vec![("a", false), ("b", false)]);
    }
}
