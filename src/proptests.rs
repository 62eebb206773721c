use proptest::prelude::*;
use std::collections::BTreeMap;

use crate::config::WindowConfig;
use crate::pattern_index::{IndexError, PatternIndex};
use crate::source::testing::ChunkedSource;
use crate::substitutor::substitute;

fn chars(s: &str) -> Vec<char> {
    s.chars().collect()
}

/// Whether `key` can join `accepted` without breaking prefix-exclusivity.
fn model_accepts<V>(accepted: &BTreeMap<Vec<char>, V>, key: &[char]) -> bool {
    !key.is_empty()
        && accepted
            .keys()
            .all(|k| !k.starts_with(key) && !key.starts_with(k))
}

/// Left to right, first needle found at each position, no rescanning.
fn naive_substitute(accepted: &BTreeMap<Vec<char>, Vec<char>>, input: &[char]) -> String {
    let mut out = String::new();
    let mut pos = 0;
    while pos < input.len() {
        let rest = &input[pos..];
        match accepted.iter().find(|(needle, _)| rest.starts_with(needle)) {
            Some((needle, replacement)) => {
                out.extend(replacement);
                pos += needle.len();
            }
            None => {
                out.push(input[pos]);
                pos += 1;
            }
        }
    }
    out
}

fn build(
    pairs: &[(String, String)],
) -> (PatternIndex<Vec<char>>, BTreeMap<Vec<char>, Vec<char>>) {
    let mut index = PatternIndex::new();
    let mut model = BTreeMap::new();
    for (needle, replacement) in pairs {
        let needle = chars(needle);
        if index.insert(&needle, chars(replacement)).is_ok() {
            model.insert(needle, chars(replacement));
        }
    }
    (index, model)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_index_matches_model(keys in prop::collection::vec("[a-c]{0,5}", 0..24)) {
        let mut index = PatternIndex::new();
        let mut model: BTreeMap<Vec<char>, usize> = BTreeMap::new();

        for (i, key) in keys.iter().enumerate() {
            let key = chars(key);
            let got = index.insert(&key, i);
            if model_accepts(&model, &key) {
                prop_assert_eq!(got, Ok(()));
                model.insert(key, i);
            } else if key.is_empty() {
                prop_assert_eq!(got, Err(IndexError::EmptyKey));
            } else {
                prop_assert_eq!(got, Err(IndexError::KeyCollision));
            }
            prop_assert_eq!(index.len(), model.len());
        }

        let height = model.keys().map(Vec::len).max().unwrap_or(0);
        prop_assert_eq!(index.height(), height);

        let got: Vec<(Vec<char>, usize)> = index.iter().map(|(k, v)| (k, *v)).collect();
        let expected: Vec<(Vec<char>, usize)> = model.into_iter().collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn prop_prefix_exclusive_both_orders(a in "[a-c]{1,5}", ext in "[a-c]{1,5}") {
        let short = chars(&a);
        let long = chars(&format!("{a}{ext}"));

        let mut index = PatternIndex::new();
        index.insert(&short, 0).unwrap();
        prop_assert_eq!(index.insert(&long, 1), Err(IndexError::KeyCollision));
        prop_assert_eq!(index.get(&short), Some(&0));
        prop_assert_eq!(index.get(&long), None);

        let mut index = PatternIndex::new();
        index.insert(&long, 0).unwrap();
        prop_assert_eq!(index.insert(&short, 1), Err(IndexError::KeyCollision));
        prop_assert_eq!(index.get(&long), Some(&0));
        prop_assert_eq!(index.height(), long.len());
    }

    #[test]
    fn prop_empty_index_is_identity(
        input in "[a-z ]{0,80}",
        input_window in 1usize..16,
        output_window in 1usize..8,
        step in 1usize..7,
    ) {
        let index: PatternIndex<Vec<char>> = PatternIndex::new();
        let windows = WindowConfig { input_window, output_window };
        let mut out = String::new();
        let stats = substitute(&index, &mut ChunkedSource::new(&input, step), &mut out, &windows)
            .unwrap();
        prop_assert_eq!(&out, &input);
        prop_assert_eq!(stats.replacements, 0);
        prop_assert_eq!(stats.chars_read, input.chars().count() as u64);
    }

    #[test]
    fn prop_matches_naive_substitution(
        pairs in prop::collection::vec(("[ab]{1,4}", "[xyz]{0,3}"), 0..8),
        input in "[abx]{0,60}",
        input_window in 1usize..16,
        output_window in 1usize..8,
        step in 1usize..7,
    ) {
        let (index, model) = build(&pairs);
        let windows = WindowConfig { input_window, output_window };
        let mut out = String::new();
        let stats = substitute(&index, &mut ChunkedSource::new(&input, step), &mut out, &windows)
            .unwrap();

        let expected = naive_substitute(&model, &chars(&input));
        prop_assert_eq!(&out, &expected);
        prop_assert_eq!(stats.chars_written, expected.chars().count() as u64);
        prop_assert_eq!(stats.chars_read, input.chars().count() as u64);
    }

    #[test]
    fn prop_window_size_does_not_change_output(
        pairs in prop::collection::vec(("[ab]{1,4}", "[xyz]{0,3}"), 0..8),
        input in "[abx]{0,60}",
        step in 1usize..7,
    ) {
        let (index, _) = build(&pairs);
        let mut small = String::new();
        substitute(
            &index,
            &mut ChunkedSource::new(&input, step),
            &mut small,
            &WindowConfig { input_window: 1, output_window: 1 },
        )
        .unwrap();
        let mut large = String::new();
        substitute(
            &index,
            &mut ChunkedSource::new(&input, 64),
            &mut large,
            &WindowConfig::default(),
        )
        .unwrap();
        prop_assert_eq!(small, large);
    }
}
