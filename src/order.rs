//! Playback order of a resolved catalog.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Order {
    #[default]
    Default,
    Reverse,
    Shuffle,
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => write!(f, "default"),
            Self::Reverse => write!(f, "reverse"),
            Self::Shuffle => write!(f, "shuffle"),
        }
    }
}

impl FromStr for Order {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "default" => Ok(Self::Default),
            "reverse" => Ok(Self::Reverse),
            "shuffle" => Ok(Self::Shuffle),
            _ => Err(Error::invalid_argument(format!("unknown order: {s}"))),
        }
    }
}

/// Reorders `items`, shuffling with a freshly seeded generator.
#[must_use]
pub fn apply<T>(items: Vec<T>, order: Order) -> Vec<T> {
    apply_with_rng(items, order, &mut fastrand::Rng::new())
}

/// Reorders `items`, shuffling with `rng`.
#[must_use]
pub fn apply_with_rng<T>(mut items: Vec<T>, order: Order, rng: &mut fastrand::Rng) -> Vec<T> {
    match order {
        Order::Default => {}
        Order::Reverse => items.reverse(),
        // Fisher-Yates, uniform over all permutations.
        Order::Shuffle => rng.shuffle(&mut items),
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_identity() {
        let items: Vec<u32> = (0..10).collect();
        assert_eq!(apply(items.clone(), Order::Default), items);
    }

    #[test]
    fn reverse_twice_is_identity() {
        let items: Vec<u32> = (0..30).collect();
        let reversed = apply(items.clone(), Order::Reverse);
        assert_eq!(reversed.first(), Some(&29));
        assert_eq!(apply(reversed, Order::Reverse), items);
    }

    #[test]
    fn shuffle_preserves_items() {
        for len in [0, 1, 2, 30, 257] {
            let items: Vec<u32> = (0..len).collect();
            let mut shuffled = apply(items.clone(), Order::Shuffle);
            assert_eq!(shuffled.len(), items.len());
            shuffled.sort_unstable();
            assert_eq!(shuffled, items);
        }
    }

    #[test]
    fn seeded_shuffle_is_reproducible() {
        let items: Vec<u32> = (0..50).collect();
        let first = apply_with_rng(items.clone(), Order::Shuffle, &mut fastrand::Rng::with_seed(7));
        let second = apply_with_rng(items.clone(), Order::Shuffle, &mut fastrand::Rng::with_seed(7));
        assert_eq!(first, second);
        assert_ne!(first, items);
    }

    #[test]
    fn parses_and_displays() {
        for order in [Order::Default, Order::Reverse, Order::Shuffle] {
            assert_eq!(order.to_string().parse::<Order>().unwrap(), order);
        }
        assert!("random".parse::<Order>().is_err());
    }
}
