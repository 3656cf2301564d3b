//! Per-mode policies layered on the chunk scheduler.
//!
//! A policy decides what happens to each operation result and what shape the
//! accumulated output takes. The scheduler itself never looks inside the
//! accumulator; it only asks the policy for an empty one and folds results
//! into it in source order.

use serde::{Deserialize, Serialize};

/// The four iteration modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    /// Collect `operation(element)` for every element.
    #[serde(rename = "map")]
    Transform,
    /// Collect the elements for which `operation(element)` is `true`.
    #[serde(rename = "filter")]
    Select,
    /// Call `operation(element)` for its side effect only.
    #[serde(rename = "for_each")]
    Visit,
    /// `true` iff `operation(element)` is `true` for every element.
    #[serde(rename = "every")]
    AllSatisfy,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transform => write!(f, "map"),
            Self::Select => write!(f, "filter"),
            Self::Visit => write!(f, "for_each"),
            Self::AllSatisfy => write!(f, "every"),
        }
    }
}

/// Whether the run should keep going after folding an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fold {
    Continue,
    /// The output is final; no further elements need to be visited.
    Finish,
}

/// Folds operation results of type `V` for elements of type `T`.
pub trait Policy<T, V> {
    /// Accumulated result handed to `on_complete`.
    type Output;

    const MODE: Mode;

    /// Neutral accumulator a run starts from.
    fn empty() -> Self::Output;

    /// Fold one element's result into the accumulator.
    fn fold(acc: &mut Self::Output, element: &T, value: V) -> Fold;
}

/// `map`: append every result.
#[derive(Debug, Clone, Copy, Default)]
pub struct Transform;

impl<T, V> Policy<T, V> for Transform {
    type Output = Vec<V>;
    const MODE: Mode = Mode::Transform;

    fn empty() -> Vec<V> {
        Vec::new()
    }

    fn fold(acc: &mut Vec<V>, _element: &T, value: V) -> Fold {
        acc.push(value);
        Fold::Continue
    }
}

/// `filter`: append the element itself when the predicate holds.
#[derive(Debug, Clone, Copy, Default)]
pub struct Select;

impl<T: Clone> Policy<T, bool> for Select {
    type Output = Vec<T>;
    const MODE: Mode = Mode::Select;

    fn empty() -> Vec<T> {
        Vec::new()
    }

    fn fold(acc: &mut Vec<T>, element: &T, keep: bool) -> Fold {
        if keep {
            acc.push(element.clone());
        }
        Fold::Continue
    }
}

/// `for_each`: nothing is accumulated.
#[derive(Debug, Clone, Copy, Default)]
pub struct Visit;

impl<T> Policy<T, ()> for Visit {
    type Output = ();
    const MODE: Mode = Mode::Visit;

    fn empty() {}

    fn fold(_acc: &mut (), _element: &T, _value: ()) -> Fold {
        Fold::Continue
    }
}

/// `every`: short-circuits at the first element that fails the predicate.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllSatisfy;

impl<T> Policy<T, bool> for AllSatisfy {
    type Output = bool;
    const MODE: Mode = Mode::AllSatisfy;

    fn empty() -> bool {
        true
    }

    fn fold(acc: &mut bool, _element: &T, ok: bool) -> Fold {
        if ok {
            Fold::Continue
        } else {
            *acc = false;
            Fold::Finish
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fold_all<P, T, V>(items: &[T], f: impl Fn(&T) -> V) -> P::Output
    where
        P: Policy<T, V>,
    {
        let mut acc = P::empty();
        for item in items {
            if P::fold(&mut acc, item, f(item)) == Fold::Finish {
                break;
            }
        }
        acc
    }

    #[test]
    fn transform_appends_results() {
        let out = fold_all::<Transform, _, _>(&[1, 2, 3], |x| x * 10);
        assert_eq!(out, vec![10, 20, 30]);
    }

    #[test]
    fn select_keeps_matching_elements() {
        let out = fold_all::<Select, _, _>(&[1, 2, 3, 4], |x| x % 2 == 0);
        assert_eq!(out, vec![2, 4]);
    }

    #[test]
    fn all_satisfy_finishes_on_first_failure() {
        let mut acc = <AllSatisfy as Policy<i32, bool>>::empty();
        assert!(acc);
        assert_eq!(AllSatisfy::fold(&mut acc, &1, true), Fold::Continue);
        assert_eq!(AllSatisfy::fold(&mut acc, &2, false), Fold::Finish);
        assert!(!acc);
    }

    #[test]
    fn mode_names() {
        assert_eq!(Mode::Transform.to_string(), "map");
        assert_eq!(Mode::Select.to_string(), "filter");
        assert_eq!(Mode::Visit.to_string(), "for_each");
        assert_eq!(Mode::AllSatisfy.to_string(), "every");
        assert_eq!(serde_json::to_string(&Mode::AllSatisfy).unwrap(), "\"every\"");
    }
}
