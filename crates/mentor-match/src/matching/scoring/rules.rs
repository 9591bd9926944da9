use std::collections::BTreeSet;

use super::super::domain::{DemandProfile, ScoreComponents, SupplyProfile};
use super::weights::ScoreWeights;

/// Lower-cased word tokens, splitting on anything that is not a letter, digit, or underscore.
pub(crate) fn tokenize(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Jaccard similarity of two token sets; an empty union scores zero.
pub fn jaccard(left: &BTreeSet<String>, right: &BTreeSet<String>) -> f64 {
    let union = left.union(right).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = left.intersection(right).count();
    intersection as f64 / union as f64
}

pub(crate) fn interest_overlap(demand: &str, supply: &str) -> f64 {
    jaccard(&tokenize(demand), &tokenize(supply))
}

fn indicator(matched: bool) -> f64 {
    if matched {
        1.0
    } else {
        0.0
    }
}

fn same_ignoring_case(left: &str, right: &str) -> bool {
    left.trim().to_lowercase() == right.trim().to_lowercase()
}

pub(crate) fn score_components(
    demand: &DemandProfile,
    supply: &SupplyProfile,
    weights: &ScoreWeights,
) -> ScoreComponents {
    // category and level compare exactly; location and language ignore case
    ScoreComponents {
        category: weights.category * indicator(demand.category == supply.category),
        level: weights.level * indicator(demand.level == supply.level),
        interests: weights.interests * interest_overlap(&demand.interests, &supply.expertise),
        location: weights.location
            * indicator(same_ignoring_case(&demand.location, &supply.location)),
        language: weights.language
            * indicator(same_ignoring_case(&demand.language, &supply.language)),
    }
}

pub(crate) fn round_points(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
