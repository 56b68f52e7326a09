//! Weighted-random output resolution for one completed cycle.

use crate::fixed::{Fixed64, percent};
use crate::item::ItemStack;
use crate::recipe::{RecipeCandidate, RecipeDescriptor};
use crate::rng::SimRng;

/// Acceptance threshold for a candidate after adding the luck bonus,
/// clamped to `[0, 1]`.
pub fn acceptance_probability(candidate: &RecipeCandidate, luck_percent: u32) -> Fixed64 {
    candidate
        .probability
        .saturating_add(percent(luck_percent))
        .clamp(Fixed64::ZERO, Fixed64::ONE)
}

/// Draw the concrete outputs for a cycle of `recipe`.
///
/// An unlimited (creative) station returns every candidate without rolling.
/// Otherwise candidates are shuffled and each is rolled independently until
/// `max_drops` have been accepted.
pub fn resolve_outputs(
    recipe: &RecipeDescriptor,
    luck_percent: u32,
    unlimited: bool,
    rng: &mut SimRng,
) -> Vec<ItemStack> {
    if unlimited {
        return recipe.candidates.iter().map(to_stack).collect();
    }

    let mut order: Vec<&RecipeCandidate> = recipe.candidates.iter().collect();
    rng.shuffle(&mut order);

    let cap = recipe.max_drops as usize;
    let mut accepted = Vec::new();
    for candidate in order {
        if accepted.len() >= cap {
            break;
        }
        if rng.roll_at_most(acceptance_probability(candidate, luck_percent)) {
            accepted.push(to_stack(candidate));
        }
    }
    accepted
}

fn to_stack(candidate: &RecipeCandidate) -> ItemStack {
    ItemStack::new(candidate.item_type, candidate.quantity)
}
