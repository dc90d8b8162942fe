// ABOUTME: Shopping-list aggregation: group cart ingredient lines and render them
// ABOUTME: Pure read-and-transform code, kept free of storage and handler concerns

use std::collections::BTreeMap;

/// One (name, unit, quantity) row behind a recipe in the cart, as projected
/// by the storage layer. Several rows may carry the same (name, unit) pair
/// even when they come from different ingredient records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngredientLine {
    pub name: String,
    pub unit: String,
    pub quantity: i64,
}

/// A consolidated purchase-list entry: the summed quantity for one
/// (name, unit) group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingItem {
    pub name: String,
    pub unit: String,
    pub total: i64,
}

/// Groups ingredient lines by exact (name, unit) pair and sums quantities.
///
/// Grouping is by value, case-sensitive, with no trimming; ordering is
/// ascending by name with unit as the tie-break. The BTreeMap key carries
/// both, so the output order falls out of the map itself.
pub fn aggregate(lines: Vec<IngredientLine>) -> Vec<ShoppingItem> {
    let mut totals: BTreeMap<(String, String), i64> = BTreeMap::new();
    for line in lines {
        *totals.entry((line.name, line.unit)).or_insert(0) += line.quantity;
    }

    totals
        .into_iter()
        .map(|((name, unit), total)| ShoppingItem { name, unit, total })
        .collect()
}

/// Renders items as `"{name} ({unit}) — {total}"` lines joined with `\n`.
/// An empty list renders as an empty document.
pub fn render(items: &[ShoppingItem]) -> String {
    items
        .iter()
        .map(|item| format!("{} ({}) — {}", item.name, item.unit, item.total))
        .collect::<Vec<_>>()
        .join("\n")
}
