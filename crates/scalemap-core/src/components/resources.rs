//! Resource kinds and per-tile resource ledgers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    // Extraction outputs
    Ore,
    Ice,
    Hydrogen,
    Silicates,

    // Processing outputs
    Iron,
    Water,
    Fuel,
    Electronics,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 8] = [
        ResourceKind::Ore,
        ResourceKind::Ice,
        ResourceKind::Hydrogen,
        ResourceKind::Silicates,
        ResourceKind::Iron,
        ResourceKind::Water,
        ResourceKind::Fuel,
        ResourceKind::Electronics,
    ];

    /// Raw kinds that extraction buildings pull out of terrain
    pub const RAW: [ResourceKind; 4] = [
        ResourceKind::Ore,
        ResourceKind::Ice,
        ResourceKind::Hydrogen,
        ResourceKind::Silicates,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ResourceKind::Ore => "ore",
            ResourceKind::Ice => "ice",
            ResourceKind::Hydrogen => "hydrogen",
            ResourceKind::Silicates => "silicates",
            ResourceKind::Iron => "iron",
            ResourceKind::Water => "water",
            ResourceKind::Fuel => "fuel",
            ResourceKind::Electronics => "electronics",
        }
    }

    /// What a raw kind is usually refined into
    pub fn refined(&self) -> Option<ResourceKind> {
        match self {
            ResourceKind::Ore => Some(ResourceKind::Iron),
            ResourceKind::Ice => Some(ResourceKind::Water),
            ResourceKind::Hydrogen => Some(ResourceKind::Fuel),
            ResourceKind::Silicates => Some(ResourceKind::Electronics),
            _ => None,
        }
    }
}

/// Mapping from resource kind to a non-negative quantity.
///
/// Kinds that are not stored read as zero. Every mutation clamps at zero,
/// so a ledger can never hold a negative quantity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ledger {
    amounts: BTreeMap<ResourceKind, f64>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored quantity, zero for kinds never set
    pub fn get(&self, kind: ResourceKind) -> f64 {
        self.amounts.get(&kind).copied().unwrap_or(0.0)
    }

    /// Add `amount` (which may be negative) and return the amount actually applied.
    pub fn add(&mut self, kind: ResourceKind, amount: f64) -> f64 {
        if amount < 0.0 {
            return -self.take(kind, -amount);
        }
        if amount > 0.0 {
            let current = self.get(kind);
            self.set(kind, current + amount);
            amount
        } else {
            0.0
        }
    }

    /// Remove up to `amount`, returning what was actually removed.
    pub fn take(&mut self, kind: ResourceKind, amount: f64) -> f64 {
        if amount <= 0.0 {
            return 0.0;
        }
        let current = self.get(kind);
        let removed = amount.min(current);
        self.set(kind, current - removed);
        removed
    }

    /// Add every entry of `other` into this ledger
    pub fn merge_in(&mut self, other: &Ledger) {
        for (kind, amount) in other.iter() {
            self.add(kind, amount);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (ResourceKind, f64)> + '_ {
        self.amounts.iter().map(|(kind, amount)| (*kind, *amount))
    }

    /// Sum over all kinds
    pub fn total(&self) -> f64 {
        self.amounts.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.amounts.is_empty()
    }

    /// Compare against another ledger with an absolute tolerance per kind.
    pub fn approx_eq(&self, other: &Ledger, tolerance: f64) -> bool {
        ResourceKind::ALL
            .iter()
            .all(|kind| (self.get(*kind) - other.get(*kind)).abs() <= tolerance)
    }

    fn set(&mut self, kind: ResourceKind, amount: f64) {
        if amount > 0.0 {
            self.amounts.insert(kind, amount);
        } else {
            self.amounts.remove(&kind);
        }
    }
}

impl FromIterator<(ResourceKind, f64)> for Ledger {
    fn from_iter<I: IntoIterator<Item = (ResourceKind, f64)>>(iter: I) -> Self {
        let mut ledger = Ledger::new();
        for (kind, amount) in iter {
            ledger.add(kind, amount);
        }
        ledger
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_kind_reads_zero() {
        let ledger = Ledger::new();
        assert_eq!(ledger.get(ResourceKind::Ore), 0.0);
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_add_and_clamp() {
        let mut ledger = Ledger::new();
        assert_eq!(ledger.add(ResourceKind::Ore, 10.0), 10.0);
        assert_eq!(ledger.add(ResourceKind::Ore, -4.0), -4.0);
        assert_eq!(ledger.get(ResourceKind::Ore), 6.0);

        // Only 6 left, so only 6 is applied
        assert_eq!(ledger.add(ResourceKind::Ore, -20.0), -6.0);
        assert_eq!(ledger.get(ResourceKind::Ore), 0.0);
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_take_reports_removed() {
        let mut ledger: Ledger = [(ResourceKind::Ice, 3.0)].into_iter().collect();
        assert_eq!(ledger.take(ResourceKind::Ice, 5.0), 3.0);
        assert_eq!(ledger.take(ResourceKind::Ice, 1.0), 0.0);
        assert_eq!(ledger.take(ResourceKind::Water, -1.0), 0.0);
    }

    #[test]
    fn test_merge_in() {
        let mut a: Ledger = [(ResourceKind::Ore, 1.0), (ResourceKind::Fuel, 2.0)]
            .into_iter()
            .collect();
        let b: Ledger = [(ResourceKind::Ore, 4.0), (ResourceKind::Water, 0.5)]
            .into_iter()
            .collect();
        a.merge_in(&b);
        assert_eq!(a.get(ResourceKind::Ore), 5.0);
        assert_eq!(a.get(ResourceKind::Fuel), 2.0);
        assert_eq!(a.get(ResourceKind::Water), 0.5);
        assert!((a.total() - 7.5).abs() < 1e-12);
    }

    #[test]
    fn test_approx_eq() {
        let a: Ledger = [(ResourceKind::Iron, 1.0)].into_iter().collect();
        let b: Ledger = [(ResourceKind::Iron, 1.0 + 1e-12)].into_iter().collect();
        assert!(a.approx_eq(&b, 1e-9));
        assert!(!a.approx_eq(&Ledger::new(), 1e-9));
    }

    #[test]
    fn test_refined_kinds() {
        for raw in ResourceKind::RAW {
            assert!(raw.refined().is_some());
        }
        assert_eq!(ResourceKind::Iron.refined(), None);
    }
}
