// ---------------------------------------------------------------------------
// Enumerated value sets and lookup tables used by migration and validation
// ---------------------------------------------------------------------------

/// Every structure type a save may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StructureKind {
    Wall,
    House,
    Farm,
    Workshop,
    Storehouse,
    Well,
    Tower,
    Market,
}

impl StructureKind {
    pub const ALL: [StructureKind; 8] = [
        StructureKind::Wall,
        StructureKind::House,
        StructureKind::Farm,
        StructureKind::Workshop,
        StructureKind::Storehouse,
        StructureKind::Well,
        StructureKind::Tower,
        StructureKind::Market,
    ];

    /// Tag as written in save documents.
    pub fn tag(self) -> &'static str {
        match self {
            StructureKind::Wall => "WALL",
            StructureKind::House => "HOUSE",
            StructureKind::Farm => "FARM",
            StructureKind::Workshop => "WORKSHOP",
            StructureKind::Storehouse => "STOREHOUSE",
            StructureKind::Well => "WELL",
            StructureKind::Tower => "TOWER",
            StructureKind::Market => "MARKET",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }

    /// Number of worker slots a structure of this type exposes.
    pub fn work_slots(self) -> usize {
        match self {
            StructureKind::Wall | StructureKind::House | StructureKind::Well => 0,
            StructureKind::Tower => 1,
            StructureKind::Farm | StructureKind::Storehouse | StructureKind::Market => 2,
            StructureKind::Workshop => 3,
        }
    }
}

/// Construction states of a placed structure.
pub const STRUCTURE_STATUSES: [&str; 4] = ["PLANNED", "IN_PROGRESS", "COMPLETE", "DAMAGED"];

/// Roles an actor can hold.
pub const ACTOR_ROLES: [&str; 6] = ["IDLE", "BUILDER", "FARMER", "CRAFTER", "HAULER", "GUARD"];

/// Morale is a percentage.
pub const MORALE_RANGE: std::ops::RangeInclusive<f64> = 0.0..=100.0;

/// Radius of the default zone created for pre-zone saves, before it is
/// widened to cover the settlement's outermost structure.
pub const DEFAULT_ZONE_RADIUS: f64 = 16.0;

/// Growth ceiling of the default zone.
pub const DEFAULT_ZONE_MAX_RADIUS: f64 = 64.0;

/// Identifier of the zone created by the v3 -> v4 migration.
pub const DEFAULT_ZONE_ID: &str = "zone-0";

/// Technologies unlocked for free when a pre-technology save reaches
/// the technology block, by settlement tier.
pub fn starter_unlocks(tier: u64) -> &'static [&'static str] {
    match tier {
        0 | 1 => &["FORAGING"],
        2 => &["FORAGING", "MASONRY"],
        _ => &["FORAGING", "MASONRY", "CARPENTRY"],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_roundtrip() {
        for kind in StructureKind::ALL {
            assert_eq!(StructureKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(StructureKind::from_tag("CASTLE"), None);
        assert_eq!(StructureKind::from_tag("wall"), None);
    }

    #[test]
    fn test_starter_unlocks_grow_with_tier() {
        assert_eq!(starter_unlocks(1), &["FORAGING"]);
        assert!(starter_unlocks(3).len() > starter_unlocks(2).len());
        assert_eq!(starter_unlocks(7), starter_unlocks(3));
    }
}
