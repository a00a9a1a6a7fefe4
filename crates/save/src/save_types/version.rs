// ---------------------------------------------------------------------------
// Save file version constants
// ---------------------------------------------------------------------------

/// Current save document version.
/// v1 = untagged legacy saves (structures, resources, optional timestamp/playtime/tier)
/// v2 = explicit `version` tag, actor roster + `next_actor_id` counter
/// v3 = per-structure `work_slots` (sized from the structure type)
/// v4 = `zones` spatial regions (default zone around the origin)
/// v5 = `technology` progression block
pub const CURRENT_SAVE_VERSION: u32 = 5;

/// Oldest save version this build can still migrate.
pub const OLDEST_SUPPORTED_VERSION: u32 = 1;

/// First version that writes an explicit `version` field.
pub const EXPLICIT_TAG_SINCE: u32 = 2;

/// First version carrying the `actors` roster and `next_actor_id`.
pub const ACTORS_SINCE: u32 = 2;

/// First version where every structure carries `work_slots`.
pub const WORK_SLOTS_SINCE: u32 = 3;

/// First version carrying the `zones` block.
pub const ZONES_SINCE: u32 = 4;

/// First version carrying the `technology` block.
pub const TECHNOLOGY_SINCE: u32 = 5;
