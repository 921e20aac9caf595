// ── Domain model ──
//
// Canonical facility types. The poller owns the records; observers and
// the presentation layer only ever see clones.

pub mod facility;
pub mod quantity;
pub mod snapshot;

pub use facility::{Facility, FacilityDescription, FacilityStatus};
pub use quantity::{Change, ObservedValue, Quantity};
pub use snapshot::{HotWater, Measurement, Room, Snapshot, Zone};
