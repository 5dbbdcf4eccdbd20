//! Pure selection logic: the daily free pick, the entitlement decision, and the
//! feed diversification pass. Nothing in here performs I/O; the helper layer
//! feeds these functions with data fetched from the catalog and viewer stores.

pub mod daily_pick;
pub mod entitlement;
pub mod feed;

pub use daily_pick::{
    date_seed_index, filter_eligible, is_eligible, pick_date, pick_date_today, select_daily_free,
};
pub use entitlement::{can_access, ViewerAccess};
pub use feed::{diversify, promote};
