pub const MIN_CHANCE_HUNDREDTHS: u64 = 100;
pub const MAX_CHANCE_HUNDREDTHS: u64 = 8_000;

pub const ROLL_DECIMALS: i32 = 4;
pub const ANGLE_DECIMALS: i32 = 2;

// Presentation only: the wheel always spins at least BASE_TURNS full turns.
pub const BASE_TURNS: u32 = 6;
pub const MAX_EXTRA_TURNS: u32 = 3;

pub const SPIN_IN_PROGRESS_ERROR: &str = "A spin is already in progress.";
pub const INVALID_SELECTION_ERROR: &str = "Select valid items.";
pub const STALE_ITEMS_ERROR: &str = "Some items are no longer available.";
pub const SERVER_ERROR: &str = "Server error.";
