/// Longest booking label (customer name / note) accepted.
pub const MAX_LABEL_LEN: usize = 512;

/// Break windows per service.
pub const MAX_BREAKS: usize = 64;

/// Upper bound on `staff_count + overbooking_limit`.
pub const MAX_CAPACITY_PER_SLOT: u32 = 10_000;

/// Days evaluated by a single range query.
pub const MAX_RANGE_DAYS: u32 = 62;
