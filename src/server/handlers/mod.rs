pub mod ai;
pub mod currencies;
pub mod origins;
pub mod search;
pub mod tasting_notes;
pub mod varietals;
