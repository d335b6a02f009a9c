//! Pure device logic shared by both targets.

pub mod ads1115;
pub mod beacon;
