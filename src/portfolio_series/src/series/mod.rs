//! The series pipeline: normalize timestamps, rebuild the cash ledger, align
//! everything on one axis, then compose a chart descriptor.

pub mod align;
pub mod compose;
pub mod ledger;
pub mod timestamp;
