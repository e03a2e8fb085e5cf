// argus_core/src/lib.rs

//! Core of the Argus used-vehicle price referential: listing import, segment grouping,
//! outlier filtering, depreciation estimation, referential construction, persistence,
//! segment selection and mileage-adjusted pricing.

pub mod stats;
pub mod listing;
pub mod pricing;
pub mod storage;
pub mod grouping;
pub mod outliers;
pub mod metadata;
pub mod selector;
pub mod settings;
pub mod referential;
pub mod depreciation;
