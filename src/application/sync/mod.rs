//! Outbound data synchronization.

mod data_synchronizer;

pub use data_synchronizer::{
    DataSynchronizer, EndpointOutcome, SyncReport, WATERMARK_OVERLAP_MINUTES,
};
