//! Outbound sync adapters.

mod http;
mod recording;

pub use http::{HttpCancellationSink, HttpSyncEndpoint};
pub use recording::{RecordingCancellationSink, RecordingSyncEndpoint};
