pub mod transport;

pub use transport::{format_time, PlayOutcome, SymphoniaLoader, TrackLoader, Transport, TransportEvent};
