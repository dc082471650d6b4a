pub mod carrier;

pub use carrier::{CarrierInbound, CarrierOutbound, MarkPayload, MediaPayload};
