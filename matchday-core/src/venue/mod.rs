pub mod models;
pub mod provider;

pub use models::{ChannelCategory, DeviceType, Input, Output, SystemState, ZoneType};
pub use provider::{
    ProviderError, ProviderResult, SnapshotDocument, SnapshotFile, StateProvider,
};
