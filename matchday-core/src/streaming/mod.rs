pub mod detector;
pub mod platforms;
pub mod rules;

pub use detector::{
    merge_streaming, DeviceRegistry, StaticDeviceRegistry, StreamingCandidate, StreamingDetector,
    StreamingDevice, StreamingError, StreamingResult,
};
pub use platforms::{PlatformCatalog, PlatformId, StreamingPlatform, DEFAULT_STREAMING_INPUTS};
pub use rules::{classify, default_rules, PlatformRule};
