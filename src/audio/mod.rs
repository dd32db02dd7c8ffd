//! 音频数据与链路模块
//!
//! 平面音频块、链路格式、宿主链路契约及其内存实现，
//! 以及CLI使用的WAV帧源。

pub mod format;
pub mod frame;
pub mod link;
pub mod stats;
pub mod wav_source;

pub use format::{LinkProperties, SampleFormat};
pub use frame::{AudioFrame, PlanarSample, PlanarSamples};
pub use link::{FrameCollector, FrameQueue, InputPort, LinkStatus, OutputPort};
pub use stats::ChunkSizeStats;
pub use wav_source::{DecodedChunk, WavFrameSource, WavInfo};
