//! 核心算法模块
//!
//! 包含SDR累加器、声道切片划分和结果计算。

pub mod accumulator;
pub mod partition;
pub mod sdr_result;

// 重新导出公共接口
pub use accumulator::{AccumulatorSlice, SdrAccumulator};
pub use partition::{effective_slices, slice_range, slice_ranges};
pub use sdr_result::{SdrResult, format_db, sdr_db};
