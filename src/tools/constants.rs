//! 常量和默认配置集中管理
//!
//! 将所有重要常量集中定义，避免"默认值漂移"和重复定义

/// 默认配置值
pub mod defaults {
    /// 默认块大小（每声道样本数）
    ///
    /// 两路输入可以使用不同的块大小，同步器只按两者排队量的最小值取样
    pub const CHUNK_SIZE: usize = 4096;

    /// 解码线程与驱动器之间的通道容量（块数）
    ///
    /// 通道满时解码线程阻塞，防止解码快于测量导致内存无限增长
    pub const SOURCE_CHANNEL_CAPACITY: usize = 8;
}

/// 并发度限制常量
pub mod parallel_limits {
    /// 最小并发度
    pub const MIN_PARALLEL_DEGREE: usize = 1;

    /// 最大并发度
    ///
    /// 切片数本身还受声道数限制，超过声道数的线程永远空闲
    pub const MAX_PARALLEL_DEGREE: usize = 64;
}

/// 应用信息
pub mod app_info {
    /// 报告标题行
    pub fn format_output_header(version: &str) -> String {
        format!("MacinMeter SDR Tool v{version} / Signal-to-Distortion Ratio Meter")
    }
}
