//! 块大小统计模块
//!
//! 记录同步器每一步实际取出的对齐块大小（每声道样本数）。

use serde::Serialize;

/// 块大小统计信息
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkSizeStats {
    pub total_chunks: usize,
    pub min_size: usize,
    pub max_size: usize,
    pub mean_size: f64,
    pub total_samples: u64,
}

impl Default for ChunkSizeStats {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkSizeStats {
    pub fn new() -> Self {
        Self {
            total_chunks: 0,
            min_size: usize::MAX,
            max_size: 0,
            mean_size: 0.0,
            total_samples: 0,
        }
    }

    /// 添加一个对齐块的统计信息
    ///
    /// 使用饱和加法防止 total_samples 溢出
    pub fn add_chunk(&mut self, size: usize) {
        self.total_chunks += 1;
        self.total_samples = self.total_samples.saturating_add(size as u64);
        self.min_size = self.min_size.min(size);
        self.max_size = self.max_size.max(size);
    }

    /// 冻结统计快照（计算均值并修复空统计的边界值）
    pub fn finalize(&mut self) {
        if self.total_chunks > 0 {
            self.mean_size = self.total_samples as f64 / self.total_chunks as f64;
        }
        if self.min_size == usize::MAX {
            self.min_size = 0;
        }
    }

    /// 返回已冻结的副本，不影响继续累积
    pub fn snapshot(&self) -> Self {
        let mut copy = self.clone();
        copy.finalize();
        copy
    }
}
