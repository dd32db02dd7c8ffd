//! 切片执行器
//!
//! 阻塞式 fan-out / join：把每个累加器切片交给一个工作单元，全部完成后才返回。
//! 默认实现基于rayon线程池，另提供串行实现用于单线程宿主和测试。

use crate::core::AccumulatorSlice;
use crate::error::{AudioError, AudioResult};
use rayon::prelude::*;

/// 作用于单个切片的工作函数
pub type SliceJob<'f> = dyn Fn(&mut AccumulatorSlice<'_>) + Sync + 'f;

/// 并行切片执行器
pub trait SliceExecutor: Send + Sync {
    /// 可用的工作单元数
    fn available_workers(&self) -> usize;

    /// 对每个切片执行 `job`，全部完成后返回
    fn execute(&self, slices: &mut [AccumulatorSlice<'_>], job: &SliceJob<'_>);
}

/// 基于rayon线程池的执行器
pub struct RayonExecutor {
    pool: rayon::ThreadPool,
}

impl RayonExecutor {
    /// 创建自定义线程池（`threads` 为空时使用rayon默认线程数）
    pub fn new(threads: Option<usize>) -> AudioResult<Self> {
        let mut builder =
            rayon::ThreadPoolBuilder::new().thread_name(|i| format!("sdr-slice-{i}"));
        if let Some(n) = threads {
            builder = builder.num_threads(n.max(1));
        }
        let pool = builder
            .build()
            .map_err(|e| AudioError::ResourceError(format!("线程池创建失败: {e}")))?;

        log::debug!("切片线程池就绪: {} 线程", pool.current_num_threads());
        Ok(Self { pool })
    }
}

impl SliceExecutor for RayonExecutor {
    fn available_workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    fn execute(&self, slices: &mut [AccumulatorSlice<'_>], job: &SliceJob<'_>) {
        if slices.len() == 1 {
            job(&mut slices[0]);
            return;
        }
        self.pool
            .install(|| slices.par_iter_mut().for_each(|slice| job(slice)));
    }
}

/// 串行执行器（按切片顺序逐个执行）
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialExecutor;

impl SliceExecutor for SerialExecutor {
    fn available_workers(&self) -> usize {
        1
    }

    fn execute(&self, slices: &mut [AccumulatorSlice<'_>], job: &SliceJob<'_>) {
        slices.iter_mut().for_each(|slice| job(slice));
    }
}
