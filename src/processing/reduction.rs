//! 并行归约引擎
//!
//! 对一对对齐块（参考 u，失真 v）计算每声道：
//! - sum_u  = Σ u[ch][n]²
//! - sum_uv = Σ (u[ch][n] − v[ch][n])²
//!
//! 并累加到整个流生命周期的累加器中。声道按切片划分给执行器的工作单元，
//! 各切片独占自己的声道范围，因此无需加锁。
//!
//! 样本宽度（f32 / f64）在配置时选定为单态化内核，内层循环中没有类型分支。

use super::executor::SliceExecutor;
use crate::audio::{AudioFrame, PlanarSample, SampleFormat};
use crate::core::{AccumulatorSlice, SdrAccumulator, effective_slices};
use crate::error::{self, AudioResult};
use std::sync::Arc;

/// 单声道平方和与误差平方和（f64累积）
#[inline]
pub fn channel_sums<T: PlanarSample>(u: &[T], v: &[T]) -> (f64, f64) {
    let mut sum_u = 0.0f64;
    let mut sum_uv = 0.0f64;
    for (&us, &vs) in u.iter().zip(v) {
        let us = us.to_f64();
        let diff = us - vs.to_f64();
        sum_u += us * us;
        sum_uv += diff * diff;
    }
    (sum_u, sum_uv)
}

/// 对一个切片覆盖的声道做归约
pub fn reduce_slice<T: PlanarSample>(
    u: &[Vec<T>],
    v: &[Vec<T>],
    slice: &mut AccumulatorSlice<'_>,
) {
    for ch in slice.range() {
        let (sum_u, sum_uv) = channel_sums(&u[ch], &v[ch]);
        slice.add(ch, sum_u, sum_uv);
    }
}

fn reduce_frames<T: PlanarSample>(u: &AudioFrame, v: &AudioFrame, slice: &mut AccumulatorSlice<'_>) {
    let (Some(up), Some(vp)) = (u.planes::<T>(), v.planes::<T>()) else {
        debug_assert!(false, "块样本表示与内核不一致");
        return;
    };
    reduce_slice(up, vp, slice);
}

type KernelFn = fn(&AudioFrame, &AudioFrame, &mut AccumulatorSlice<'_>);

/// 按样本表示选定的归约内核
#[derive(Clone, Copy)]
pub struct ReductionKernel {
    format: SampleFormat,
    run: KernelFn,
}

impl std::fmt::Debug for ReductionKernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReductionKernel")
            .field("format", &self.format)
            .finish()
    }
}

impl ReductionKernel {
    /// 根据协商的样本表示选择内核
    pub fn for_format(format: SampleFormat) -> AudioResult<Self> {
        match format {
            SampleFormat::F32Planar => Ok(Self::monomorphized::<f32>()),
            SampleFormat::F64Planar => Ok(Self::monomorphized::<f64>()),
            other => Err(error::format_error(
                "不支持的样本格式",
                format!("{other}（仅支持 fltp / dblp）"),
            )),
        }
    }

    fn monomorphized<T: PlanarSample>() -> Self {
        Self {
            format: T::FORMAT,
            run: reduce_frames::<T>,
        }
    }

    #[inline]
    pub fn format(&self) -> SampleFormat {
        self.format
    }

    #[inline]
    pub fn apply(&self, u: &AudioFrame, v: &AudioFrame, slice: &mut AccumulatorSlice<'_>) {
        (self.run)(u, v, slice)
    }
}

/// 并行归约引擎
pub struct ParallelReducer {
    kernel: ReductionKernel,
    executor: Arc<dyn SliceExecutor>,
    max_slices: Option<usize>,
}

impl ParallelReducer {
    pub fn new(
        kernel: ReductionKernel,
        executor: Arc<dyn SliceExecutor>,
        max_slices: Option<usize>,
    ) -> Self {
        Self {
            kernel,
            executor,
            max_slices,
        }
    }

    /// 实际切片数：`min(C, 可用工作单元, max_slices)`
    pub fn nb_slices(&self, channels: usize) -> usize {
        let workers = self.executor.available_workers();
        let workers = self.max_slices.map_or(workers, |m| workers.min(m));
        effective_slices(channels, workers)
    }

    /// 对一对对齐块做归约，返回使用的切片数
    ///
    /// 阻塞直到所有切片完成。
    pub fn reduce(
        &self,
        u: &AudioFrame,
        v: &AudioFrame,
        accumulator: &mut SdrAccumulator,
    ) -> AudioResult<usize> {
        if !u.is_aligned_with(v) {
            return Err(error::calculation_error(
                "参考块与失真块未对齐",
                format!(
                    "{}样本/{}ch/{} vs {}样本/{}ch/{}",
                    u.nb_samples(),
                    u.channels(),
                    u.format(),
                    v.nb_samples(),
                    v.channels(),
                    v.format()
                ),
            ));
        }
        if u.format() != self.kernel.format {
            return Err(error::format_error(
                "块样本表示与配置不一致",
                format!("{} != {}", u.format(), self.kernel.format),
            ));
        }
        if u.channels() != accumulator.channels() {
            return Err(error::calculation_error(
                "块声道数与累加器不一致",
                format!("{} != {}", u.channels(), accumulator.channels()),
            ));
        }

        let nb_slices = self.nb_slices(accumulator.channels());
        let kernel = self.kernel;
        let mut slices = accumulator.split_slices(nb_slices);
        self.executor
            .execute(&mut slices, &|slice| kernel.apply(u, v, slice));

        Ok(nb_slices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::executor::{RayonExecutor, SerialExecutor};

    fn reducer(format: SampleFormat, executor: Arc<dyn SliceExecutor>) -> ParallelReducer {
        ParallelReducer::new(ReductionKernel::for_format(format).unwrap(), executor, None)
    }

    #[test]
    fn test_channel_sums() {
        let (su, suv) = channel_sums(&[1.0f32, 1.0, 1.0, 1.0], &[1.0f32, 1.0, 1.0, 0.0]);
        assert_eq!(su, 4.0);
        assert_eq!(suv, 1.0);
    }

    #[test]
    fn test_kernel_rejects_packed_format() {
        assert!(ReductionKernel::for_format(SampleFormat::S16).is_err());
        assert_eq!(
            ReductionKernel::for_format(SampleFormat::F64Planar)
                .unwrap()
                .format(),
            SampleFormat::F64Planar
        );
    }

    #[test]
    fn test_reduce_two_channel_scenario() {
        let u = AudioFrame::from_planes(0, vec![vec![1.0f32; 4], vec![2.0f32; 4]]).unwrap();
        let v = AudioFrame::from_planes(0, vec![vec![1.0f32, 1.0, 1.0, 0.0], vec![2.0f32; 4]])
            .unwrap();
        let mut acc = SdrAccumulator::try_new(2).unwrap();

        let r = reducer(SampleFormat::F32Planar, Arc::new(RayonExecutor::new(Some(2)).unwrap()));
        assert_eq!(r.reduce(&u, &v, &mut acc).unwrap(), 2);

        assert_eq!(acc.energy(), &[4.0, 16.0]);
        assert_eq!(acc.error(), &[1.0, 0.0]);
    }

    #[test]
    fn test_reduce_rejects_misaligned_frames() {
        let u = AudioFrame::silence(SampleFormat::F64Planar, 2, 4, 0);
        let v = AudioFrame::silence(SampleFormat::F64Planar, 2, 3, 0);
        let mut acc = SdrAccumulator::try_new(2).unwrap();
        let r = reducer(SampleFormat::F64Planar, Arc::new(SerialExecutor));
        assert!(r.reduce(&u, &v, &mut acc).is_err());
    }

    #[test]
    fn test_reduce_rejects_wrong_representation() {
        let u = AudioFrame::silence(SampleFormat::F64Planar, 1, 4, 0);
        let mut acc = SdrAccumulator::try_new(1).unwrap();
        let r = reducer(SampleFormat::F32Planar, Arc::new(SerialExecutor));
        assert!(r.reduce(&u, &u, &mut acc).is_err());
    }

    #[test]
    fn test_max_slices_caps_workers() {
        let executor: Arc<dyn SliceExecutor> = Arc::new(RayonExecutor::new(Some(8)).unwrap());
        let kernel = ReductionKernel::for_format(SampleFormat::F32Planar).unwrap();
        assert_eq!(ParallelReducer::new(kernel, executor.clone(), Some(3)).nb_slices(16), 3);
        assert_eq!(ParallelReducer::new(kernel, executor, None).nb_slices(2), 2);
    }
}
