//! 并行归约测试
//!
//! 验证切片划分性质以及rayon执行器与串行执行器结果一致。

use macinmeter_sdr_tool::audio::{AudioFrame, SampleFormat};
use macinmeter_sdr_tool::core::{SdrAccumulator, effective_slices, slice_ranges};
use macinmeter_sdr_tool::processing::{
    ParallelReducer, RayonExecutor, ReductionKernel, SerialExecutor, SliceExecutor,
};
use std::sync::Arc;

fn log(msg_zh: impl AsRef<str>, msg_en: impl AsRef<str>) {
    println!("{} / {}", msg_zh.as_ref(), msg_en.as_ref());
}

fn frame(channels: usize, len: usize, scale: f32) -> AudioFrame {
    let planes = (0..channels)
        .map(|ch| {
            (0..len)
                .map(|n| ((n * (ch + 1)) as f32 * 0.01 * scale).cos())
                .collect()
        })
        .collect();
    AudioFrame::from_planes(0, planes).unwrap()
}

#[test]
fn test_partition_covers_all_channels_for_any_worker_count() {
    for channels in 1..=40 {
        for workers in 1..=48 {
            let nb = effective_slices(channels, workers);
            assert!(nb <= channels);
            let ranges = slice_ranges(channels, nb);
            let flat: Vec<usize> = ranges.iter().flat_map(|r| r.clone()).collect();
            assert_eq!(flat, (0..channels).collect::<Vec<_>>());
            assert!(ranges.iter().all(|r| !r.is_empty()));
        }
    }

    log("切片恰好覆盖所有声道", "Slices cover every channel exactly once");
}

#[test]
fn test_rayon_matches_serial_bit_for_bit() {
    let kernel = ReductionKernel::for_format(SampleFormat::F32Planar).unwrap();
    let rayon: Arc<dyn SliceExecutor> = Arc::new(RayonExecutor::new(Some(4)).unwrap());
    let serial: Arc<dyn SliceExecutor> = Arc::new(SerialExecutor);

    let parallel = ParallelReducer::new(kernel, rayon, None);
    let sequential = ParallelReducer::new(kernel, serial, None);
    assert_eq!(parallel.nb_slices(7), 4);
    assert_eq!(sequential.nb_slices(7), 1);

    let u = frame(7, 1500, 1.0);
    let v = frame(7, 1500, 1.01);
    let mut acc_parallel = SdrAccumulator::try_new(7).unwrap();
    let mut acc_serial = SdrAccumulator::try_new(7).unwrap();

    for _ in 0..3 {
        assert_eq!(parallel.reduce(&u, &v, &mut acc_parallel).unwrap(), 4);
        sequential.reduce(&u, &v, &mut acc_serial).unwrap();
    }

    assert_eq!(acc_parallel, acc_serial);
    log("并行与串行结果逐位一致", "Parallel and serial results are identical");
}

#[test]
fn test_max_slices_caps_parallelism() {
    let kernel = ReductionKernel::for_format(SampleFormat::F64Planar).unwrap();
    let executor: Arc<dyn SliceExecutor> = Arc::new(RayonExecutor::new(Some(8)).unwrap());
    let reducer = ParallelReducer::new(kernel, executor, Some(2));

    assert_eq!(reducer.nb_slices(16), 2);
    assert_eq!(reducer.nb_slices(1), 1);

    log("max_slices限制切片数", "max_slices caps the slice count");
}

#[test]
fn test_more_workers_than_channels() {
    let kernel = ReductionKernel::for_format(SampleFormat::F32Planar).unwrap();
    let executor: Arc<dyn SliceExecutor> = Arc::new(RayonExecutor::new(Some(8)).unwrap());
    let reducer = ParallelReducer::new(kernel, executor, None);

    let u = frame(2, 64, 1.0);
    let mut acc = SdrAccumulator::try_new(2).unwrap();
    assert_eq!(reducer.reduce(&u, &u, &mut acc).unwrap(), 2);
    assert!(acc.error().iter().all(|&e| e == 0.0));
    assert!(acc.energy().iter().all(|&e| e > 0.0));

    log("工作单元多于声道时不产生空切片", "No empty slices when workers exceed channels");
}
