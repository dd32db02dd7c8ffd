//! 命令行接口模块
//!
//! 负责命令行参数解析、配置管理和程序信息展示。

use super::constants::{defaults, parallel_limits};
use crate::audio::SampleFormat;
use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use std::ffi::OsString;
use std::path::PathBuf;

/// 应用程序版本信息
const VERSION: &str = env!("CARGO_PKG_VERSION");
const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// 应用程序配置
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// 参考信号WAV
    pub reference_path: PathBuf,

    /// 失真信号WAV
    pub degraded_path: PathBuf,

    /// 链路样本表示（fltp / dblp）
    pub precision: SampleFormat,

    /// 参考流块大小（每声道样本数）
    pub reference_chunk: usize,

    /// 失真流块大小（每声道样本数）
    pub degraded_chunk: usize,

    /// 切片线程数（为空时使用rayon默认值）
    pub threads: Option<usize>,

    /// 管理性禁用：只透传不测量
    pub disabled: bool,

    /// 输出JSON报告
    pub json: bool,

    /// 是否显示详细信息
    pub verbose: bool,

    /// 输出文件路径（可选）
    pub output_path: Option<PathBuf>,
}

fn build_command() -> Command {
    Command::new("sdr-meter")
        .version(VERSION)
        .about(DESCRIPTION)
        .author("MacinMeter Team")
        .arg(
            Arg::new("REFERENCE")
                .help("参考信号WAV文件 / Reference WAV file")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .index(1),
        )
        .arg(
            Arg::new("DEGRADED")
                .help("失真/处理后信号WAV文件 / Degraded WAV file")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .index(2),
        )
        .arg(
            Arg::new("precision")
                .long("precision")
                .short('p')
                .help("链路样本精度 / Link sample precision")
                .value_parser(["f32", "f64"])
                .default_value("f32"),
        )
        .arg(
            Arg::new("chunk")
                .long("chunk")
                .help("两路共用的块大小（每声道样本数） / Chunk size for both inputs")
                .value_parser(value_parser!(usize))
                .value_name("SAMPLES"),
        )
        .arg(
            Arg::new("reference-chunk")
                .long("reference-chunk")
                .help("参考流块大小 / Reference chunk size")
                .value_parser(value_parser!(usize))
                .value_name("SAMPLES"),
        )
        .arg(
            Arg::new("degraded-chunk")
                .long("degraded-chunk")
                .help("失真流块大小 / Degraded chunk size")
                .value_parser(value_parser!(usize))
                .value_name("SAMPLES"),
        )
        .arg(
            Arg::new("threads")
                .long("threads")
                .short('j')
                .help("切片线程数 / Slice worker threads")
                .value_parser(value_parser!(usize))
                .value_name("N"),
        )
        .arg(
            Arg::new("disable")
                .long("disable")
                .help("只透传不测量 / Pass through without measuring")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("输出JSON报告 / Emit JSON report")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("显示详细处理信息 / Verbose output")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .help("输出结果到文件 / Write report to file")
                .value_parser(value_parser!(PathBuf))
                .value_name("FILE"),
        )
}

fn config_from_matches(matches: &ArgMatches) -> AppConfig {
    let precision = match matches.get_one::<String>("precision").map(String::as_str) {
        Some("f64") => SampleFormat::F64Planar,
        _ => SampleFormat::F32Planar,
    };

    let shared_chunk = matches
        .get_one::<usize>("chunk")
        .copied()
        .unwrap_or(defaults::CHUNK_SIZE);
    let chunk_for = |name: &str| {
        matches
            .get_one::<usize>(name)
            .copied()
            .unwrap_or(shared_chunk)
            .max(1)
    };

    let threads = matches.get_one::<usize>("threads").map(|&n| {
        n.clamp(
            parallel_limits::MIN_PARALLEL_DEGREE,
            parallel_limits::MAX_PARALLEL_DEGREE,
        )
    });

    AppConfig {
        reference_path: matches
            .get_one::<PathBuf>("REFERENCE")
            .cloned()
            .unwrap_or_default(),
        degraded_path: matches
            .get_one::<PathBuf>("DEGRADED")
            .cloned()
            .unwrap_or_default(),
        precision,
        reference_chunk: chunk_for("reference-chunk"),
        degraded_chunk: chunk_for("degraded-chunk"),
        threads,
        disabled: matches.get_flag("disable"),
        json: matches.get_flag("json"),
        verbose: matches.get_flag("verbose"),
        output_path: matches.get_one::<PathBuf>("output").cloned(),
    }
}

/// 解析命令行参数并创建配置（解析失败时由clap打印用法并退出）
pub fn parse_args() -> AppConfig {
    config_from_matches(&build_command().get_matches())
}

/// 从给定参数解析配置（便于测试）
pub fn parse_args_from<I, T>(args: I) -> Result<AppConfig, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = build_command().try_get_matches_from(args)?;
    Ok(config_from_matches(&matches))
}

/// 显示程序启动信息
pub fn show_startup_info(config: &AppConfig) {
    if config.json {
        return;
    }
    println!("MacinMeter SDR Tool v{VERSION} 启动");
    if config.verbose {
        println!(
            "   参考 / Reference: {} (块={})",
            config.reference_path.display(),
            config.reference_chunk
        );
        println!(
            "   失真 / Degraded:  {} (块={})",
            config.degraded_path.display(),
            config.degraded_chunk
        );
        println!("   精度 / Precision: {}", config.precision);
    }
    println!();
}
