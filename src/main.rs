//! MacinMeter SDR Tool - 主程序入口
//!
//! 纯流程控制器，负责协调各个工具模块完成SDR测量任务。

use anyhow::Context;
use macinmeter_sdr_tool::{
    error::{AudioError, ErrorCategory},
    tools::{self, AppConfig},
};
use std::process;

/// 错误退出码定义
mod exit_codes {
    /// 通用错误
    pub const GENERAL_ERROR: i32 = 1;
    /// 格式/输入错误
    pub const FORMAT_ERROR: i32 = 2;
    /// 解码失败
    pub const DECODING_ERROR: i32 = 3;
    /// 计算/内存错误
    pub const CALCULATION_ERROR: i32 = 4;
    /// 资源/并发错误
    pub const RESOURCE_ERROR: i32 = 5;
}

/// 获取错误建议文本
fn get_error_suggestion(error: &AudioError) -> &'static str {
    match error {
        AudioError::InvalidInput(_) => {
            "检查命令行参数是否正确，使用 --help 查看完整用法 / Check if command-line arguments are correct, use --help to see full usage"
        }
        AudioError::ResourceError(_) => {
            "资源不可用，请检查系统资源或重试；若持续失败请降低线程数（--threads 1） / Resource unavailable, retry or reduce threads (--threads 1)"
        }
        AudioError::OutOfMemory => {
            "内存不足，无法为声道分配累加器 / Out of memory while allocating per-channel accumulators"
        }
        _ => match ErrorCategory::from_audio_error(error) {
            ErrorCategory::Io => {
                "检查文件路径是否正确，文件是否存在且可读 / Check if file path is correct, file exists and is readable"
            }
            ErrorCategory::Format => {
                "两个WAV文件必须声道数与采样率一致 / Both WAV files must share channel count and sample rate"
            }
            ErrorCategory::Decoding => {
                "文件可能损坏或使用不支持的WAV编码 / File may be corrupted or use unsupported WAV encoding"
            }
            ErrorCategory::Calculation => {
                "计算过程出现异常，请检查音频文件是否包含有效数据 / Calculation error occurred, check if audio file contains valid data"
            }
            ErrorCategory::Stream => {
                "输入流在处理过程中失败 / An input stream failed during processing"
            }
            ErrorCategory::Other => {
                "请检查输入文件和参数设置 / Please check input file and parameter settings"
            }
        },
    }
}

/// 错误处理和建议
fn handle_error(error: anyhow::Error) -> ! {
    eprintln!("[ERROR] 错误 / Error: {error:#}");

    let Some(audio_error) = error.downcast_ref::<AudioError>() else {
        process::exit(exit_codes::GENERAL_ERROR);
    };

    let category = ErrorCategory::from_audio_error(audio_error);
    eprintln!(
        "[INFO] 建议 / Suggestion: {}",
        get_error_suggestion(audio_error)
    );
    if matches!(category, ErrorCategory::Format) {
        eprintln!("   Supported formats / 支持的格式: WAV (PCM 8/16/24/32, IEEE float 32)");
    }

    let exit_code = match audio_error {
        AudioError::InvalidInput(_) => exit_codes::FORMAT_ERROR,
        AudioError::ResourceError(_) => exit_codes::RESOURCE_ERROR,
        AudioError::OutOfMemory => exit_codes::CALCULATION_ERROR,
        _ => match category {
            ErrorCategory::Format => exit_codes::FORMAT_ERROR,
            ErrorCategory::Decoding => exit_codes::DECODING_ERROR,
            ErrorCategory::Calculation => exit_codes::CALCULATION_ERROR,
            ErrorCategory::Io | ErrorCategory::Stream | ErrorCategory::Other => {
                exit_codes::GENERAL_ERROR
            }
        },
    };

    process::exit(exit_code);
}

fn init_logging(config: &AppConfig) {
    let default_level = if config.verbose { "debug" } else { "warn" };
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_level),
    )
    .format_timestamp_millis()
    .try_init();
}

fn run(config: &AppConfig) -> anyhow::Result<()> {
    tools::show_startup_info(config);

    let output = tools::analyze_files(config).with_context(|| {
        format!(
            "测量失败 / Measurement failed: {} vs {}",
            config.reference_path.display(),
            config.degraded_path.display()
        )
    })?;

    if let Some(status) = &output.report.terminal_status
        && status != "EOF"
    {
        eprintln!("[WARNING] 输入流以错误终止 / Input terminated with error: {status}");
    }

    let text = tools::render_report(&output, config)?;
    tools::write_output(&text, config)?;
    Ok(())
}

fn main() {
    let config = tools::parse_args();
    init_logging(&config);

    if let Err(error) = run(&config) {
        handle_error(error);
    }
}
