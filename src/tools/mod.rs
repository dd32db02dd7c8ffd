//! 工具模块集合
//!
//! 包含CLI、图驱动、格式化等工具模块，支持main.rs的流程控制。

pub mod cli;
pub mod constants;
pub mod formatter;
pub mod processor;
pub mod utils;

// 重新导出主要的公共接口
pub use cli::{AppConfig, parse_args, parse_args_from, show_startup_info};
pub use formatter::{
    create_output_header, format_json_report, format_text_report, render_report, write_output,
};
pub use processor::{AnalysisOutput, GraphDriver, analyze_files};
pub use utils::{path, time};
