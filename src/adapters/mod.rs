// Adapters - External system implementations

pub mod exec_ffmpeg;
pub mod probe_ffprobe;
pub mod process_signal;
// Test support only, see module docs
pub mod scripted;
pub mod toml_config;
pub mod tracing_log;

// Re-export adapters
pub use exec_ffmpeg::FfmpegAdapter;
pub use probe_ffprobe::FfprobeAdapter;
pub use toml_config::RecodeConfig;
pub use tracing_log::init_tracing;
