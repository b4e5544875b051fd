use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("depth map is empty")]
    EmptyDepthMap,

    #[error("invalid camera intrinsics: fx={fx}, fy={fy}, cx={cx}, cy={cy}")]
    InvalidIntrinsics { fx: f32, fy: f32, cx: f32, cy: f32 },

    #[error("invalid capture size {0}x{1}")]
    InvalidCaptureSize(u32, u32),

    #[error("Config Error: {0}")]
    ConfigError(#[from] serde_json::Error),

    #[error("IO Error: {0}")]
    IoError(#[from] std::io::Error),
}
