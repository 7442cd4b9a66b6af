//! Encoder command-line construction

use std::ffi::OsString;
use std::path::Path;

use crate::domain::model::{EncodeProfile, FilterChain};
use crate::ports::EncodeRequest;

/// Build the encoder invocation for one file.
///
/// Argument order is fixed: overwrite flag, input, codecs, bitrate, pixel
/// format, frame rate, container, metadata mapping, optional filter chain,
/// output path last.
pub fn build_request(
    input: &Path,
    output: &Path,
    profile: &EncodeProfile,
    filters: &FilterChain,
) -> EncodeRequest {
    let mut args: Vec<OsString> = vec!["-y".into(), "-i".into(), input.as_os_str().to_owned()];

    for (flag, value) in [
        ("-vcodec", &profile.video_codec),
        ("-acodec", &profile.audio_codec),
        ("-b:v", &profile.video_bitrate),
        ("-pix_fmt", &profile.pixel_format),
        ("-r", &profile.frame_rate),
        ("-f", &profile.container),
    ] {
        args.push(flag.into());
        args.push(value.into());
    }
    args.push("-map_metadata".into());
    args.push("0".into());

    if let Some(chain) = filters.to_arg() {
        args.push("-vf".into());
        args.push(chain.into());
    }
    args.push(output.as_os_str().to_owned());

    EncodeRequest {
        input: input.to_path_buf(),
        output: output.to_path_buf(),
        args,
    }
}
