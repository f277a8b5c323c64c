//! CLI command implementations.

pub(crate) mod build;
pub(crate) mod compile;

pub(crate) use build::BuildArgs;
pub(crate) use compile::CompileArgs;

use tb_config::Config;
use tb_renderer::{CompileOptions, DurationSettings};

/// Compile options from the `[content]` and `[duration]` sections.
pub(crate) fn compile_options(config: &Config) -> CompileOptions {
    let duration = &config.duration;
    CompileOptions {
        resource_prefix: config.content_resolved.resource_prefix.clone(),
        emoji_path: config.content_resolved.emoji_path.clone(),
        duration: DurationSettings {
            baseline_minutes: duration.baseline_minutes,
            words_per_minute: duration.words_per_minute,
            minutes_per_goal: duration.minutes_per_goal,
            bucket_minutes: duration.bucket_minutes,
            minimum_minutes: duration.minimum_minutes,
        },
    }
}
