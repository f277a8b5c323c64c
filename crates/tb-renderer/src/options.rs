//! Compile options.

/// Parameters of the section duration estimate.
///
/// `baseline + words / words_per_minute + goals * minutes_per_goal`, rounded
/// up to a multiple of `bucket_minutes` and never below `minimum_minutes`.
#[derive(Debug, Clone, PartialEq)]
pub struct DurationSettings {
    /// Fixed time for every section.
    pub baseline_minutes: f64,
    /// Reading speed.
    pub words_per_minute: f64,
    /// Time allowance per interactive goal.
    pub minutes_per_goal: f64,
    /// Rounding bucket.
    pub bucket_minutes: u32,
    /// Lower bound of the estimate.
    pub minimum_minutes: u32,
}

impl Default for DurationSettings {
    fn default() -> Self {
        Self {
            baseline_minutes: 0.5,
            words_per_minute: 150.0,
            minutes_per_goal: 0.25,
            bucket_minutes: 5,
            minimum_minutes: 5,
        }
    }
}

impl DurationSettings {
    /// Estimate the minutes needed for `words` of text and `goals` goals.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn estimate(&self, words: usize, goals: usize) -> u32 {
        let reading = if self.words_per_minute > 0.0 {
            words as f64 / self.words_per_minute
        } else {
            0.0
        };
        let raw = self.baseline_minutes + reading + goals as f64 * self.minutes_per_goal;
        let bucket = f64::from(self.bucket_minutes.max(1));
        let rounded = ((raw.max(0.0) / bucket).ceil() * bucket) as u32;
        rounded.max(self.minimum_minutes)
    }
}

/// Options for a [`Compiler`](crate::Compiler).
#[derive(Debug, Clone, PartialEq)]
pub struct CompileOptions {
    /// Prefix of per-document resource URLs (`{prefix}/{id}/images/...`).
    pub resource_prefix: String,
    /// URL directory holding emoji images named by codepoint.
    pub emoji_path: String,
    /// Duration estimate parameters.
    pub duration: DurationSettings,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            resource_prefix: "/resources".to_owned(),
            emoji_path: "/images/emoji".to_owned(),
            duration: DurationSettings::default(),
        }
    }
}
