// Domain rules - Option normalization policy

use tracing::debug;

use crate::domain::model::*;
use crate::utils::time;


/// Fills omitted options from [`Defaults`] and brings `from`/`to` onto the
/// millisecond scale
///
/// Normalization never fails: values that make no sense fall back to the
/// defaults, and time strings it cannot read are passed through for the
/// formatter to deal with.
pub struct OptionNormalizer<'a> {
    defaults: &'a Defaults,
}

impl<'a> OptionNormalizer<'a> {
    /// Create a normalizer over the given defaults
    pub fn new(defaults: &'a Defaults) -> Self {
        Self { defaults }
    }

    /// Normalize a raw options record for the given input
    pub fn normalize(&self, input: &InputSource, options: GifOptions) -> NormalizedOptions {
        let normalized = NormalizedOptions {
            input_path: input.file_path().cloned(),
            fps: options
                .fps
                .filter(|fps| *fps > 0)
                .unwrap_or(self.defaults.fps),
            speed: options
                .speed
                .filter(|speed| speed.is_finite() && *speed > 0.0)
                .unwrap_or(self.defaults.speed),
            colors: options.colors.unwrap_or(self.defaults.colors),
            compress: options.compress.unwrap_or(self.defaults.compress),
            from: options.from.map(Self::time_point),
            to: options.to.map(Self::time_point),
            resize: non_empty(options.resize),
            subtitles: non_empty(options.subtitles),
            reverse: options.reverse,
            text: non_empty(options.text),
            loop_forever: options.loop_forever,
        };

        debug!(options = ?normalized, "Normalized options");
        normalized
    }

    /// Seconds become milliseconds; anything with a `:` stays a timecode
    ///
    /// Text without a `:` is read up to the end of its leading number, so
    /// `"5s"` means five seconds.
    pub fn time_point(value: TimeValue) -> TimePoint {
        match value {
            TimeValue::Seconds(seconds) => TimePoint::Millis(seconds * 1000.0),
            TimeValue::Text(text) if text.contains(':') => TimePoint::Timecode(text),
            TimeValue::Text(text) => match time::parse_leading_number(&text) {
                Some(seconds) => TimePoint::Millis(seconds * 1000.0),
                None => TimePoint::Timecode(text),
            },
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
