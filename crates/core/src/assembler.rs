//! Turns a form submission into the config document read by the renderer.
//!
//! The document has two sections:
//!
//! ```text
//! [required]
//! ffmpeg=/usr/bin/ffmpeg
//! google_map_key=...
//! gps_file=/srv/users/7/output/g2v.gpx
//! google_map_type=satellite
//! video_width=640
//! video_height=640
//! video_border=10
//! [optional]
//! photos_dir=/srv/users/7/photos
//! photos_timezone=8
//! output_dir=/srv/users/7/output
//! ```

use std::path::PathBuf;

use crate::error::{CoreError, CoreResult};
use crate::options::{ConfigLine, ConfigOption};
use crate::registry::{OptionRegistry, PHOTOS_TIMEZONE, VIDEO_BORDER, VIDEO_HEIGHT, VIDEO_WIDTH};
use crate::types::{FormValues, UserScope};

/// Fixed lines at the top of the required section, supplied by the caller.
#[derive(Debug, Clone)]
pub struct Preamble {
    /// Location of the ffmpeg binary the renderer shells out to.
    pub ffmpeg: String,
    pub map_api_key: String,
    /// Path of the track file written next to the config document.
    pub track_file: PathBuf,
    pub map_type: String,
}

impl Preamble {
    fn lines(&self) -> Vec<ConfigLine> {
        vec![
            ConfigLine::new("ffmpeg", self.ffmpeg.as_str()),
            ConfigLine::new("google_map_key", self.map_api_key.as_str()),
            ConfigLine::new("gps_file", self.track_file.to_string_lossy()),
            ConfigLine::new("google_map_type", self.map_type.as_str()),
        ]
    }
}

/// Everything the assembler needs besides the submitted values.
#[derive(Debug, Clone)]
pub struct AssemblyContext {
    pub preamble: Preamble,
    /// Local-time offset of the activity, used when the submitter left the
    /// time-offset option empty.
    pub activity_utc_offset_hours: f64,
    /// Directory the renderer writes its output into.
    pub output_dir: PathBuf,
}

/// The validated config document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigDocument {
    pub required: Vec<ConfigLine>,
    pub optional: Vec<ConfigLine>,
}

impl ConfigDocument {
    /// Serialize as the renderer's ini dialect. Every line ends in `\n`.
    pub fn render(&self) -> String {
        let mut out = String::from("[required]\n");
        for line in &self.required {
            out.push_str(&line.to_string());
            out.push('\n');
        }
        out.push_str("[optional]\n");
        for line in &self.optional {
            out.push_str(&line.to_string());
            out.push('\n');
        }
        out
    }

    /// Look up a value in either section.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.required
            .iter()
            .chain(self.optional.iter())
            .find(|line| line.key == key)
            .map(|line| line.value.as_str())
    }
}

/// Reject frames whose border leaves no room for the track.
pub fn check_frame(width: i64, height: i64, border: i64) -> CoreResult<()> {
    let doubled = border.saturating_mul(2);
    if doubled >= width || doubled >= height {
        return Err(CoreError::Constraint(format!(
            "border {border} is too wide for a {width}x{height} video; \
             twice the border must be smaller than both width and height"
        )));
    }
    Ok(())
}

/// Drives an [`OptionRegistry`] over a submission.
pub struct ConfigAssembler<'a> {
    registry: &'a OptionRegistry,
}

impl<'a> ConfigAssembler<'a> {
    pub fn new(registry: &'a OptionRegistry) -> Self {
        Self { registry }
    }

    /// Validate `values` and build the config document.
    ///
    /// Stops at the first invalid option and reports it with the option's
    /// label. Side effects of options validated before the failure (the
    /// photo directory) are not undone.
    pub fn assemble(
        &self,
        values: &FormValues,
        scope: &UserScope,
        context: &AssemblyContext,
    ) -> CoreResult<ConfigDocument> {
        let mut doc = ConfigDocument {
            required: context.preamble.lines(),
            optional: Vec::new(),
        };

        for key in self.registry.required_keys() {
            let option = self.option(key)?;
            let submitted = values
                .get(key)
                .ok_or_else(|| CoreError::MissingInput.for_option(option.short_label()))?;
            let line = option
                .parse_and_validate(submitted, scope)
                .map_err(|e| e.for_option(option.short_label()))?;
            doc.required.extend(line);
        }

        self.check_frame(values)?;

        let mut offset_supplied = false;
        for key in self.registry.optional_keys() {
            let Some(submitted) = values.get(key) else {
                continue;
            };
            let option = self.option(key)?;
            if !option.has_submitted_value(submitted) {
                continue;
            }
            let line = option
                .parse_and_validate(submitted, scope)
                .map_err(|e| e.for_option(option.short_label()))?;
            doc.optional.extend(line);
            if key == PHOTOS_TIMEZONE {
                offset_supplied = true;
            }
        }

        if !offset_supplied {
            if let Some(option) = self.registry.get(PHOTOS_TIMEZONE) {
                match option.format_time_offset(context.activity_utc_offset_hours) {
                    Ok(line) => doc.optional.push(line),
                    Err(e) => tracing::warn!(
                        user_id = scope.user_id,
                        offset_hours = context.activity_utc_offset_hours,
                        error = %e,
                        "Activity time offset cannot be expressed, leaving it unset",
                    ),
                }
            }
        }

        doc.optional.push(ConfigLine::new(
            "output_dir",
            context.output_dir.to_string_lossy(),
        ));

        Ok(doc)
    }

    fn option(&self, key: &str) -> CoreResult<&'a ConfigOption> {
        self.registry
            .get(key)
            .ok_or_else(|| CoreError::Internal(format!("option {key} is not registered")))
    }

    /// Apply [`check_frame`] when the registry carries the frame options.
    fn check_frame(&self, values: &FormValues) -> CoreResult<()> {
        let (Some(width), Some(height), Some(border)) = (
            self.registry.get(VIDEO_WIDTH),
            self.registry.get(VIDEO_HEIGHT),
            self.registry.get(VIDEO_BORDER),
        ) else {
            return Ok(());
        };
        let magnitude = |option: &ConfigOption| {
            option.parse_integer(values.get(option.key()).map(Vec::as_slice).unwrap_or(&[]))
        };
        check_frame(magnitude(width)?, magnitude(height)?, magnitude(border)?)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
