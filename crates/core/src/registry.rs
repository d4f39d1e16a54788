//! The ordered, named collection of render options.

use indexmap::IndexMap;

use crate::options::ConfigOption;

pub const VIDEO_WIDTH: &str = "video_width";
pub const VIDEO_HEIGHT: &str = "video_height";
pub const VIDEO_BORDER: &str = "video_border";
pub const VIDEO_LIMIT_SECS: &str = "video_limit_secs";
pub const PHOTOS_DIR: &str = "photos_dir";
pub const PHOTOS_TIMEZONE: &str = "photos_timezone";
pub const PHOTOS_SHOW_SECS: &str = "photos_show_secs";

/// Options keyed by their identifier, iterated in presentation order.
///
/// Built once at startup and only read afterwards, so it can be shared
/// across requests behind an `Arc` without locking.
#[derive(Debug, Clone, Default)]
pub struct OptionRegistry {
    options: IndexMap<String, ConfigOption>,
}

impl OptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `option` under `key` and initialise its identity from the key.
    ///
    /// Keys must be unique; registering a key twice replaces the earlier
    /// option but keeps its position.
    pub fn register(&mut self, key: &str, mut option: ConfigOption) {
        debug_assert!(
            !self.options.contains_key(key),
            "option {key} registered twice"
        );
        option.initialize(key);
        self.options.insert(key.to_string(), option);
    }

    pub fn get(&self, key: &str) -> Option<&ConfigOption> {
        self.options.get(key)
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// All options in presentation order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConfigOption)> {
        self.options.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn required_keys(&self) -> Vec<&str> {
        self.iter()
            .filter(|(_, opt)| opt.is_required())
            .map(|(key, _)| key)
            .collect()
    }

    pub fn optional_keys(&self) -> Vec<&str> {
        self.iter()
            .filter(|(_, opt)| !opt.is_required())
            .map(|(key, _)| key)
            .collect()
    }
}

/// Build the option set offered for render jobs.
pub fn render_options() -> OptionRegistry {
    let mut registry = OptionRegistry::new();

    registry.register(
        VIDEO_WIDTH,
        ConfigOption::integer(1, 640)
            .with_default(640)
            .with_label("Video width")
            .with_description("Limited to 640 by the free map imagery tier.")
            .required(),
    );
    registry.register(
        VIDEO_HEIGHT,
        ConfigOption::integer(1, 640)
            .with_default(640)
            .with_label("Video height")
            .with_description("Limited to 640 by the free map imagery tier.")
            .required(),
    );
    registry.register(
        VIDEO_BORDER,
        ConfigOption::integer(1, 640)
            .with_default(10)
            .with_label("Border width")
            .with_description("Distance between the track and the edge of the frame.")
            .required(),
    );
    registry.register(
        VIDEO_LIMIT_SECS,
        ConfigOption::integer(3, 0)
            .with_label("Maximum video length in seconds")
            .with_description(
                "Frame rate, speed, photo and track-info durations are derived from this. \
                 Many messaging apps cap shared videos at 10 seconds.",
            ),
    );
    registry.register(
        PHOTOS_DIR,
        ConfigOption::photo_directory(true)
            .with_label("Add photos to the video")
            .with_description(
                "Photos from your photo folder are inserted at the time found in their EXIF data.<br>\
                 EXIF data may be stripped when images are converted or sent compressed.<br>\
                 Photos taken outside the track's time span are skipped.",
            ),
    );
    registry.register(
        PHOTOS_TIMEZONE,
        ConfigOption::time_offset()
            .with_label("Time zone of the photos")
            .with_description(
                "Track times are UTC while EXIF times are local, so photos need an offset.<br>\
                 For example 8, -11 or 3.5.<br>\
                 Leave empty to take it from the activity.",
            ),
    );
    registry.register(
        PHOTOS_SHOW_SECS,
        ConfigOption::integer(1, 0)
            .with_default(2)
            .with_label("Seconds each photo is shown")
            .with_description("Defaults to 2 seconds when empty."),
    );

    registry
}
