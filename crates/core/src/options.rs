//! Self-describing render options.
//!
//! A [`ConfigOption`] is one configurable parameter of a render job. It knows
//! how to draw its form control, whether a submission carries a value for it,
//! and how to turn that value into a validated `key=value` line of the config
//! document. The behaviour is selected by its [`OptionKind`].

use std::fmt;

use crate::error::{CoreError, CoreResult};
use crate::types::UserScope;

/// Offsets outside this window are rejected.
pub const MIN_TIME_OFFSET_HOURS: f64 = -12.0;
pub const MAX_TIME_OFFSET_HOURS: f64 = 13.0;

// ---------------------------------------------------------------------------
// ConfigLine
// ---------------------------------------------------------------------------

/// A single `key=value` line of the config document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLine {
    pub key: String,
    pub value: String,
}

impl ConfigLine {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for ConfigLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Fields shared by every option kind.
#[derive(Debug, Clone, Default)]
pub struct OptionIdentity {
    /// Config key and form field name. Filled from the registry key if empty.
    pub key: String,
    /// Short human label. Falls back to `key`.
    pub short_label: String,
    /// Longer help text shown under the label. May contain markup.
    pub long_description: String,
    /// Assembly fails if a required option is absent from the submission.
    pub required: bool,
}

/// The closed set of option behaviours.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionKind {
    /// Whole number with a lower bound and an optional upper bound
    /// (`max == 0` means unbounded).
    Integer {
        default: Option<i64>,
        min: i64,
        max: i64,
    },
    /// Unbounded decimal number.
    Decimal,
    /// Hours between local time and UTC. Whole or half hours in
    /// `[MIN_TIME_OFFSET_HOURS, MAX_TIME_OFFSET_HOURS]`.
    TimeOffset,
    /// Checkbox.
    Boolean { default: bool },
    /// Checkbox which, when ticked, resolves to the user's photo directory
    /// and creates it.
    PhotoDirectory { default: bool },
}

#[derive(Debug, Clone)]
pub struct ConfigOption {
    pub identity: OptionIdentity,
    pub kind: OptionKind,
}

impl ConfigOption {
    fn with_kind(kind: OptionKind) -> Self {
        Self {
            identity: OptionIdentity::default(),
            kind,
        }
    }

    pub fn integer(min: i64, max: i64) -> Self {
        Self::with_kind(OptionKind::Integer {
            default: None,
            min,
            max,
        })
    }

    pub fn decimal() -> Self {
        Self::with_kind(OptionKind::Decimal)
    }

    pub fn time_offset() -> Self {
        Self::with_kind(OptionKind::TimeOffset)
    }

    pub fn boolean(default: bool) -> Self {
        Self::with_kind(OptionKind::Boolean { default })
    }

    pub fn photo_directory(default: bool) -> Self {
        Self::with_kind(OptionKind::PhotoDirectory { default })
    }

    /// Set the pre-filled value of an integer option. No-op for other kinds.
    pub fn with_default(mut self, value: i64) -> Self {
        if let OptionKind::Integer { default, .. } = &mut self.kind {
            *default = Some(value);
        }
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.identity.short_label = label.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.identity.long_description = description.into();
        self
    }

    pub fn required(mut self) -> Self {
        self.identity.required = true;
        self
    }

    pub fn key(&self) -> &str {
        &self.identity.key
    }

    pub fn short_label(&self) -> &str {
        &self.identity.short_label
    }

    pub fn long_description(&self) -> &str {
        &self.identity.long_description
    }

    pub fn is_required(&self) -> bool {
        self.identity.required
    }

    /// Fill in defaulted identity fields. Idempotent.
    pub fn initialize(&mut self, key: &str) {
        if self.identity.key.is_empty() {
            self.identity.key = key.to_string();
        }
        if self.identity.short_label.is_empty() {
            self.identity.short_label = key.to_string();
        }
    }

    /// HTML form control for this option, named `key`.
    pub fn render_input(&self, key: &str) -> String {
        let name = escape_html(key);
        match &self.kind {
            OptionKind::Integer { default, .. } => {
                let value = default.map(|d| d.to_string()).unwrap_or_default();
                format!(r#"<input type="text" name="{name}" value="{value}">"#)
            }
            OptionKind::Decimal | OptionKind::TimeOffset => {
                format!(r#"<input type="text" name="{name}" value="">"#)
            }
            OptionKind::Boolean { default } | OptionKind::PhotoDirectory { default } => {
                let checked = if *default { r#" checked="checked""# } else { "" };
                format!(r#"<input type="checkbox" name="{name}" value="{name}"{checked}>"#)
            }
        }
    }

    /// Whether `values` carries something for this option.
    ///
    /// Checkboxes always report true: an unticked box is "false", not "unset".
    pub fn has_submitted_value(&self, values: &[String]) -> bool {
        match self.kind {
            OptionKind::Boolean { .. } | OptionKind::PhotoDirectory { .. } => true,
            _ => values.first().is_some_and(|v| !v.is_empty()),
        }
    }

    /// Parse and validate the first submitted value into a config line.
    ///
    /// Returns `Ok(None)` when the option is valid but contributes no line
    /// (an unticked photo-directory box). A ticked photo-directory option
    /// creates the user's photo directory; that directory is left in place
    /// even if assembly fails later.
    pub fn parse_and_validate(
        &self,
        values: &[String],
        scope: &UserScope,
    ) -> CoreResult<Option<ConfigLine>> {
        match &self.kind {
            OptionKind::Integer { .. } => {
                let num = self.parse_integer(values)?;
                Ok(Some(ConfigLine::new(self.key(), num.to_string())))
            }
            OptionKind::Decimal => {
                let num = parse_decimal(first_value(values)?)?;
                Ok(Some(ConfigLine::new(self.key(), num.to_string())))
            }
            OptionKind::TimeOffset => {
                let hours = parse_decimal(first_value(values)?)?;
                self.format_time_offset(hours).map(Some)
            }
            OptionKind::Boolean { .. } => {
                let checked = parse_checkbox(first_value(values)?, self.key())?;
                Ok(Some(ConfigLine::new(self.key(), checked.to_string())))
            }
            OptionKind::PhotoDirectory { .. } => {
                if !parse_checkbox(first_value(values)?, self.key())? {
                    return Ok(None);
                }
                let dir = scope.photos_dir();
                std::fs::create_dir_all(&dir).map_err(|e| {
                    tracing::warn!(
                        user_id = scope.user_id,
                        dir = %dir.display(),
                        error = %e,
                        "Failed to create photo directory",
                    );
                    CoreError::Io(e)
                })?;
                Ok(Some(ConfigLine::new(
                    self.key(),
                    dir.to_string_lossy().into_owned(),
                )))
            }
        }
    }

    /// Parse the first value as a whole number and enforce the bounds.
    ///
    /// Only meaningful for [`OptionKind::Integer`]; other kinds get an
    /// internal error.
    pub fn parse_integer(&self, values: &[String]) -> CoreResult<i64> {
        let OptionKind::Integer { min, max, .. } = self.kind else {
            return Err(CoreError::Internal(format!(
                "option {} is not an integer option",
                self.key()
            )));
        };
        let raw = first_value(values)?;
        let num: i64 = raw.parse().map_err(|e: std::num::ParseIntError| CoreError::Parse {
            value: raw.to_string(),
            reason: e.to_string(),
        })?;
        if num < min {
            return Err(CoreError::Range {
                value: num.to_string(),
                reason: format!("smaller than the minimum {min}"),
            });
        }
        if max != 0 && num > max {
            return Err(CoreError::Range {
                value: num.to_string(),
                reason: format!("larger than the maximum {max}"),
            });
        }
        Ok(num)
    }

    /// Format an offset in hours as this option's config line.
    ///
    /// Whole offsets are written without a decimal point (`8`), half-hour
    /// offsets with six decimals (`3.500000`).
    pub fn format_time_offset(&self, hours: f64) -> CoreResult<ConfigLine> {
        Ok(ConfigLine::new(self.key(), format_time_offset_value(hours)?))
    }
}

// ---------------------------------------------------------------------------
// Value helpers
// ---------------------------------------------------------------------------

fn first_value(values: &[String]) -> CoreResult<&str> {
    values
        .first()
        .map(String::as_str)
        .ok_or(CoreError::MissingInput)
}

fn parse_decimal(raw: &str) -> CoreResult<f64> {
    let num: f64 = raw.parse().map_err(|e: std::num::ParseFloatError| CoreError::Parse {
        value: raw.to_string(),
        reason: e.to_string(),
    })?;
    if !num.is_finite() {
        return Err(CoreError::Parse {
            value: raw.to_string(),
            reason: "not a finite number".into(),
        });
    }
    Ok(num)
}

/// Browsers send the checkbox `value` attribute (the key) when ticked.
fn parse_checkbox(raw: &str, key: &str) -> CoreResult<bool> {
    if raw == key {
        return Ok(true);
    }
    match raw.to_ascii_lowercase().as_str() {
        "on" | "true" | "1" | "yes" => Ok(true),
        "off" | "false" | "0" | "no" => Ok(false),
        _ => Err(CoreError::Parse {
            value: raw.to_string(),
            reason: "expected a checkbox value".into(),
        }),
    }
}

/// Validate and format a local-time offset in hours.
pub fn format_time_offset_value(hours: f64) -> CoreResult<String> {
    if !hours.is_finite() {
        return Err(CoreError::Format(format!("{hours} is not a number of hours")));
    }
    if !(MIN_TIME_OFFSET_HOURS..=MAX_TIME_OFFSET_HOURS).contains(&hours) {
        return Err(CoreError::Range {
            value: hours.to_string(),
            reason: format!(
                "offset must be between {MIN_TIME_OFFSET_HOURS} and {MAX_TIME_OFFSET_HOURS} hours"
            ),
        });
    }
    let whole = hours.trunc();
    let fraction = (hours - whole).abs();
    if fraction == 0.0 {
        Ok(format!("{}", whole as i64))
    } else if fraction == 0.5 {
        Ok(format!("{hours:.6}"))
    } else {
        Err(CoreError::Format(format!(
            "{hours} is not a whole or half hour, e.g. 8, -11 or 3.5"
        )))
    }
}

/// Escape text for use inside HTML attributes and element bodies.
pub fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn vals(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn scope() -> (tempfile::TempDir, UserScope) {
        let dir = tempfile::tempdir().expect("tempdir");
        let scope = UserScope::new(dir.path(), 7);
        (dir, scope)
    }

    fn width() -> ConfigOption {
        let mut opt = ConfigOption::integer(1, 640).with_default(640).required();
        opt.initialize("video_width");
        opt
    }

    fn offset() -> ConfigOption {
        let mut opt = ConfigOption::time_offset();
        opt.initialize("photos_timezone");
        opt
    }

    #[test]
    fn initialize_fills_key_and_label() {
        let mut opt = ConfigOption::decimal();
        opt.initialize("speed");
        assert_eq!(opt.key(), "speed");
        assert_eq!(opt.short_label(), "speed");

        let mut labelled = ConfigOption::decimal().with_label("Speed");
        labelled.initialize("speed");
        labelled.initialize("other");
        assert_eq!(labelled.key(), "speed");
        assert_eq!(labelled.short_label(), "Speed");
    }

    #[test]
    fn integer_bounds() {
        let (_dir, scope) = scope();
        let opt = width();
        for bad in ["0", "641"] {
            assert_matches!(
                opt.parse_and_validate(&vals(&[bad]), &scope),
                Err(CoreError::Range { .. })
            );
        }
        assert_matches!(
            opt.parse_and_validate(&vals(&["wide"]), &scope),
            Err(CoreError::Parse { .. })
        );
        for good in ["1", "640"] {
            let line = opt
                .parse_and_validate(&vals(&[good]), &scope)
                .expect("valid")
                .expect("line");
            assert_eq!(line.to_string(), format!("video_width={good}"));
        }
    }

    #[test]
    fn integer_zero_max_is_unbounded() {
        let (_dir, scope) = scope();
        let mut opt = ConfigOption::integer(3, 0);
        opt.initialize("video_limit_secs");
        let line = opt
            .parse_and_validate(&vals(&["100000"]), &scope)
            .unwrap()
            .unwrap();
        assert_eq!(line.to_string(), "video_limit_secs=100000");
        assert_matches!(
            opt.parse_and_validate(&vals(&["2"]), &scope),
            Err(CoreError::Range { .. })
        );
    }

    #[test]
    fn empty_values_are_missing_input() {
        let (_dir, scope) = scope();
        assert_matches!(
            width().parse_and_validate(&[], &scope),
            Err(CoreError::MissingInput)
        );
        assert_matches!(
            offset().parse_and_validate(&[], &scope),
            Err(CoreError::MissingInput)
        );
    }

    #[test]
    fn empty_string_goes_to_the_parser() {
        let (_dir, scope) = scope();
        assert_matches!(
            width().parse_and_validate(&vals(&[""]), &scope),
            Err(CoreError::Parse { .. })
        );

        let mut photos = ConfigOption::photo_directory(true);
        photos.initialize("photos_dir");
        assert_matches!(
            photos.parse_and_validate(&vals(&[""]), &scope),
            Err(CoreError::Parse { .. })
        );
        assert!(!scope.photos_dir().exists());
    }

    #[test]
    fn only_first_value_is_consulted() {
        let (_dir, scope) = scope();
        let line = width()
            .parse_and_validate(&vals(&["320", "not-a-number"]), &scope)
            .unwrap()
            .unwrap();
        assert_eq!(line.value, "320");
    }

    #[test]
    fn time_offset_accepts_whole_and_half_hours() {
        let (_dir, scope) = scope();
        let opt = offset();
        let cases = [
            ("8", "8"),
            ("-11", "-11"),
            ("3.5", "3.500000"),
            ("-12", "-12"),
            ("13", "13"),
            ("-3.5", "-3.500000"),
        ];
        for (input, expected) in cases {
            let line = opt
                .parse_and_validate(&vals(&[input]), &scope)
                .expect(input)
                .expect("line");
            assert_eq!(line.to_string(), format!("photos_timezone={expected}"));
        }
    }

    #[test]
    fn time_offset_rejects_bad_values() {
        let (_dir, scope) = scope();
        let opt = offset();
        assert_matches!(
            opt.parse_and_validate(&vals(&["3.3"]), &scope),
            Err(CoreError::Format(_))
        );
        assert_matches!(
            opt.parse_and_validate(&vals(&["14"]), &scope),
            Err(CoreError::Range { .. })
        );
        assert_matches!(
            opt.parse_and_validate(&vals(&["-13"]), &scope),
            Err(CoreError::Range { .. })
        );
        assert_matches!(
            opt.parse_and_validate(&vals(&["13.5"]), &scope),
            Err(CoreError::Range { .. })
        );
        assert_matches!(
            opt.parse_and_validate(&vals(&["east"]), &scope),
            Err(CoreError::Parse { .. })
        );
        assert_matches!(
            opt.parse_and_validate(&vals(&["NaN"]), &scope),
            Err(CoreError::Parse { .. })
        );
    }

    #[test]
    fn checkbox_always_has_value() {
        let opt = ConfigOption::boolean(false);
        assert!(opt.has_submitted_value(&[]));
        assert!(!offset().has_submitted_value(&[]));
        assert!(!offset().has_submitted_value(&vals(&[""])));
        assert!(offset().has_submitted_value(&vals(&["8"])));
    }

    #[test]
    fn boolean_formats_true_false() {
        let (_dir, scope) = scope();
        let mut opt = ConfigOption::boolean(true);
        opt.initialize("show_info");
        let on = opt.parse_and_validate(&vals(&["show_info"]), &scope).unwrap();
        assert_eq!(on.unwrap().to_string(), "show_info=true");
        let off = opt.parse_and_validate(&vals(&["off"]), &scope).unwrap();
        assert_eq!(off.unwrap().to_string(), "show_info=false");
        assert_matches!(
            opt.parse_and_validate(&vals(&["maybe"]), &scope),
            Err(CoreError::Parse { .. })
        );
    }

    #[test]
    fn photo_directory_creates_user_dir() {
        let (_dir, scope) = scope();
        let mut opt = ConfigOption::photo_directory(true);
        opt.initialize("photos_dir");

        let line = opt
            .parse_and_validate(&vals(&["photos_dir"]), &scope)
            .unwrap()
            .expect("line");
        assert_eq!(line.key, "photos_dir");
        assert_eq!(line.value, scope.photos_dir().to_string_lossy());
        assert!(scope.photos_dir().is_dir());
    }

    #[test]
    fn unticked_photo_directory_emits_nothing() {
        let (_dir, scope) = scope();
        let mut opt = ConfigOption::photo_directory(true);
        opt.initialize("photos_dir");
        let line = opt.parse_and_validate(&vals(&["false"]), &scope).unwrap();
        assert!(line.is_none());
        assert!(!scope.photos_dir().exists());
    }

    #[test]
    fn photo_directory_reports_io_error() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the users root should be makes create_dir_all fail.
        let blocker = dir.path().join("users");
        std::fs::write(&blocker, b"").unwrap();
        let scope = UserScope::new(&blocker, 1);

        let mut opt = ConfigOption::photo_directory(true);
        opt.initialize("photos_dir");
        assert_matches!(
            opt.parse_and_validate(&vals(&["on"]), &scope),
            Err(CoreError::Io(_))
        );
    }

    #[test]
    fn render_inputs() {
        assert_eq!(
            width().render_input("video_width"),
            r#"<input type="text" name="video_width" value="640">"#
        );
        assert_eq!(
            offset().render_input("photos_timezone"),
            r#"<input type="text" name="photos_timezone" value="">"#
        );
        assert_eq!(
            ConfigOption::photo_directory(true).render_input("photos_dir"),
            r#"<input type="checkbox" name="photos_dir" value="photos_dir" checked="checked">"#
        );
        assert_eq!(
            ConfigOption::boolean(false).render_input("x"),
            r#"<input type="checkbox" name="x" value="x">"#
        );
    }

    #[test]
    fn decimal_is_unbounded() {
        let (_dir, scope) = scope();
        let mut opt = ConfigOption::decimal();
        opt.initialize("speed");
        let line = opt
            .parse_and_validate(&vals(&["-1234.25"]), &scope)
            .unwrap()
            .unwrap();
        assert_eq!(line.to_string(), "speed=-1234.25");
    }
}
