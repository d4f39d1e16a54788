use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Users are identified by the numeric id handed over by the session layer.
pub type UserId = u64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Submitted form data: every key maps to the values sent for it, in order.
///
/// Only the first value of a key is ever consulted.
pub type FormValues = HashMap<String, Vec<String>>;

/// Group `(key, value)` pairs (as decoded from a form body) into [`FormValues`],
/// keeping repeated keys in submission order.
pub fn group_form_pairs<I>(pairs: I) -> FormValues
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut values = FormValues::new();
    for (key, value) in pairs {
        values.entry(key).or_default().push(value);
    }
    values
}

/// The per-user area of the filesystem.
///
/// ```text
/// <users_dir>/<uid>/           outcome parent (result video or error marker)
/// <users_dir>/<uid>/output/    working directory of the running job
/// <users_dir>/<uid>/photos/    photos inserted into the video
/// ```
#[derive(Debug, Clone)]
pub struct UserScope {
    pub user_id: UserId,
    users_dir: PathBuf,
}

impl UserScope {
    pub fn new(users_dir: impl Into<PathBuf>, user_id: UserId) -> Self {
        Self {
            user_id,
            users_dir: users_dir.into(),
        }
    }

    pub fn user_dir(&self) -> PathBuf {
        self.users_dir.join(self.user_id.to_string())
    }

    pub fn working_dir(&self) -> PathBuf {
        self.user_dir().join("output")
    }

    pub fn photos_dir(&self) -> PathBuf {
        self.user_dir().join("photos")
    }

    pub fn users_dir(&self) -> &Path {
        &self.users_dir
    }
}
