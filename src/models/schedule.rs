//! Publish schedule entries.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One scheduled publish from the CMS `/schedule` endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    /// Absolute URL of the page to publish, e.g. `http://foo.com:/pages/1`
    pub publish: String,

    /// When the publish fires, usually epoch milliseconds
    pub at: Value,
}

/// The whole schedule of a site.
pub type Schedule = Vec<ScheduleEntry>;
