use std::collections::BTreeMap;

use chirpy_types::models::{Chirp, RefreshToken, User};
use serde::{Deserialize, Serialize};

/// The whole on-disk document. Map keys are record ids (owner ids for
/// `tokens`) and serialize as JSON object keys.
///
/// Ordered maps keep listings sorted by id without an extra pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub chirps: BTreeMap<i64, Chirp>,
    #[serde(default)]
    pub users: BTreeMap<i64, User>,
    #[serde(default)]
    pub tokens: BTreeMap<i64, RefreshToken>,
}
