//! Patient model
//!
//! Patients as listed by the backend. Read-only on the client.

use serde::{Deserialize, Serialize};

/// A patient the clinician can select
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub user_id: i64,
    pub full_name: String,
    #[serde(default)]
    pub is_pregnant: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
}

impl Patient {
    /// Name as shown in the patient picker
    pub fn display_label(&self) -> String {
        if self.is_pregnant {
            format!("{} (Pregnant)", self.full_name)
        } else {
            self.full_name.clone()
        }
    }
}
