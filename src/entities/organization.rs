// 🏦 Organization - the institution behind one or more accounts
// Referenced by accounts through its resolved key, never embedded.

use super::{EntityKind, Reconcilable};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    /// Source-assigned id, or the domain when the source sends no id
    pub source_id: String,
    pub domain: Option<String>,
    pub name: Option<String>,
    pub url: Option<String>,
    pub sfin_url: Option<String>,
}

impl Organization {
    /// Best label for humans: name, then domain, then id
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.domain.as_deref())
            .unwrap_or(&self.source_id)
    }

    /// True when `other` carries a detail that disagrees with ours.
    /// Details `other` leaves out are not a conflict.
    pub fn conflicts_with(&self, other: &Organization) -> bool {
        let differs = |ours: &Option<String>, theirs: &Option<String>| {
            theirs.is_some() && theirs != ours
        };
        differs(&self.domain, &other.domain)
            || differs(&self.name, &other.name)
            || differs(&self.url, &other.url)
            || differs(&self.sfin_url, &other.sfin_url)
    }
}

impl Reconcilable for Organization {
    const KIND: EntityKind = EntityKind::Organization;

    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn sort_timestamp(&self) -> i64 {
        0
    }

    fn hashed_fields(&self) -> serde_json::Value {
        serde_json::json!({
            "domain": self.domain,
            "name": self.name,
            "url": self.url,
            "sfin_url": self.sfin_url,
        })
    }
}
