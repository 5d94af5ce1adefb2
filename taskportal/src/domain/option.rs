use serde::{Deserialize, Serialize};

/// A client, project or task the user can pick.
///
/// The portal's JSON endpoints return `{ "Id": .., "Name": .. }` objects, the
/// client list comes from `<option>` elements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase", deserialize = "PascalCase"))]
pub struct OptionRecord {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub is_default: bool,
}

impl OptionRecord {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            is_default: false,
        }
    }
}

/// Resolves a picked name back to its record.
pub fn find_by_name<'a>(options: &'a [OptionRecord], name: &str) -> Option<&'a OptionRecord> {
    options.iter().find(|option| option.name == name)
}
