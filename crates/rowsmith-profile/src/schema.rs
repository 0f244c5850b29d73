use schemars::schema::RootSchema;
use schemars::schema_for;

use crate::dto::ProfileDto;

/// Emit the JSON Schema for `profile.json`.
pub fn profile_json_schema() -> RootSchema {
    schema_for!(ProfileDto)
}
