//! Request extractors.

mod bearer;
mod validated_json;

pub use bearer::bearer_token;
pub use validated_json::ValidatedJson;
