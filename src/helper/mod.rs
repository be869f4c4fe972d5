pub mod admin_helpers;
pub mod ai_helpers;
pub mod engagement_helpers;
pub mod form_helpers;
pub mod media_helpers;
pub mod public_helpers;
pub mod role_helpers;
pub mod sanitization_helpers;
pub mod workflow_helpers;
