/// Command, text and callback handlers
pub mod handlers;
/// Send/edit helpers that log transport failures
pub mod messaging;
/// Inline keyboard builders
pub mod views;
