//! Service implementations
//!
//! Real implementations of all service traits for production use

pub mod chat_client;
pub mod image_client;
pub mod sse;
pub mod supabase;

#[cfg(test)]
mod tests;

// Re-export service implementations
pub use chat_client::RealChatClient;
pub use image_client::RealImageGenerator;
pub use supabase::SupabaseClient;
