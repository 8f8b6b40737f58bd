//! Domain services used by the HTTP and feed routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own business logic and persistence concerns so route
//! handlers can stay focused on protocol translation and auth plumbing.
//! Services that change rows take the [`feed::FeedHub`] and publish the
//! change themselves; routes never publish.

pub mod feed;
pub mod menu;
pub mod oauth;
pub mod order;
pub mod owner;
pub mod session;
pub mod storage;
pub mod table_session;
