//! Domain services used by the HTTP and websocket routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own concurrency and business logic so route handlers can
//! stay focused on protocol translation: the dispatcher/table/processor trio
//! backs the task API, the session/room/router trio backs the chat bus.

pub mod dispatcher;
pub mod processor;
pub mod room;
pub mod router;
pub mod session;
pub mod task_table;
