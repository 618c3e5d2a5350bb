//! Issue board: synchronization between a remote issue table and the
//! in-memory collection every view reads from.
//!
//! ## Module Map
//!
//! ```text
//! ┌──────────┐   HTTP   ┌──────────────────────────────────────────────────┐
//! │  Client  │ ───────> │  server.rs  (axum Router, ServerConfig)          │
//! │  (Board) │ <─────── │    └─ api.rs  (route handlers, AppState)         │
//! └──────────┘ WebSocket│         │                                        │
//!                       │         │ load / create / update / delete        │
//!                       │         v                                        │
//!                       │  repository.rs  (IssueRepository, LoadReport)    │
//!                       │         │                                        │
//!                       │         │ IssueStore trait, decode_row()         │
//!                       │         v                                        │
//!                       │  store.rs ── rest.rs   (PostgREST over reqwest)  │
//!                       │          └── memory.rs (in-process table)        │
//!                       └──────────────────────────────────────────────────┘
//! ```
//!
//! ## Supporting Modules
//!
//! | Module    | Responsibility                                             |
//! |-----------|------------------------------------------------------------|
//! | `models`  | `Issue`, `IssueDraft`, `IssuePatch`, enums and validation  |
//! | `views`   | Pure projections: columns, search, filters, dashboard      |
//! | `notify`  | Success / failure notifications with a broadcast fan-out   |
//! | `ws`      | `WsMessage` enum + `broadcast_message()` helper            |

pub mod api;
pub mod memory;
pub mod models;
pub mod notify;
pub mod repository;
pub mod rest;
pub mod server;
pub mod store;
pub mod views;
pub mod ws;
