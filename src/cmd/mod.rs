//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module    | Commands handled                                               |
//! |-----------|----------------------------------------------------------------|
//! | `serve`   | `Serve`                                                        |
//! | `issues`  | `List`, `Board`, `Dashboard`, `Create`, `Update`, `Move`, `Delete`, `Seed` |
//! | `config`  | `Config`                                                       |

pub mod config;
pub mod issues;
pub mod serve;

pub use config::cmd_config;
pub use issues::{
    cmd_board, cmd_create, cmd_dashboard, cmd_delete, cmd_list, cmd_move, cmd_seed, cmd_update,
};
pub use serve::cmd_serve;
