//! Command handlers, one module per command group.

pub mod challenge;
pub mod entries;
pub mod grace;
pub mod init;
pub mod maintenance;
pub mod misc;
pub mod notifications;
pub mod tier;

pub use challenge::handle_challenge;
pub use entries::{
    handle_create, handle_delete, handle_edit, handle_list, handle_notify, handle_show,
};
pub use grace::{handle_set_passcode, handle_sweep};
pub use init::handle_init;
pub use maintenance::{handle_backup, handle_check};
pub use misc::handle_completions;
pub use notifications::handle_flush;
pub use tier::{handle_grant, handle_upgrade};
