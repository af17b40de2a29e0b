mod create;
mod delete;
mod edit;
mod list;
mod notify;
mod show;

pub use create::handle_create;
pub use delete::handle_delete;
pub use edit::handle_edit;
pub use list::handle_list;
pub use notify::handle_notify;
pub use show::handle_show;
