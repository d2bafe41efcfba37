mod health_check;
mod users;

pub use health_check::health_check;
pub use users::{
    change_password, delete_account, get_account, list_accounts, login, logout, patch_account,
    refresh, register, update_account, ACCESS_COOKIE, REFRESH_COOKIE,
};
