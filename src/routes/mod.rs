mod health_check;
mod users;

pub use health_check::health_check;
pub use users::{
    change_password, current_user, login, logout, refresh, register, update_avatar,
    update_cover, update_profile,
};
