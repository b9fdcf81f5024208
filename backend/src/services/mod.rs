//! Business logic services for the Stock Management Platform

pub mod auth;
pub mod movement;
pub mod notification;
pub mod product;
pub mod role;
pub mod supplier;
pub mod user;

pub use auth::AuthService;
pub use movement::MovementService;
pub use notification::NotificationService;
pub use product::ProductService;
pub use role::RoleService;
pub use supplier::SupplierService;
pub use user::UserService;
