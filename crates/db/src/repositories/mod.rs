//! Database repositories.

pub mod direct_message;
pub mod group;
pub mod group_message;
pub mod organization;
pub mod user;

pub use direct_message::DirectMessageRepository;
pub use group::GroupRepository;
pub use group_message::GroupMessageRepository;
pub use organization::OrganizationRepository;
pub use user::UserRepository;
