//! Database entities.

pub mod direct_message;
pub mod group;
pub mod group_member;
pub mod group_message;
pub mod group_message_seen;
pub mod org_member;
pub mod organization;
pub mod user;

pub use direct_message::Entity as DirectMessage;
pub use group::Entity as Group;
pub use group_member::Entity as GroupMember;
pub use group_message::Entity as GroupMessage;
pub use group_message_seen::Entity as GroupMessageSeen;
pub use org_member::Entity as OrgMember;
pub use organization::Entity as Organization;
pub use user::Entity as User;
