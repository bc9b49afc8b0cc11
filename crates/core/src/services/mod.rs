//! Business logic services.

#![allow(missing_docs)]

pub mod auth;
pub mod chat_list;
pub mod group;
pub mod message;
pub mod organization;
pub mod user;

pub use auth::{AuthIdentity, AuthService, LoginInput, RegisterInput};
pub use chat_list::{ChatListEntry, ChatListService};
pub use group::{AddGroupMemberInput, CreateGroupInput, GroupMemberEntry, GroupService};
pub use message::{
    MessageService, SendDirectMessageInput, SendGroupMessageInput, MAX_PAGE_SIZE,
};
pub use organization::{CreateOrganizationInput, OrganizationService};
pub use user::{UpdateProfileInput, UserProfile, UserService};
