//! Entity definitions for the Meridian platform
//!
//! This crate contains Sea-ORM entity definitions for the database models.

pub mod invitations;
pub use invitations::Entity as Invitations;
pub mod organizations;
pub use organizations::Entity as Organizations;
pub mod refresh_tokens;
pub use refresh_tokens::Entity as RefreshTokens;
pub mod team_managers;
pub use team_managers::Entity as TeamManagers;
pub mod team_members;
pub use team_members::Entity as TeamMembers;
pub mod teams;
pub use teams::Entity as Teams;
pub mod users;
pub use users::Entity as Users;
