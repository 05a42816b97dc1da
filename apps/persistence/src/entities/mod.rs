pub mod configuration;
pub mod organization;
pub mod tokens;
pub mod users;

pub use configuration::Entity as ConfigurationRows;
pub use organization::Entity as OrganizationRows;
pub use tokens::Entity as Tokens;
pub use users::Entity as Users;
