pub mod authorizer;
pub mod jwt;
pub mod password;
pub mod role;
pub mod token_service;
pub mod token_store;

pub use jwt::{TokenCodec, TokenError, TokenIdentity};
pub use password::CredentialHasher;
pub use role::Role;
pub use token_service::{TokenPair, TokenService};
pub use token_store::TokenStore;
