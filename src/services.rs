pub mod accounts;
pub mod gateway;
pub mod resolver;
pub mod short_code;
pub mod target;

pub use accounts::AccountService;
pub use gateway::LinkGateway;
pub use resolver::{Resolution, Resolver};
