pub mod endpoint;

pub use endpoint::ServingEndpoint;
