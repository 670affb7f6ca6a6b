mod awesome_api;
pub use awesome_api::{AwesomeApi, UpstreamConf};
