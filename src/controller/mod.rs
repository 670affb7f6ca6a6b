pub mod quote;

use rocket::{catch, http::Status, Request};

#[catch(default)]
pub fn default_catcher(status: Status, req: &Request) -> String {
    format!("{}: failed to handle {}\n", status, req.uri())
}
