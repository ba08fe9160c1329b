pub mod action;
pub mod dispatcher;
pub mod endpoint;
pub mod error;
pub mod extract;
pub mod history;
pub mod mapper;
pub mod session;
pub mod token;
pub mod trace;
pub mod transport;
pub mod types;

#[cfg(test)]
mod testing;

pub use action::Action;
pub use dispatcher::Dispatcher;
pub use error::DispatchError;
pub use extract::{ResourceIds, extract_ids};
pub use history::{History, HistoryEntry};
pub use session::Session;
pub use transport::{HttpTransport, Transport};
pub use types::{
    ActionParams, ApiResult, Credentials, DispatchRequest, Environment, ListQuery,
};
