pub mod gateway;
pub mod poller;
