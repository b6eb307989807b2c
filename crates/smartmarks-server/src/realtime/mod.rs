mod hub;
mod websocket;

pub use hub::FeedHub;
pub use websocket::router;
