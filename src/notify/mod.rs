pub mod dispatcher;
pub mod message;
pub mod telegram;

pub use dispatcher::Dispatcher;
pub use telegram::TelegramBot;
