pub mod disposable;
pub mod dns;
pub mod smtp;
pub mod syntax;
