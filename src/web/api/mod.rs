pub mod account;
pub mod charts;
pub mod error;
pub mod horoscope;
pub mod session;
