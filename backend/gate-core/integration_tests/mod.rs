mod error;
mod helpers;
mod transport;
