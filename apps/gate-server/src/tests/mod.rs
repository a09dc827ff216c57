mod app;
mod authenticator;
mod helpers;
mod logger;
mod relay;
