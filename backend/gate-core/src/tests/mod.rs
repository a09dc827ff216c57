mod helpers;
mod proto;
