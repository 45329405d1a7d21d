pub mod capture;
pub mod channel;
pub mod config;
pub mod digest;
pub mod filter;
pub mod fixtures;
pub mod http_client;
pub mod logging;
pub mod m3u;
pub mod matcher;
pub mod playlist_jobs;
pub mod publish;
pub mod rewrite;
pub mod sportmonks;
pub mod status;
