pub mod artistsplitter;
pub mod http_client;
pub mod lastfm;
pub mod acrcloud;
