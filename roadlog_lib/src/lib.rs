pub mod distance;
pub mod geo_sample;
pub mod played_track;
pub mod route;
pub mod route_codec;
