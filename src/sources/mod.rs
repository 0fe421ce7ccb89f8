//! External document sources.

pub mod bilibili;
pub mod pacer;

pub use bilibili::{BilibiliClient, ClientOptions, VideoInfo, VideoLoader, extract_bvid};
pub use pacer::RequestPacer;
