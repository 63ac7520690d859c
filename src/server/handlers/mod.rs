//! HTTP request handlers for the web server.

mod api;
mod helpers;
mod scrape;

pub use api::{health, root};
pub use scrape::{
    scrape_images_only, scrape_page, scrape_post, scrape_post_get, scrape_video, scrape_video_get,
};
