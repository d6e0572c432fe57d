mod health;
mod redirect;
mod url;

pub use health::health_handler;
pub use redirect::{access_handler, redirect_handler};
pub use url::{
    analytics_handler, create_url_handler, delete_url_handler, get_url_handler,
    list_owned_urls_handler, list_public_urls_handler, overview_handler, update_url_handler,
};
