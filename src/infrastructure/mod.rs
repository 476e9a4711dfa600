pub mod http_client;
pub mod page_renderer;

pub use http_client::build_http_client;
pub use page_renderer::{BrowserLauncher, ChromiumLauncher, ChromiumRenderer, PageRenderer};
