pub mod routeviews;

pub use routeviews::{latest_update_url, list_available_updates, RouteViewsCollector};
