//! UI automation module: accessibility snapshots, live queries and backends.

mod backend;
mod element;
pub mod memory;
mod query;
pub mod wda;

pub use backend::{NormalizedPoint, UiBackend, UiError};
pub use element::{ElementKind, NodeValue, RawNode};
pub use memory::{InMemoryDevice, Interaction, TapEffect};
pub use query::{Clause, ElementQuery, Predicate, QueryStep};
pub use wda::WdaClient;

/// Bundle identifier of the iOS home screen.
pub const HOME_BUNDLE_ID: &str = "com.apple.springboard";

/// Identifier of the container shown while the app switcher is open.
pub const APP_SWITCHER_IDENTIFIER: &str = "AppSwitcherContentView";

/// Query matching the app switcher overlay inside `app`.
pub fn app_switcher_query(app: &str) -> ElementQuery {
    ElementQuery::application(app)
        .descendants(ElementKind::Other)
        .matching(Predicate::identifier(APP_SWITCHER_IDENTIFIER))
}
