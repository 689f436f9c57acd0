/*! Integration tests for Viewsync.
 *
 * This test suite is organized as a single integration test binary
 * following the pattern described by matklad in
 * https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html
 *
 * The module structure mirrors the main library structure:
 * - store: Tests for the Store and the change sets it reports to observers
 * - view: Tests for SortedView following a store, sorting and filtering
 * - selection: Tests for SelectableView and grouping by selection
 * - table: Tests for the Table facade, its observers and persistent references
 * - tree: Tests for the Tree facade, page lifecycle and aggregates
 * - properties: Randomized operation sequences checked against simple models
 */

use tracing_subscriber::EnvFilter;

#[ctor::ctor]
fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("viewsync=info".parse().unwrap()),
        )
        .with_test_writer()
        .try_init();
}

mod helpers;
mod properties;
mod selection;
mod store;
mod table;
mod tree;
mod view;
