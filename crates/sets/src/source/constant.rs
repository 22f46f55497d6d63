//! The fixed source.

use rill_core::{Change, ChangeBatch, Outlet, SetHandle, Token};

/// Builds a reactive set with fixed membership.
///
/// Tokens are minted once, here, so concurrent subscribers see the same
/// token for the same item. An empty input produces a set that delivers no
/// replay batch at all.
pub fn constant<T, I>(items: I) -> SetHandle<T>
where
    T: Clone + 'static,
    I: IntoIterator<Item = T>,
{
    let outlet = Outlet::new();
    let batch: ChangeBatch<T> = items
        .into_iter()
        .map(|item| Change::Add(Token::mint(), item))
        .collect();
    outlet.emit(batch);
    outlet.handle()
}
